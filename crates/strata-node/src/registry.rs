//! The registry tracking all components of a node.

use crate::component::ComponentHandle;
use strata_core::{Error, Result};
use tokio::task::JoinHandle;

/// Component types of which at most one instance may exist per node.
pub const SINGLETONS: [&str; 5] = ["archive", "importer", "index", "type-registry", "eraser"];

pub fn is_singleton(ty: &str) -> bool {
    SINGLETONS.contains(&ty)
}

/// The state per component: its address and label.
#[derive(Debug, Clone)]
pub struct Component {
    pub handle: ComponentHandle,
    pub label: String,
}

/// A registered component together with its monitored task, so the
/// supervisor can await termination.
#[derive(Debug)]
pub struct ComponentEntry {
    pub component: Component,
    pub(crate) task: JoinHandle<()>,
}

/// An insertion-ordered multimap from component type to components.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    components: Vec<(String, ComponentEntry)>,
}

impl ComponentRegistry {
    /// Registers a component under a type. Inserting a second component of
    /// a singleton type fails with `already_exists`.
    pub fn insert(&mut self, ty: &str, entry: ComponentEntry) -> Result<()> {
        if is_singleton(ty) && self.equal_range(ty).next().is_some() {
            return Err(Error::already_exists(format!(
                "component {ty} already exists"
            )));
        }
        self.components.push((ty.to_string(), entry));
        Ok(())
    }

    /// Removes a component by handle equality.
    pub fn erase(&mut self, handle: &ComponentHandle) -> Option<(String, ComponentEntry)> {
        self.erase_by_id(handle.id())
    }

    /// Removes a component by its handle id.
    pub fn erase_by_id(&mut self, id: u64) -> Option<(String, ComponentEntry)> {
        let pos = self
            .components
            .iter()
            .position(|(_, entry)| entry.component.handle.id() == id)?;
        Some(self.components.remove(pos))
    }

    /// All components registered under a type, in insertion order.
    pub fn equal_range<'a>(&'a self, ty: &'a str) -> impl Iterator<Item = &'a ComponentEntry> {
        self.components
            .iter()
            .filter(move |(t, _)| t == ty)
            .map(|(_, entry)| entry)
    }

    /// Removes and returns all components of a type, preserving order.
    pub fn remove_type(&mut self, ty: &str) -> Vec<ComponentEntry> {
        let mut removed = Vec::new();
        let mut i = 0;
        while i < self.components.len() {
            if self.components[i].0 == ty {
                removed.push(self.components.remove(i).1);
            } else {
                i += 1;
            }
        }
        removed
    }

    /// Removes and returns every component whose type is not in `keep`.
    pub fn remove_all_except(&mut self, keep: &[&str]) -> Vec<ComponentEntry> {
        let mut removed = Vec::new();
        let mut i = 0;
        while i < self.components.len() {
            if keep.contains(&self.components[i].0.as_str()) {
                i += 1;
            } else {
                removed.push(self.components.remove(i).1);
            }
        }
        removed
    }

    /// Finds the unique component with the given label.
    pub fn find_by_label(&self, label: &str) -> Option<(&str, &ComponentEntry)> {
        self.components
            .iter()
            .find(|(_, entry)| entry.component.label == label)
            .map(|(ty, entry)| (ty.as_str(), entry))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ComponentEntry)> {
        self.components
            .iter()
            .map(|(ty, entry)| (ty.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{spawn_component, Spawned};
    use strata_core::ErrorKind;

    fn dummy() -> Spawned {
        spawn_component(4, |mut mailbox, _cancel| async move {
            while let Some(msg) = mailbox.recv().await {
                if matches!(msg, crate::component::ComponentMsg::Shutdown) {
                    break;
                }
            }
            Ok(())
        })
    }

    fn entry(label: &str) -> ComponentEntry {
        let Spawned { handle, task } = dummy();
        ComponentEntry {
            component: Component {
                handle,
                label: label.to_string(),
            },
            task,
        }
    }

    #[tokio::test]
    async fn singleton_types_reject_second_insert() {
        let mut registry = ComponentRegistry::default();
        registry.insert("archive", entry("archive")).unwrap();
        let err = registry.insert("archive", entry("archive-2")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(registry.equal_range("archive").count(), 1);
    }

    #[tokio::test]
    async fn multimap_semantics() {
        let mut registry = ComponentRegistry::default();
        registry.insert("source", entry("source-1")).unwrap();
        registry.insert("source", entry("source-2")).unwrap();
        registry.insert("sink", entry("sink-1")).unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.equal_range("source").count(), 2);
        let labels: Vec<_> = registry
            .equal_range("source")
            .map(|e| e.component.label.clone())
            .collect();
        assert_eq!(labels, ["source-1", "source-2"]);

        let handle = registry
            .find_by_label("source-1")
            .map(|(_, e)| e.component.handle.clone())
            .unwrap();
        let removed = registry.erase(&handle).unwrap();
        assert_eq!(removed.0, "source");
        assert_eq!(registry.equal_range("source").count(), 1);

        let rest = registry.remove_all_except(&["sink"]);
        assert_eq!(rest.len(), 1);
        assert_eq!(registry.len(), 1);
    }
}
