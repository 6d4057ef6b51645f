//! The type registry records every layout that flows through the importer,
//! keyed by content digest and grouped by schema name.

use crate::component::{spawn_component, ComponentMsg, Spawned};
use crate::node::{Node, SpawnArgs};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use strata_core::{Result, Type};
use tracing::debug;

pub(crate) fn factory(node: &mut Node, args: &SpawnArgs) -> Result<Spawned> {
    args.expect_no_arguments()?;
    Ok(spawn(node.capacity()))
}

pub fn spawn(capacity: usize) -> Spawned {
    spawn_component(capacity, move |mut mailbox, _cancel| async move {
        let mut types: BTreeMap<String, Type> = BTreeMap::new();
        let mut names: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        while let Some(msg) = mailbox.recv().await {
            match msg {
                ComponentMsg::Slice(slice) => {
                    let layout = slice.layout().clone();
                    let digest = layout.digest();
                    if types.insert(digest.clone(), layout.clone()).is_none() {
                        debug!(name = %layout.name(), %digest, "registered a new layout");
                    }
                    names
                        .entry(layout.name().to_string())
                        .or_default()
                        .insert(digest);
                }
                ComponentMsg::Status { reply } => {
                    let _ = reply.send(json!({
                        "type": "type-registry",
                        "types": types.len(),
                        "names": names.keys().cloned().collect::<Vec<_>>(),
                    }));
                }
                ComponentMsg::Signal { reply, .. } => {
                    let _ = reply.send(Ok(()));
                }
                ComponentMsg::Shutdown => break,
                _ => {}
            }
        }
        debug!(types = types.len(), "type registry terminated");
        Ok(())
    })
}
