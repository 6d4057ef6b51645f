//! The index component routes every column of incoming slices into the
//! matching typed value index, keyed by layout digest.

use crate::component::{spawn_component, ComponentMsg, Spawned};
use crate::node::{Node, SpawnArgs};
use serde_json::json;
use std::collections::BTreeMap;
use strata_core::{Result, Type, ValueIndex};
use tracing::{debug, warn};

pub(crate) fn factory(node: &mut Node, args: &SpawnArgs) -> Result<Spawned> {
    args.expect_no_arguments()?;
    Ok(spawn(node.capacity()))
}

struct IndexedLayout {
    layout: Type,
    /// One index per column; `None` for columns with no indexable type.
    indexes: Vec<Option<ValueIndex>>,
    rows: u64,
}

impl IndexedLayout {
    fn new(layout: Type) -> Self {
        let indexes = layout
            .fields()
            .unwrap_or_default()
            .iter()
            .map(|field| ValueIndex::for_type(&field.ty))
            .collect();
        Self {
            layout,
            indexes,
            rows: 0,
        }
    }
}

pub fn spawn(capacity: usize) -> Spawned {
    spawn_component(capacity, move |mut mailbox, _cancel| async move {
        let mut tables: BTreeMap<String, IndexedLayout> = BTreeMap::new();
        let mut failures: u64 = 0;
        while let Some(msg) = mailbox.recv().await {
            match msg {
                ComponentMsg::Slice(slice) => {
                    let digest = slice.layout().digest();
                    let table = tables
                        .entry(digest)
                        .or_insert_with(|| IndexedLayout::new(slice.layout().clone()));
                    let mut ok = true;
                    for (column, index) in table.indexes.iter_mut().enumerate() {
                        let Some(index) = index else {
                            continue;
                        };
                        if let Err(e) = slice.append_column_to_index(column, index) {
                            warn!(column, error = %e, "dropping slice with mismatched column");
                            failures += 1;
                            ok = false;
                            break;
                        }
                    }
                    if ok {
                        table.rows += slice.rows() as u64;
                        debug!(rows = slice.rows(), layout = %table.layout.name(), "indexed a slice");
                    }
                }
                ComponentMsg::Status { reply } => {
                    let rows: u64 = tables.values().map(|t| t.rows).sum();
                    let columns: usize = tables
                        .values()
                        .map(|t| t.indexes.iter().flatten().count())
                        .sum();
                    let _ = reply.send(json!({
                        "type": "index",
                        "layouts": tables.len(),
                        "columns": columns,
                        "rows": rows,
                        "failures": failures,
                    }));
                }
                ComponentMsg::Signal { reply, .. } => {
                    let _ = reply.send(Ok(()));
                }
                ComponentMsg::Shutdown => break,
                _ => {}
            }
        }
        debug!(layouts = tables.len(), "index terminated");
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{Data, GenericSlice, Type};

    #[tokio::test]
    async fn indexes_columns_per_layout() {
        let Spawned { handle, task } = spawn(8);
        let layout = Type::record([("a", Type::count()), ("b", Type::string())]).with_name("e");
        let slice =
            GenericSlice::make(layout, &[vec![Data::Count(1), Data::from("x")]]).unwrap();
        handle.send(ComponentMsg::Slice(slice.clone())).await.unwrap();
        handle.send(ComponentMsg::Slice(slice)).await.unwrap();
        let status = handle.status(std::time::Duration::from_secs(5)).await.unwrap();
        assert_eq!(status["layouts"], 1);
        assert_eq!(status["columns"], 2);
        assert_eq!(status["rows"], 2);
        handle.shutdown().await;
        task.await.unwrap();
    }
}
