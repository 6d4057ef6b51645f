//! Exporter components hold a query expression and the wiring toward the
//! archive, the index, and their sinks. Result slices flowing back from
//! the archive are forwarded to every sink; query evaluation itself lives
//! with the archive and index.

use crate::component::{spawn_component, ComponentHandle, ComponentMsg, Spawned};
use crate::node::{Node, SpawnArgs};
use serde_json::json;
use strata_core::Result;
use tracing::debug;

pub(crate) fn factory(node: &mut Node, args: &SpawnArgs) -> Result<Spawned> {
    let expression = args.invocation.arguments.join(" ");
    Ok(spawn(args.label.clone(), expression, node.capacity()))
}

pub fn spawn(label: String, expression: String, capacity: usize) -> Spawned {
    spawn_component(capacity, move |mut mailbox, _cancel| async move {
        let mut archive: Option<ComponentHandle> = None;
        let mut index: Option<ComponentHandle> = None;
        let mut sinks: Vec<ComponentHandle> = Vec::new();
        let mut exported: u64 = 0;
        while let Some(msg) = mailbox.recv().await {
            match msg {
                ComponentMsg::Archive(handle) => {
                    debug!(label = %label, "got the archive");
                    archive = Some(handle);
                }
                ComponentMsg::Index(handle) => {
                    debug!(label = %label, "got the index");
                    index = Some(handle);
                }
                ComponentMsg::Sink(handle) => {
                    debug!(label = %label, sink = handle.id(), "got a new sink");
                    sinks.push(handle);
                }
                ComponentMsg::Slice(slice) => {
                    exported += slice.rows() as u64;
                    for sink in &sinks {
                        let _ = sink.send(ComponentMsg::Slice(slice.clone())).await;
                    }
                }
                ComponentMsg::Status { reply } => {
                    let _ = reply.send(json!({
                        "type": "exporter",
                        "expression": expression,
                        "wired-archive": archive.is_some(),
                        "wired-index": index.is_some(),
                        "sinks": sinks.len(),
                        "events": exported,
                    }));
                }
                ComponentMsg::Signal { reply, .. } => {
                    let _ = reply.send(Ok(()));
                }
                ComponentMsg::Shutdown => break,
                _ => {}
            }
        }
        debug!(label = %label, exported, "exporter terminated");
        Ok(())
    })
}
