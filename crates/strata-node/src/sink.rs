//! Sink components render exported slices through a format writer.

use crate::component::{spawn_component, ComponentMsg, Spawned};
use crate::node::{Node, SpawnArgs};
use crate::settings;
use serde_json::json;
use strata_core::{Error, Result};
use strata_io::{make_writer, Writer, WriterSettings};
use tracing::{debug, warn};

pub(crate) fn factory_ascii(node: &mut Node, args: &SpawnArgs) -> Result<Spawned> {
    spawn_with_format(node, args, "ascii")
}

pub(crate) fn factory_json(node: &mut Node, args: &SpawnArgs) -> Result<Spawned> {
    spawn_with_format(node, args, "json")
}

fn spawn_with_format(node: &mut Node, args: &SpawnArgs, format: &str) -> Result<Spawned> {
    let export = settings::get(&args.invocation.options, "export")
        .cloned()
        .unwrap_or_else(|| serde_json::json!({}));
    let writer_settings: WriterSettings = serde_json::from_value(export)
        .map_err(|e| Error::unexpected_arguments(format!("bad export options: {e}")))?;
    let writer = make_writer(format, &writer_settings)?;
    Ok(spawn(args.label.clone(), writer, node.capacity()))
}

pub fn spawn(label: String, writer: Box<dyn Writer>, capacity: usize) -> Spawned {
    spawn_component(capacity, move |mut mailbox, _cancel| async move {
        let mut writer = writer;
        let mut events: u64 = 0;
        while let Some(msg) = mailbox.recv().await {
            match msg {
                ComponentMsg::Slice(slice) => {
                    events += slice.rows() as u64;
                    if let Err(e) = writer.write(&slice).await {
                        warn!(label = %label, error = %e, "sink failed to write");
                    }
                }
                ComponentMsg::Status { reply } => {
                    let _ = reply.send(json!({
                        "type": "sink",
                        "format": writer.name(),
                        "events": events,
                    }));
                }
                ComponentMsg::Signal { atom, reply } => {
                    let result = match atom.as_str() {
                        "flush" => writer.flush().await,
                        _ => Ok(()),
                    };
                    let _ = reply.send(result);
                }
                ComponentMsg::Shutdown => break,
                _ => {}
            }
        }
        if let Err(e) = writer.flush().await {
            warn!(label = %label, error = %e, "sink failed to flush");
        }
        debug!(label = %label, events, "sink terminated");
        Ok(())
    })
}
