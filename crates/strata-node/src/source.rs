//! Source components drive a format reader and stream the resulting
//! slices to their sinks. A source starts producing once the first sink is
//! advertised and reacts to control messages between batches.

use crate::component::{spawn_component, ComponentHandle, ComponentMsg, Spawned};
use crate::node::{Node, SpawnArgs};
use crate::settings;
use serde_json::json;
use strata_core::{Error, Result};
use strata_io::{make_reader, Reader, ReaderSettings};
use tokio::sync::mpsc::error::TryRecvError;
use tracing::{debug, info, warn};

pub(crate) fn factory_test(node: &mut Node, args: &SpawnArgs) -> Result<Spawned> {
    spawn_with_format(node, args, "test")
}

pub(crate) fn factory_zeek(node: &mut Node, args: &SpawnArgs) -> Result<Spawned> {
    spawn_with_format(node, args, "zeek")
}

pub(crate) fn factory_json(node: &mut Node, args: &SpawnArgs) -> Result<Spawned> {
    spawn_with_format(node, args, "json")
}

fn spawn_with_format(node: &mut Node, args: &SpawnArgs, format: &str) -> Result<Spawned> {
    let import = settings::get(&args.invocation.options, "import")
        .cloned()
        .unwrap_or_else(|| serde_json::json!({}));
    let reader_settings: ReaderSettings = serde_json::from_value(import)
        .map_err(|e| Error::unexpected_arguments(format!("bad import options: {e}")))?;
    let reader = make_reader(format, &reader_settings)?;
    let accountant = node.lookup("accountant");
    Ok(spawn(
        args.label.clone(),
        reader,
        reader_settings.batch_rows,
        accountant,
        node.capacity(),
    ))
}

struct SourceState {
    label: String,
    format: String,
    sinks: Vec<ComponentHandle>,
    active: bool,
    produced: u64,
}

enum Flow {
    Continue,
    Stop,
}

impl SourceState {
    fn on_msg(&mut self, msg: ComponentMsg) -> Flow {
        match msg {
            ComponentMsg::Sink(handle) => {
                debug!(label = %self.label, sink = handle.id(), "got a new sink");
                self.sinks.push(handle);
                self.active = true;
            }
            ComponentMsg::Status { reply } => {
                let _ = reply.send(json!({
                    "type": "source",
                    "format": self.format,
                    "produced": self.produced,
                    "sinks": self.sinks.len(),
                }));
            }
            ComponentMsg::Signal { atom, reply } => {
                let result = match atom.as_str() {
                    "run" => {
                        self.active = true;
                        Ok(())
                    }
                    other => Err(Error::unspecified(format!("unknown signal: {other}"))),
                };
                let _ = reply.send(result);
            }
            ComponentMsg::Shutdown => return Flow::Stop,
            _ => {}
        }
        Flow::Continue
    }
}

pub fn spawn(
    label: String,
    reader: Box<dyn Reader>,
    batch_rows: usize,
    accountant: Option<ComponentHandle>,
    capacity: usize,
) -> Spawned {
    spawn_component(capacity, move |mut mailbox, cancel| async move {
        let mut reader = reader;
        let mut state = SourceState {
            label: label.clone(),
            format: reader.name().to_string(),
            sinks: Vec::new(),
            active: false,
            produced: 0,
        };
        'outer: loop {
            // Drain control messages without blocking while reading.
            loop {
                match mailbox.try_recv() {
                    Ok(msg) => {
                        if matches!(state.on_msg(msg), Flow::Stop) {
                            break 'outer;
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => break 'outer,
                }
            }
            if cancel.is_cancelled() {
                break;
            }
            if !state.active || state.sinks.is_empty() {
                match mailbox.recv().await {
                    Some(msg) => {
                        if matches!(state.on_msg(msg), Flow::Stop) {
                            break;
                        }
                    }
                    None => break,
                }
                continue;
            }
            match reader.next_batch(batch_rows).await {
                Ok(Some(slice)) => {
                    state.produced += slice.rows() as u64;
                    for sink in &state.sinks {
                        let _ = sink.send(ComponentMsg::Slice(slice.clone())).await;
                    }
                    if let Some(accountant) = &accountant {
                        let _ = accountant
                            .send(ComponentMsg::Telemetry {
                                label: label.clone(),
                                key: "produced".to_string(),
                                value: state.produced as f64,
                            })
                            .await;
                    }
                }
                Ok(None) => {
                    info!(label = %state.label, produced = state.produced, "source exhausted its input");
                    state.active = false;
                }
                Err(e) => {
                    warn!(label = %state.label, error = %e, "source failed to read");
                    state.active = false;
                }
            }
        }
        debug!(label = %state.label, produced = state.produced, "source terminated");
        Ok(())
    })
}
