//! The importer stamps absolute row ids onto incoming slices and fans them
//! out to the archive, the index, and the type registry. The id high-water
//! mark persists across restarts through the filesystem component.

use crate::component::{spawn_component, ComponentHandle, ComponentMsg, Spawned};
use crate::node::{Node, SpawnArgs};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use strata_core::{Error, Result};
use tracing::{debug, info, warn};

pub(crate) fn factory(node: &mut Node, args: &SpawnArgs) -> Result<Spawned> {
    args.expect_no_arguments()?;
    let archive = node
        .lookup("archive")
        .ok_or_else(|| Error::missing_component("archive"))?;
    let index = node
        .lookup("index")
        .ok_or_else(|| Error::missing_component("index"))?;
    let type_registry = node
        .lookup("type-registry")
        .ok_or_else(|| Error::missing_component("type-registry"))?;
    let filesystem = node
        .lookup("filesystem")
        .ok_or_else(|| Error::missing_component("filesystem"))?;
    let accountant = node.lookup("accountant");
    let deps = Dependencies {
        archive,
        index,
        type_registry,
        filesystem,
        accountant,
    };
    let state_path = PathBuf::from(format!("importer-{}", args.label)).join("next-id");
    Ok(spawn(deps, state_path, node.request_timeout(), node.capacity()))
}

pub struct Dependencies {
    pub archive: ComponentHandle,
    pub index: ComponentHandle,
    pub type_registry: ComponentHandle,
    pub filesystem: ComponentHandle,
    pub accountant: Option<ComponentHandle>,
}

pub fn spawn(
    deps: Dependencies,
    state_path: PathBuf,
    timeout: Duration,
    capacity: usize,
) -> Spawned {
    spawn_component(capacity, move |mut mailbox, _cancel| async move {
        let mut next_id = restore(&deps.filesystem, &state_path, timeout).await;
        info!(next_id, "importer starts");
        let mut imported: u64 = 0;
        while let Some(msg) = mailbox.recv().await {
            match msg {
                ComponentMsg::Slice(mut slice) => {
                    slice.set_offset(next_id);
                    next_id += slice.rows() as u64;
                    imported += slice.rows() as u64;
                    debug!(offset = slice.offset(), rows = slice.rows(), "imports a slice");
                    let _ = deps
                        .type_registry
                        .send(ComponentMsg::Slice(slice.clone()))
                        .await;
                    let _ = deps.archive.send(ComponentMsg::Slice(slice.clone())).await;
                    let _ = deps.index.send(ComponentMsg::Slice(slice)).await;
                    if let Some(accountant) = &deps.accountant {
                        let _ = accountant
                            .send(ComponentMsg::Telemetry {
                                label: "importer".to_string(),
                                key: "events".to_string(),
                                value: imported as f64,
                            })
                            .await;
                    }
                }
                ComponentMsg::Status { reply } => {
                    let _ = reply.send(json!({
                        "type": "importer",
                        "next-id": next_id,
                        "imported": imported,
                    }));
                }
                ComponentMsg::Signal { atom, reply } => {
                    let result = match atom.as_str() {
                        "flush" => persist(&deps.filesystem, &state_path, next_id, timeout).await,
                        _ => Ok(()),
                    };
                    let _ = reply.send(result);
                }
                ComponentMsg::Shutdown => break,
                _ => {}
            }
        }
        if let Err(e) = persist(&deps.filesystem, &state_path, next_id, timeout).await {
            warn!(error = %e, "importer failed to persist its id state");
        }
        debug!(imported, "importer terminated");
        Ok(())
    })
}

async fn restore(filesystem: &ComponentHandle, state_path: &PathBuf, timeout: Duration) -> u64 {
    match filesystem.read_file(state_path.clone(), timeout).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).trim().parse().unwrap_or(0),
        Err(_) => 0,
    }
}

async fn persist(
    filesystem: &ComponentHandle,
    state_path: &PathBuf,
    next_id: u64,
    timeout: Duration,
) -> Result<()> {
    filesystem
        .write_file(state_path.clone(), next_id.to_string().into_bytes(), timeout)
        .await
}
