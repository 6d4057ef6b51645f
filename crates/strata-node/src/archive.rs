//! The archive stores raw slices. The on-disk segment format is owned by
//! this component; the rest of the node only hands it slices.

use crate::component::{spawn_component, ComponentMsg, Spawned};
use crate::node::{Node, SpawnArgs};
use serde_json::json;
use std::path::{Path, PathBuf};
use strata_core::{write_slice, Result, Slice};
use tracing::{debug, warn};

pub(crate) fn factory(node: &mut Node, args: &SpawnArgs) -> Result<Spawned> {
    args.expect_no_arguments()?;
    Ok(spawn(args.dir.clone(), node.capacity()))
}

pub fn spawn(dir: PathBuf, capacity: usize) -> Spawned {
    spawn_component(capacity, move |mut mailbox, _cancel| async move {
        let mut slices: Vec<Slice> = Vec::new();
        let mut events: u64 = 0;
        while let Some(msg) = mailbox.recv().await {
            match msg {
                ComponentMsg::Slice(slice) => {
                    debug!(rows = slice.rows(), offset = slice.offset(), "archives a slice");
                    events += slice.rows() as u64;
                    slices.push(slice);
                }
                ComponentMsg::Status { reply } => {
                    let _ = reply.send(json!({
                        "type": "archive",
                        "slices": slices.len(),
                        "events": events,
                    }));
                }
                ComponentMsg::Signal { atom, reply } => {
                    let result = match atom.as_str() {
                        "flush" => persist(&dir, &slices).await,
                        _ => Ok(()),
                    };
                    let _ = reply.send(result);
                }
                ComponentMsg::Shutdown => break,
                _ => {}
            }
        }
        if let Err(e) = persist(&dir, &slices).await {
            warn!(error = %e, "archive failed to persist segments");
        }
        debug!(slices = slices.len(), "archive terminated");
        Ok(())
    })
}

/// Writes all slices as concatenated frames into one segment file.
async fn persist(dir: &Path, slices: &[Slice]) -> Result<()> {
    if slices.is_empty() {
        return Ok(());
    }
    let mut bytes = Vec::new();
    for slice in slices {
        write_slice(slice, &mut bytes)?;
    }
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::write(dir.join("segments.bin"), bytes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{read_slice, Data, GenericSlice, Type};

    #[tokio::test]
    async fn persists_segments_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let Spawned { handle, task } = spawn(dir.path().join("archive"), 8);
        let layout = Type::record([("a", Type::count())]).with_name("event");
        let slice = GenericSlice::make(layout, &[vec![Data::Count(1)], vec![Data::Count(2)]]).unwrap();
        handle.send(ComponentMsg::Slice(slice.clone())).await.unwrap();
        let status = handle.status(std::time::Duration::from_secs(5)).await.unwrap();
        assert_eq!(status["events"], 2);
        handle.shutdown().await;
        task.await.unwrap();

        let bytes = std::fs::read(dir.path().join("archive/segments.bin")).unwrap();
        let mut input = bytes.as_slice();
        let restored = read_slice(&mut input).unwrap();
        assert_eq!(restored, slice);
        assert!(input.is_empty());
    }
}
