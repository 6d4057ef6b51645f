//! The filesystem component: all persistent-state I/O of a node goes
//! through this task, rooted at the node's base directory. It is spawned
//! during node initialization and is the last component to terminate.

use crate::component::{spawn_component, ComponentMsg, Spawned};
use serde_json::json;
use std::path::{Path, PathBuf};
use strata_core::{Error, Result};
use tracing::debug;

pub fn spawn(root: PathBuf, capacity: usize) -> Spawned {
    spawn_component(capacity, move |mut mailbox, _cancel| async move {
        let mut writes: u64 = 0;
        let mut reads: u64 = 0;
        let mut failures: u64 = 0;
        while let Some(msg) = mailbox.recv().await {
            match msg {
                ComponentMsg::Write {
                    path,
                    contents,
                    reply,
                } => {
                    let result = write(&root, &path, &contents).await;
                    if result.is_ok() {
                        writes += 1;
                    } else {
                        failures += 1;
                    }
                    let _ = reply.send(result);
                }
                ComponentMsg::Read { path, reply } => {
                    let result = read(&root, &path).await;
                    if result.is_ok() {
                        reads += 1;
                    } else {
                        failures += 1;
                    }
                    let _ = reply.send(result);
                }
                ComponentMsg::Status { reply } => {
                    let _ = reply.send(json!({
                        "type": "filesystem",
                        "root": root.display().to_string(),
                        "writes": writes,
                        "reads": reads,
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
        debug!(root = %root.display(), "filesystem terminated");
        Ok(())
    })
}

fn resolve(root: &Path, path: &Path) -> Result<PathBuf> {
    if path.is_absolute() || path.components().any(|c| matches!(c, std::path::Component::ParentDir))
    {
        return Err(Error::io(format!(
            "path must stay below the filesystem root: {}",
            path.display()
        )));
    }
    Ok(root.join(path))
}

async fn write(root: &Path, path: &Path, contents: &[u8]) -> Result<()> {
    let target = resolve(root, path)?;
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&target, contents).await?;
    Ok(())
}

async fn read(root: &Path, path: &Path) -> Result<Vec<u8>> {
    let target = resolve(root, path)?;
    Ok(tokio::fs::read(&target).await?)
}
