//! The accountant aggregates telemetry reports from other components. It
//! acts like a source of metric data, so shutdown drains it before the
//! ingest pipeline.

use crate::component::{spawn_component, ComponentMsg, Spawned};
use crate::node::{Node, SpawnArgs};
use serde_json::json;
use std::collections::BTreeMap;
use strata_core::Result;
use tracing::{debug, info};

pub(crate) fn factory(node: &mut Node, args: &SpawnArgs) -> Result<Spawned> {
    args.expect_no_arguments()?;
    Ok(spawn(node.capacity()))
}

pub fn spawn(capacity: usize) -> Spawned {
    spawn_component(capacity, move |mut mailbox, _cancel| async move {
        let mut metrics: BTreeMap<String, f64> = BTreeMap::new();
        let mut reports: u64 = 0;
        while let Some(msg) = mailbox.recv().await {
            match msg {
                ComponentMsg::Telemetry { label, key, value } => {
                    debug!(%label, %key, value, "accounts a report");
                    metrics.insert(format!("{label}.{key}"), value);
                    reports += 1;
                }
                ComponentMsg::Status { reply } => {
                    let _ = reply.send(json!({
                        "type": "accountant",
                        "reports": reports,
                        "metrics": metrics,
                    }));
                }
                ComponentMsg::Signal { reply, .. } => {
                    let _ = reply.send(Ok(()));
                }
                ComponentMsg::Shutdown => break,
                _ => {}
            }
        }
        // Flush what we have before going down.
        for (key, value) in &metrics {
            info!(%key, value, "final metric");
        }
        info!(reports, "accountant flushed metrics");
        Ok(())
    })
}
