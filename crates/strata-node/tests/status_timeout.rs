//! A component that sits on its status request past the deadline must not
//! poison the aggregate document: its label maps to the rendered error and
//! everyone else reports normally.

use serde_json::{json, Value};
use std::time::Duration;
use strata_node::{
    spawn_component, CommandResult, ComponentMsg, Invocation, Node, NodeConfig, Spawned, SpawnArgs,
};

fn stuck_factory(_node: &mut Node, _args: &SpawnArgs) -> strata_core::Result<Spawned> {
    Ok(spawn_component(8, move |mut mailbox, _cancel| async move {
        // Parked replies: never answered, never dropped until shutdown.
        let mut parked = Vec::new();
        while let Some(msg) = mailbox.recv().await {
            match msg {
                ComponentMsg::Status { reply } => parked.push(reply),
                ComponentMsg::Shutdown => break,
                _ => {}
            }
        }
        Ok(())
    }))
}

#[tokio::test]
async fn timed_out_components_render_their_error_inline() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = NodeConfig::new("test-node", dir.path().join("db"))
        .with_factory("spawn exporter", stuck_factory);
    config.request_timeout = Duration::from_millis(200);
    let node = Node::start(config).unwrap();
    node.invoke(Invocation::new("spawn archive")).await.unwrap();
    node.invoke(Invocation::new("spawn exporter")).await.unwrap();

    let CommandResult::Status(doc) = node.invoke(Invocation::new("status")).await.unwrap() else {
        panic!("expected a status document");
    };
    let components = doc["test-node"].as_object().unwrap();
    let stuck = components.get("exporter-1").unwrap();
    assert!(
        stuck.as_str().unwrap().contains("timeout"),
        "expected a rendered timeout error, got {stuck}"
    );
    assert_eq!(components["archive"]["type"], json!("archive"));
    assert_eq!(
        components["filesystem"]["type"],
        Value::from("filesystem")
    );
    node.exit().await;
}
