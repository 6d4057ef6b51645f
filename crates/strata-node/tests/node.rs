//! End-to-end node scenarios: labeling, singleton policy, pipeline wiring,
//! ingest flow, and the kill command.

use serde_json::{json, Value};
use std::time::Duration;
use strata_core::ErrorKind;
use strata_node::{CommandResult, Invocation, Node, NodeConfig, NodeHandle};

fn config(dir: &std::path::Path) -> NodeConfig {
    NodeConfig::new("test-node", dir.join("db"))
}

async fn status(node: &NodeHandle) -> Value {
    match node.invoke(Invocation::new("status")).await.unwrap() {
        CommandResult::Status(value) => value,
        other => panic!("expected a status document, got {other:?}"),
    }
}

/// Polls the status document until `predicate` holds.
async fn wait_until(node: &NodeHandle, predicate: impl Fn(&Value) -> bool) -> Value {
    for _ in 0..100 {
        let doc = status(node).await;
        if predicate(&doc) {
            return doc;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("condition did not hold within the deadline");
}

#[tokio::test]
async fn sources_get_counter_suffixed_labels() {
    let dir = tempfile::tempdir().unwrap();
    let node = Node::start(config(dir.path())).unwrap();
    for expected in ["source-1", "source-2", "source-3"] {
        let result = node
            .invoke(Invocation::new("spawn source test"))
            .await
            .unwrap();
        assert_eq!(
            result,
            CommandResult::Spawned {
                label: expected.to_string()
            }
        );
    }
    let doc = status(&node).await;
    for label in ["source-1", "source-2", "source-3"] {
        assert!(doc["test-node"].get(label).is_some(), "missing {label}");
    }
    node.exit().await;
}

#[tokio::test]
async fn spawn_label_option_overrides_the_counter() {
    let dir = tempfile::tempdir().unwrap();
    let node = Node::start(config(dir.path())).unwrap();
    let result = node
        .invoke(
            Invocation::new("spawn source test")
                .with_options(json!({"spawn": {"label": "zeek-reader"}})),
        )
        .await
        .unwrap();
    assert_eq!(
        result,
        CommandResult::Spawned {
            label: "zeek-reader".to_string()
        }
    );
    node.exit().await;
}

#[tokio::test]
async fn singletons_cannot_spawn_twice() {
    let dir = tempfile::tempdir().unwrap();
    let node = Node::start(config(dir.path())).unwrap();
    node.invoke(Invocation::new("spawn archive")).await.unwrap();
    let err = node
        .invoke(Invocation::new("spawn archive"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    let doc = status(&node).await;
    assert_eq!(doc["test-node"]["archive"]["type"], "archive");
    assert_eq!(doc["test-node"].as_object().unwrap().len(), 2); // archive + filesystem
    node.exit().await;
}

#[tokio::test]
async fn importer_requires_its_dependencies() {
    let dir = tempfile::tempdir().unwrap();
    let node = Node::start(config(dir.path())).unwrap();
    let err = node
        .invoke(Invocation::new("spawn importer"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingComponent);
    node.exit().await;
}

#[tokio::test]
async fn importer_is_advertised_to_existing_sources() {
    let dir = tempfile::tempdir().unwrap();
    let node = Node::start(config(dir.path())).unwrap();
    // Source first: a new importer must be sent to it as a sink.
    let options = json!({"spawn": {"source": {"max_events": 10, "batch_rows": 4}}});
    node.invoke(Invocation::new("spawn source test").with_options(options))
        .await
        .unwrap();
    node.invoke(Invocation::new("spawn archive")).await.unwrap();
    node.invoke(Invocation::new("spawn index")).await.unwrap();
    node.invoke(Invocation::new("spawn type-registry"))
        .await
        .unwrap();
    node.invoke(Invocation::new("spawn importer")).await.unwrap();

    let doc = wait_until(&node, |doc| {
        doc["test-node"]["importer"]["imported"] == json!(10)
            && doc["test-node"]["archive"]["events"] == json!(10)
            && doc["test-node"]["index"]["rows"] == json!(10)
    })
    .await;
    assert_eq!(doc["test-node"]["source-1"]["produced"], json!(10));
    assert_eq!(doc["test-node"]["type-registry"]["types"], json!(1));
    // Row ids continue monotonically across slices.
    assert_eq!(doc["test-node"]["importer"]["next-id"], json!(10));
    node.exit().await;
}

#[tokio::test]
async fn importer_resumes_its_row_ids_after_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("db");
    let node = Node::start(NodeConfig::new("test-node", &db)).unwrap();
    let options = json!({"spawn": {"source": {"max_events": 10, "batch_rows": 4}}});
    node.invoke(Invocation::new("spawn source test").with_options(options))
        .await
        .unwrap();
    node.invoke(Invocation::new("spawn archive")).await.unwrap();
    node.invoke(Invocation::new("spawn index")).await.unwrap();
    node.invoke(Invocation::new("spawn type-registry"))
        .await
        .unwrap();
    node.invoke(Invocation::new("spawn importer")).await.unwrap();
    wait_until(&node, |doc| {
        doc["test-node"]["importer"]["next-id"] == json!(10)
    })
    .await;

    // Persist the high-water mark, then take the importer down.
    let result = node
        .invoke(Invocation::new("send").with_arguments(["importer", "flush"]))
        .await
        .unwrap();
    assert_eq!(result, CommandResult::Ok);
    assert_eq!(
        std::fs::read_to_string(db.join("importer-importer/next-id")).unwrap(),
        "10"
    );
    node.invoke(Invocation::new("kill").with_arguments(["importer"]))
        .await
        .unwrap();
    wait_until(&node, |doc| doc["test-node"].get("importer").is_none()).await;

    // A fresh importer picks up where the previous one left off.
    node.invoke(Invocation::new("spawn importer")).await.unwrap();
    let doc = wait_until(&node, |doc| {
        doc["test-node"].get("importer").is_some_and(Value::is_object)
    })
    .await;
    assert_eq!(doc["test-node"]["importer"]["next-id"], json!(10));
    assert_eq!(doc["test-node"]["importer"]["imported"], json!(0));
    node.exit().await;
}

#[tokio::test]
async fn kill_accepts_then_unregisters_asynchronously() {
    let dir = tempfile::tempdir().unwrap();
    let node = Node::start(config(dir.path())).unwrap();
    node.invoke(Invocation::new("spawn source test"))
        .await
        .unwrap();
    node.invoke(Invocation::new("spawn source test"))
        .await
        .unwrap();
    let result = node
        .invoke(Invocation::new("kill").with_arguments(["source-2"]))
        .await
        .unwrap();
    assert_eq!(result, CommandResult::Ok);
    wait_until(&node, |doc| doc["test-node"].get("source-2").is_none()).await;
    let doc = status(&node).await;
    assert!(doc["test-node"].get("source-1").is_some());
    node.exit().await;

    let dir2 = tempfile::tempdir().unwrap();
    let node = Node::start(config(dir2.path())).unwrap();
    let err = node
        .invoke(Invocation::new("kill").with_arguments(["absent"]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingComponent);
    node.exit().await;
}

#[tokio::test]
async fn send_forwards_signals_by_label() {
    let dir = tempfile::tempdir().unwrap();
    let node = Node::start(config(dir.path())).unwrap();
    node.invoke(Invocation::new("spawn source test"))
        .await
        .unwrap();
    let result = node
        .invoke(Invocation::new("send").with_arguments(["source-1", "run"]))
        .await
        .unwrap();
    assert_eq!(result, CommandResult::Ok);
    let err = node
        .invoke(Invocation::new("send").with_arguments(["absent", "run"]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Syntax);
    let err = node
        .invoke(Invocation::new("send").with_arguments(["source-1"]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Syntax);
    node.exit().await;
}

#[tokio::test]
async fn unknown_commands_and_spawns_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let node = Node::start(config(dir.path())).unwrap();
    let err = node
        .invoke(Invocation::new("frobnicate"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Syntax);
    let err = node
        .invoke(Invocation::new("spawn pivoter"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidSpawn);
    let err = node
        .invoke(Invocation::new("spawn source pcap"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidSpawn);
    node.exit().await;
}

#[tokio::test]
async fn system_stats_cover_the_running_node() {
    let dir = tempfile::tempdir().unwrap();
    let node = Node::start(config(dir.path())).unwrap();
    node.invoke(Invocation::new("spawn archive")).await.unwrap();
    let doc = status(&node).await;
    assert_eq!(doc["system"]["running-components"], json!(2));
    assert_eq!(doc["system"]["detached-components"], json!(1));
    assert!(doc["system"]["worker-threads"].as_u64().unwrap() >= 1);
    assert!(doc["system"]["table-slices"].is_number());
    node.exit().await;
}
