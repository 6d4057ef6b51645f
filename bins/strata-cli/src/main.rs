//! # Strata CLI - Node Runner
//!
//! Starts a Strata node, optionally executes the component spawns listed
//! in a YAML node spec, and runs until CTRL-C triggers the ordered
//! shutdown of the ingest pipeline.
//!
//! ## Usage
//!
//! ```bash
//! # Run a bare node (filesystem only) under ./strata.db
//! strata-cli --dir ./strata.db
//!
//! # Bring up a full ingest pipeline from a spec file
//! strata-cli --dir ./strata.db --spec examples-specs/ingest.yml
//!
//! # Enable debug logging
//! RUST_LOG=debug strata-cli --dir ./strata.db
//! ```
//!
//! ## Node Spec
//!
//! ```yaml
//! components:
//!   - command: spawn archive
//!   - command: spawn index
//!   - command: spawn type-registry
//!   - command: spawn source zeek
//!     options:
//!       spawn:
//!         source:
//!           read: "logs/conn.log"
//!   - command: spawn importer
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use strata_node::{CommandResult, Invocation, Node, NodeConfig};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for the node runner
#[derive(Parser, Debug)]
#[command(name = "strata-cli")]
#[command(about = "Strata node runner")]
struct Args {
    /// Base directory for persistent node state
    #[arg(short, long, default_value = "strata.db")]
    dir: PathBuf,

    /// Name of this node
    #[arg(short, long, default_value = "node")]
    name: String,

    /// YAML node spec listing components to spawn at startup
    #[arg(short, long)]
    spec: Option<PathBuf>,

    /// Mailbox capacity of spawned components
    #[arg(long, default_value_t = strata_node::DEFAULT_CHANNEL_CAPACITY)]
    channel_capacity: usize,

    /// Deadline in seconds for status and signal requests
    #[arg(long, default_value_t = 10)]
    request_timeout: u64,

    /// Print the status document once all spec components are up
    #[arg(long)]
    status: bool,
}

/// A node spec: the components to spawn at startup, in order.
#[derive(Debug, Default, Serialize, Deserialize)]
struct NodeSpec {
    #[serde(default)]
    components: Vec<ComponentSpec>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ComponentSpec {
    /// Full spawn command, e.g. `spawn source zeek`.
    command: String,

    #[serde(default)]
    arguments: Vec<String>,

    /// Nested options, e.g. `spawn.label` or `spawn.source.read`.
    #[serde(default = "empty_options")]
    options: serde_json::Value,
}

fn empty_options() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let spec: NodeSpec = match &args.spec {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_yaml::from_str(&raw).with_context(|| format!("bad spec {}", path.display()))?
        }
        None => NodeSpec::default(),
    };

    let mut config = NodeConfig::new(&args.name, &args.dir);
    config.channel_capacity = args.channel_capacity;
    config.request_timeout = Duration::from_secs(args.request_timeout);
    let node = Node::start(config)?;

    for component in &spec.components {
        let invocation = Invocation::new(&component.command)
            .with_arguments(component.arguments.clone())
            .with_options(component.options.clone());
        match node.invoke(invocation).await {
            Ok(CommandResult::Spawned { label }) => {
                info!(command = %component.command, %label, "spawned");
            }
            Ok(_) => {}
            Err(e) => anyhow::bail!("{}: {e}", component.command),
        }
    }

    if args.status {
        if let CommandResult::Status(doc) = node.invoke(Invocation::new("status")).await? {
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
    }

    signal::ctrl_c().await?;
    println!("\nReceived Ctrl-C, shutting down...");
    node.exit().await;
    Ok(())
}
