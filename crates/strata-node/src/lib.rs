//! # Strata Node - Component Registry and Lifecycle Supervisor
//!
//! This crate provides the supervision layer of a Strata node. The node is
//! a message-driven task owning a registry of named components (archive,
//! index, importer, exporter, sources, sinks, accountant, type registry,
//! filesystem). It spawns components through factory tables, wires the
//! ingest pipeline automatically, serves `spawn`/`kill`/`send`/`status`
//! commands, and tears the pipeline down in ingest order on exit.
//!
//! ## Key Components
//!
//! - **Messaging**: mailbox-per-component tasks with one-shot replies
//! - **Registry**: a type-to-component multimap with singleton enforcement
//! - **Supervisor**: factory-driven spawning, monitoring, auto-wiring, and
//!   ordered sequential shutdown
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use strata_node::{Invocation, Node, NodeConfig};
//!
//! # async fn example() -> strata_core::Result<()> {
//! let node = Node::start(NodeConfig::new("node", "/tmp/strata"))?;
//! node.invoke(Invocation::new("spawn archive")).await?;
//! node.invoke(Invocation::new("spawn index")).await?;
//! node.invoke(Invocation::new("spawn type-registry")).await?;
//! node.invoke(Invocation::new("spawn importer")).await?;
//! node.invoke(Invocation::new("spawn source test")).await?;
//! node.exit().await;
//! # Ok(())
//! # }
//! ```

pub mod component;
pub mod node;
pub mod registry;
pub mod settings;

pub mod accountant;
pub mod archive;
pub mod exporter;
pub mod filesystem;
pub mod importer;
pub mod indexer;
pub mod sink;
pub mod source;
pub mod type_registry;

pub use component::{spawn_component, ComponentHandle, ComponentMsg, Mailbox, Spawned};
pub use node::{
    CommandResult, ComponentFactory, Node, NodeConfig, NodeHandle, SpawnArgs,
    DEFAULT_CHANNEL_CAPACITY, INITIAL_REQUEST_TIMEOUT,
};
pub use registry::{is_singleton, Component, ComponentEntry, ComponentRegistry, SINGLETONS};
pub use settings::Invocation;
