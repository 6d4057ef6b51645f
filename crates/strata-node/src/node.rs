//! The node supervisor: spawns components through factory tables, owns the
//! registry, wires the ingest pipeline, serves the command surface, and
//! tears everything down in pipeline order on exit.

use crate::component::{ComponentHandle, Spawned};
use crate::registry::{Component, ComponentEntry, ComponentRegistry};
use crate::settings::{self, Invocation};
use crate::{accountant, archive, exporter, filesystem, importer, indexer, sink, source,
    type_registry};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use strata_core::{Error, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default deadline for outbound requests.
pub const INITIAL_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default mailbox capacity of spawned components.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Component types that get counter-suffixed labels; every other type
/// labels its single instance with the bare type name.
const MULTI_INSTANCE: [&str; 3] = ["source", "sink", "exporter"];

/// Spawns a component for the node with prepared arguments.
pub type ComponentFactory = fn(&mut Node, &SpawnArgs) -> Result<Spawned>;

/// Arguments handed to a component factory.
#[derive(Debug)]
pub struct SpawnArgs {
    pub invocation: Invocation,
    /// Persistent-state directory of the component, `<dir>/<type>-<label>`.
    pub dir: PathBuf,
    pub label: String,
}

impl SpawnArgs {
    /// Fails with `unexpected_arguments` when positional arguments remain.
    pub fn expect_no_arguments(&self) -> Result<()> {
        if self.invocation.arguments.is_empty() {
            Ok(())
        } else {
            Err(Error::unexpected_arguments(format!(
                "{} takes no arguments",
                self.invocation.full_name
            )))
        }
    }
}

/// Static configuration of a node, including its factory tables. Threaded
/// through construction so nothing global needs mutation.
pub struct NodeConfig {
    pub name: String,
    pub dir: PathBuf,
    pub channel_capacity: usize,
    pub request_timeout: Duration,
    factories: BTreeMap<String, ComponentFactory>,
}

impl NodeConfig {
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            request_timeout: INITIAL_REQUEST_TIMEOUT,
            factories: default_factories(),
        }
    }

    /// Adds or overrides a component factory, e.g. `"spawn source pcap"`.
    pub fn with_factory(mut self, full_name: impl Into<String>, factory: ComponentFactory) -> Self {
        self.factories.insert(full_name.into(), factory);
        self
    }
}

fn default_factories() -> BTreeMap<String, ComponentFactory> {
    let mut factories: BTreeMap<String, ComponentFactory> = BTreeMap::new();
    factories.insert("spawn accountant".into(), accountant::factory);
    factories.insert("spawn archive".into(), archive::factory);
    factories.insert("spawn exporter".into(), exporter::factory);
    factories.insert("spawn importer".into(), importer::factory);
    factories.insert("spawn index".into(), indexer::factory);
    factories.insert("spawn type-registry".into(), type_registry::factory);
    factories.insert("spawn source test".into(), source::factory_test);
    factories.insert("spawn source zeek".into(), source::factory_zeek);
    factories.insert("spawn source json".into(), source::factory_json);
    factories.insert("spawn sink ascii".into(), sink::factory_ascii);
    factories.insert("spawn sink json".into(), sink::factory_json);
    factories
}

/// The outcome of a node command.
#[derive(Debug, PartialEq)]
pub enum CommandResult {
    Ok,
    Spawned { label: String },
    Status(Value),
}

enum NodeMsg {
    Invocation {
        invocation: Invocation,
        reply: oneshot::Sender<Result<CommandResult>>,
    },
    Down {
        id: u64,
    },
    Exit {
        reply: oneshot::Sender<()>,
    },
}

/// Supervisor state. Owned by the node task; external access goes through
/// a [`NodeHandle`].
pub struct Node {
    name: String,
    dir: PathBuf,
    channel_capacity: usize,
    request_timeout: Duration,
    factories: BTreeMap<String, ComponentFactory>,
    registry: ComponentRegistry,
    label_counters: BTreeMap<String, u64>,
    detached: usize,
    tx: mpsc::UnboundedSender<NodeMsg>,
}

impl Node {
    /// Creates the base directory, spawns the filesystem component, and
    /// starts the supervisor task. Failure to create the directory or to
    /// register the filesystem aborts node construction.
    pub fn start(config: NodeConfig) -> Result<NodeHandle> {
        std::fs::create_dir_all(&config.dir).map_err(|e| {
            Error::io(format!(
                "failed to create node directory {}: {e}",
                config.dir.display()
            ))
        })?;
        let (tx, rx) = mpsc::unbounded_channel();
        let mut node = Node {
            name: config.name,
            dir: config.dir,
            channel_capacity: config.channel_capacity,
            request_timeout: config.request_timeout,
            factories: config.factories,
            registry: ComponentRegistry::default(),
            label_counters: BTreeMap::new(),
            detached: 0,
            tx: tx.clone(),
        };
        let fs = filesystem::spawn(node.dir.clone(), node.channel_capacity);
        node.register("filesystem", "filesystem".to_string(), fs)?;
        node.detached = 1;
        info!(node = %node.name, dir = %node.dir.display(), "node is up");
        let task = tokio::spawn(node.run(rx));
        Ok(NodeHandle { tx, task })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn capacity(&self) -> usize {
        self.channel_capacity
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// The handle of the first component registered under a type.
    pub fn lookup(&self, ty: &str) -> Option<ComponentHandle> {
        self.registry
            .equal_range(ty)
            .next()
            .map(|entry| entry.component.handle.clone())
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<NodeMsg>) {
        while let Some(msg) = rx.recv().await {
            match msg {
                NodeMsg::Invocation { invocation, reply } => {
                    let result = self.handle_invocation(invocation).await;
                    let _ = reply.send(result);
                }
                NodeMsg::Down { id } => {
                    if let Some((ty, entry)) = self.registry.erase_by_id(id) {
                        debug!(
                            node = %self.name,
                            component = %entry.component.label,
                            %ty,
                            "got DOWN, removing component"
                        );
                    }
                }
                NodeMsg::Exit { reply } => {
                    self.shutdown().await;
                    let _ = reply.send(());
                    break;
                }
            }
        }
    }

    async fn handle_invocation(&mut self, invocation: Invocation) -> Result<CommandResult> {
        debug!(
            node = %self.name,
            command = %invocation.full_name,
            arguments = ?invocation.arguments,
            "got command"
        );
        match invocation.full_name.as_str() {
            "status" => self.status_command().await,
            "kill" => self.kill_command(&invocation).await,
            "send" => self.send_command(&invocation).await,
            name if name == "spawn" || name.starts_with("spawn ") => {
                self.spawn_command(invocation).await
            }
            name => Err(Error::syntax(format!("unknown command: {name}"))),
        }
    }

    async fn spawn_command(&mut self, mut invocation: Invocation) -> Result<CommandResult> {
        let tokens: Vec<&str> = invocation.full_name.split_whitespace().collect();
        if tokens.len() < 2 {
            return Err(Error::syntax("spawn requires a component type"));
        }
        let comp_type = tokens[1].to_string();
        // Auto-generate a label if none given.
        let label = match settings::get_str(&invocation.options, "spawn.label") {
            Some(label) => label.to_string(),
            None if MULTI_INSTANCE.contains(&comp_type.as_str()) => {
                let counter = self.label_counters.entry(comp_type.clone()).or_insert(0);
                *counter += 1;
                let label = format!("{comp_type}-{counter}");
                debug!(node = %self.name, %label, "auto-generated new label");
                label
            }
            None => comp_type.clone(),
        };
        debug!(node = %self.name, component = %comp_type, %label, "spawns a component");
        // Let format readers see one flat options view.
        if comp_type == "source" {
            merge_source_options(&mut invocation.options);
        }
        let Some(factory) = self.factories.get(invocation.full_name.as_str()).copied() else {
            return Err(Error::invalid_spawn(format!(
                "invalid spawn component: {}",
                invocation.full_name
            )));
        };
        let dir = self.dir.join(format!("{comp_type}-{label}"));
        let args = SpawnArgs {
            invocation,
            dir,
            label: label.clone(),
        };
        let spawned = factory(self, &args).map_err(|e| {
            warn!(node = %self.name, error = %e, "got an error from a component factory");
            e
        })?;
        let handle = self.register(&comp_type, label.clone(), spawned)?;
        self.wire(&comp_type, &handle).await;
        Ok(CommandResult::Spawned { label })
    }

    /// Registers a component under `(type, label)` and begins monitoring:
    /// when its task terminates, a down notification removes it from the
    /// registry.
    fn register(&mut self, ty: &str, label: String, spawned: Spawned) -> Result<ComponentHandle> {
        let Spawned { handle, task } = spawned;
        let monitored = {
            let tx = self.tx.clone();
            let id = handle.id();
            tokio::spawn(async move {
                let _ = task.await;
                let _ = tx.send(NodeMsg::Down { id });
            })
        };
        let entry = ComponentEntry {
            component: Component {
                handle: handle.clone(),
                label,
            },
            task: monitored,
        };
        if let Err(e) = self.registry.insert(ty, entry) {
            // Terminate the spawned instance again; its down notification
            // finds nothing to remove.
            let orphan = handle.clone();
            tokio::spawn(async move { orphan.shutdown().await });
            return Err(e);
        }
        Ok(handle)
    }

    /// Wires a freshly registered component to existing ones by type.
    async fn wire(&mut self, ty: &str, handle: &ComponentHandle) {
        let handles = |registry: &ComponentRegistry, ty: &str| -> Vec<ComponentHandle> {
            registry
                .equal_range(ty)
                .map(|entry| entry.component.handle.clone())
                .collect()
        };
        match ty {
            "exporter" => {
                for archive in handles(&self.registry, "archive") {
                    let _ = handle.send(crate::ComponentMsg::Archive(archive)).await;
                }
                for index in handles(&self.registry, "index") {
                    let _ = handle.send(crate::ComponentMsg::Index(index)).await;
                }
                for sink in handles(&self.registry, "sink") {
                    let _ = handle.send(crate::ComponentMsg::Sink(sink)).await;
                }
            }
            "importer" => {
                for source in handles(&self.registry, "source") {
                    let _ = source.send(crate::ComponentMsg::Sink(handle.clone())).await;
                }
            }
            "sink" => {
                for exporter in handles(&self.registry, "exporter") {
                    let _ = exporter
                        .send(crate::ComponentMsg::Sink(handle.clone()))
                        .await;
                }
            }
            _ => {}
        }
    }

    async fn status_command(&mut self) -> Result<CommandResult> {
        // Pre-fill the result with system stats.
        let mut system = Map::new();
        system.insert("running-components".into(), json!(self.registry.len()));
        system.insert("detached-components".into(), json!(self.detached));
        system.insert(
            "worker-threads".into(),
            json!(tokio::runtime::Handle::current().metrics().num_workers()),
        );
        system.insert("table-slices".into(), json!(strata_core::instances()));
        // Fan out to every component with a bounded deadline.
        let queries: Vec<_> = self
            .registry
            .iter()
            .map(|(_, entry)| {
                let label = entry.component.label.clone();
                let handle = entry.component.handle.clone();
                let deadline = self.request_timeout;
                async move { (label, handle.status(deadline).await) }
            })
            .collect();
        let mut components = Map::new();
        for (label, result) in futures::future::join_all(queries).await {
            let value = match result {
                Ok(dict) => dict,
                Err(e) => {
                    warn!(node = %self.name, component = %label, error = %e, "failed to retrieve status");
                    Value::String(e.to_string())
                }
            };
            components.insert(label, value);
        }
        let mut content = Map::new();
        content.insert("system".into(), Value::Object(system));
        content.insert(self.name.clone(), Value::Object(components));
        Ok(CommandResult::Status(Value::Object(content)))
    }

    async fn kill_command(&mut self, invocation: &Invocation) -> Result<CommandResult> {
        if invocation.arguments.len() != 1 {
            return Err(Error::syntax("expected exactly one component argument"));
        }
        let label = &invocation.arguments[0];
        let Some((_, entry)) = self.registry.find_by_label(label) else {
            return Err(Error::missing_component(format!(
                "no such component: {label}"
            )));
        };
        let handle = entry.component.handle.clone();
        handle.shutdown().await;
        // Replies on acceptance: termination is asynchronous, and the down
        // notification unregisters the component once it happened.
        Ok(CommandResult::Ok)
    }

    async fn send_command(&mut self, invocation: &Invocation) -> Result<CommandResult> {
        if invocation.arguments.len() != 2 {
            return Err(Error::syntax(
                "expected two arguments: receiver and message atom",
            ));
        }
        let label = &invocation.arguments[0];
        let atom = &invocation.arguments[1];
        let Some((_, entry)) = self.registry.find_by_label(label) else {
            return Err(Error::syntax(format!(
                "registry contains no component named {label}"
            )));
        };
        let handle = entry.component.handle.clone();
        handle.signal(atom, self.request_timeout).await?;
        Ok(CommandResult::Ok)
    }

    /// Sequential shutdown: the accountant drains first because it acts
    /// like a source, then the ingest pipeline tears down from source to
    /// exporter, then everything else, and the filesystem goes last. A
    /// stage begins only after the previous stage fully terminated.
    async fn shutdown(&mut self) {
        info!(node = %self.name, "got EXIT, terminating components in pipeline order");
        let mut stages: Vec<Vec<ComponentEntry>> = Vec::new();
        stages.push(self.registry.remove_type("accountant"));
        for ty in ["source", "importer", "archive", "index", "exporter"] {
            stages.push(self.registry.remove_type(ty));
        }
        stages.push(self.registry.remove_all_except(&["filesystem"]));
        stages.push(self.registry.remove_type("filesystem"));
        for stage in stages {
            if stage.is_empty() {
                continue;
            }
            for entry in &stage {
                debug!(node = %self.name, component = %entry.component.label, "terminates");
                entry.component.handle.shutdown().await;
            }
            let tasks = stage.into_iter().map(|entry| entry.task);
            for result in futures::future::join_all(tasks).await {
                if let Err(e) = result {
                    warn!(node = %self.name, error = %e, "component task failed to join");
                }
            }
        }
        debug!(node = %self.name, "terminated all components");
    }
}

fn merge_source_options(options: &mut Value) {
    let Some(source) = settings::get(options, "spawn.source").cloned() else {
        return;
    };
    let Some(object) = options.as_object_mut() else {
        return;
    };
    let import = object
        .entry("import")
        .or_insert_with(|| Value::Object(Map::new()));
    settings::merge(&source, import);
}

/// Client-side handle of a running node.
pub struct NodeHandle {
    tx: mpsc::UnboundedSender<NodeMsg>,
    task: JoinHandle<()>,
}

impl NodeHandle {
    /// Runs one command on the node and awaits its outcome.
    pub async fn invoke(&self, invocation: Invocation) -> Result<CommandResult> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(NodeMsg::Invocation { invocation, reply })
            .map_err(|_| Error::unspecified("node terminated"))?;
        rx.await
            .map_err(|_| Error::unspecified("node dropped the command"))?
    }

    /// Sends the exit signal and waits for the ordered shutdown to finish.
    pub async fn exit(self) {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(NodeMsg::Exit { reply }).is_ok() {
            let _ = rx.await;
        }
        let _ = self.task.await;
    }
}
