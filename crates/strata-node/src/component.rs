//! Component handles, mailboxes, and the message vocabulary.
//!
//! A component is an independent task draining its own mailbox; all
//! communication goes through [`ComponentMsg`] values. Requests that expect
//! an answer carry a one-shot reply channel. Shutdown is signalled by a
//! message plus a cancellation token and acknowledged by terminating.

use serde_json::Value;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use strata_core::{Error, Result, Slice};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Receiving end of a component's mailbox.
pub type Mailbox = mpsc::Receiver<ComponentMsg>;

/// Messages understood by node components.
#[derive(Debug)]
pub enum ComponentMsg {
    /// A batch of events moving through the ingest pipeline.
    Slice(Slice),

    /// Advertises a sink for the receiver's output.
    Sink(ComponentHandle),

    /// Hands an exporter the archive.
    Archive(ComponentHandle),

    /// Hands an exporter the index, tagged explicitly.
    Index(ComponentHandle),

    /// A metric report for the accountant.
    Telemetry {
        label: String,
        key: String,
        value: f64,
    },

    /// Requests the component's status dictionary.
    Status { reply: oneshot::Sender<Value> },

    /// A named signal, e.g. `run` or `flush`.
    Signal {
        atom: String,
        reply: oneshot::Sender<Result<()>>,
    },

    /// Writes a file relative to the filesystem root.
    Write {
        path: PathBuf,
        contents: Vec<u8>,
        reply: oneshot::Sender<Result<()>>,
    },

    /// Reads a file relative to the filesystem root.
    Read {
        path: PathBuf,
        reply: oneshot::Sender<Result<Vec<u8>>>,
    },

    /// Orderly shutdown, acknowledged by terminating.
    Shutdown,
}

/// A cheap, cloneable address of a running component.
#[derive(Debug, Clone)]
pub struct ComponentHandle {
    id: u64,
    tx: mpsc::Sender<ComponentMsg>,
    cancel: CancellationToken,
}

impl PartialEq for ComponentHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComponentHandle {}

impl ComponentHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub async fn send(&self, msg: ComponentMsg) -> Result<()> {
        self.tx
            .send(msg)
            .await
            .map_err(|_| Error::unspecified("component mailbox closed"))
    }

    /// Requests the status dictionary with a deadline. On timeout the
    /// remote is not interrupted; only this request fails.
    pub async fn status(&self, deadline: Duration) -> Result<Value> {
        let (reply, rx) = oneshot::channel();
        let request = async {
            self.send(ComponentMsg::Status { reply }).await?;
            rx.await
                .map_err(|_| Error::unspecified("component dropped the status request"))
        };
        match tokio::time::timeout(deadline, request).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout("status request timed out")),
        }
    }

    /// Delivers a named signal and awaits the acknowledgment.
    pub async fn signal(&self, atom: &str, deadline: Duration) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        let request = async {
            self.send(ComponentMsg::Signal {
                atom: atom.to_string(),
                reply,
            })
            .await?;
            rx.await
                .map_err(|_| Error::unspecified("component dropped the signal"))?
        };
        match tokio::time::timeout(deadline, request).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(format!("signal {atom} timed out"))),
        }
    }

    /// Writes a file through the filesystem component.
    pub async fn write_file(
        &self,
        path: impl Into<PathBuf>,
        contents: Vec<u8>,
        deadline: Duration,
    ) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        let request = async {
            self.send(ComponentMsg::Write {
                path: path.into(),
                contents,
                reply,
            })
            .await?;
            rx.await
                .map_err(|_| Error::unspecified("filesystem dropped the request"))?
        };
        match tokio::time::timeout(deadline, request).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout("file write timed out")),
        }
    }

    /// Reads a file through the filesystem component.
    pub async fn read_file(&self, path: impl Into<PathBuf>, deadline: Duration) -> Result<Vec<u8>> {
        let (reply, rx) = oneshot::channel();
        let request = async {
            self.send(ComponentMsg::Read {
                path: path.into(),
                reply,
            })
            .await?;
            rx.await
                .map_err(|_| Error::unspecified("filesystem dropped the request"))?
        };
        match tokio::time::timeout(deadline, request).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout("file read timed out")),
        }
    }

    /// Initiates an orderly shutdown. The component acknowledges by
    /// terminating, not by replying.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let _ = self.send(ComponentMsg::Shutdown).await;
    }
}

/// A freshly spawned component: its address plus the task to monitor.
#[derive(Debug)]
pub struct Spawned {
    pub handle: ComponentHandle,
    pub task: JoinHandle<()>,
}

/// Spawns a component task with a bounded mailbox. The run function gets
/// the mailbox and a cancellation token that trips on shutdown; errors it
/// returns are logged, not propagated.
pub fn spawn_component<F, Fut>(capacity: usize, run: F) -> Spawned
where
    F: FnOnce(Mailbox, CancellationToken) -> Fut,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity);
    let cancel = CancellationToken::new();
    let handle = ComponentHandle {
        id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
        tx,
        cancel: cancel.clone(),
    };
    let id = handle.id;
    let fut = run(rx, cancel);
    let task = tokio::spawn(async move {
        if let Err(e) = fut.await {
            warn!(component = id, error = %e, "component terminated with an error");
        }
    });
    Spawned { handle, task }
}
