//! Concurrent metadata enrichment of directory entries.
//!
//! A container listing only carries names, sizes and content types. Anything that needs
//! object headers (segment manifests, link targets, user metadata) needs one `HEAD` request
//! per object. The [`Lister`] overlaps those requests: a fixed pool of workers drains a
//! bounded FIFO queue, so a directory with `N` entries costs about `ceil(N / concurrency)`
//! sequential round trips instead of `N`.
//!
//! Each task carries one placeholder [`Node`] and a one-shot sender. The worker
//! that picks the task up fetches the metadata, rewrites the node, and sends it back. Results
//! arrive in completion order; callers correlate them through their own receivers.
//!
//! Enrichment is best-effort. A failed request is logged and the node is sent back with
//! whatever metadata it already had.
//
// TODO: decide whether fetch failures should reach the caller instead of being logged
// and dropped; the filesystem layer currently cannot tell stale metadata from fresh.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{Mutex, mpsc, mpsc::error::TrySendError, oneshot};
use tracing::{debug, warn};

use crate::node::{Node, is_segment_manifest};
use crate::store::ObjectStore;

/// Errors from [`Lister`] lifecycle misuse.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListerError {
    /// A task was submitted before [`Lister::start`].
    #[error("lister has not been started")]
    NotStarted,

    /// [`Lister::start`] was called on a running lister.
    #[error("lister is already running")]
    AlreadyStarted,

    /// The worker pool is gone, so queued tasks would never run.
    #[error("lister workers have stopped")]
    Stopped,

    /// A pool of zero workers would never process anything.
    #[error("lister concurrency must be at least 1")]
    InvalidConcurrency,
}

/// One unit of lister work: a node to enrich and where to send it once done.
#[derive(Debug)]
pub(crate) struct ListerTask {
    node: Node,
    result: oneshot::Sender<Node>,
}

/// Fixed-size worker pool that fills placeholder nodes with remote metadata.
pub struct Lister<S: ObjectStore> {
    store: S,
    concurrency: usize,
    /// Present once started. Workers exit when every sender is gone and the queue is empty,
    /// so dropping the lister lets queued tasks finish.
    sender: Option<mpsc::Sender<ListerTask>>,
}

impl<S: ObjectStore> Lister<S> {
    /// Creates a stopped lister that will run `concurrency` workers against `store`.
    pub fn new(store: S, concurrency: usize) -> Self {
        Self {
            store,
            concurrency,
            sender: None,
        }
    }

    /// Allocates the task queue and spawns the workers.
    ///
    /// Must be called from within a tokio runtime. The workers live until the lister is
    /// dropped and the queue has drained.
    pub fn start(&mut self) -> Result<(), ListerError> {
        if self.sender.is_some() {
            return Err(ListerError::AlreadyStarted);
        }
        if self.concurrency == 0 {
            return Err(ListerError::InvalidConcurrency);
        }

        let (tx, rx) = mpsc::channel(self.concurrency);
        let queue = Arc::new(Mutex::new(rx));
        for worker in 0..self.concurrency {
            tokio::spawn(process_tasks(
                worker,
                self.store.clone(),
                Arc::clone(&queue),
            ));
        }
        self.sender = Some(tx);

        debug!(concurrency = self.concurrency, "lister started");
        Ok(())
    }

    /// Returns `true` once [`start`](Self::start) succeeded.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.sender.is_some()
    }

    /// Number of workers this lister runs.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Queues `node` for enrichment; the enriched node is sent on `result`.
    ///
    /// Returns immediately. If the queue is full, a helper task is spawned to wait for room,
    /// so the caller never blocks but tasks submitted concurrently may be queued in any
    /// order. Nothing bounds the number of such helpers.
    ///
    /// On error the task is dropped, which closes `result`.
    pub fn add_task(&self, node: Node, result: oneshot::Sender<Node>) -> Result<(), ListerError> {
        let sender = self.sender.as_ref().ok_or(ListerError::NotStarted)?;
        match sender.try_send(ListerTask { node, result }) {
            Ok(()) => Ok(()),
            Err(TrySendError::Closed(_)) => Err(ListerError::Stopped),
            Err(TrySendError::Full(task)) => {
                let sender = sender.clone();
                tokio::spawn(async move {
                    let _ = sender.send(task).await;
                });
                Ok(())
            }
        }
    }
}

async fn process_tasks<S: ObjectStore>(
    worker: usize,
    store: S,
    queue: Arc<Mutex<mpsc::Receiver<ListerTask>>>,
) {
    loop {
        // Only the receive happens under the lock, so workers take turns at the head of the
        // queue but fetch concurrently.
        let Some(task) = queue.lock().await.recv().await else {
            break;
        };
        let node = enrich(&store, task.node).await;
        if task.result.send(node).is_err() {
            debug!(worker, "lister result dropped, receiver is gone");
        }
    }
    debug!(worker, "lister worker stopped");
}

/// Fetches metadata for `node` and writes it back into the node.
async fn enrich<S: ObjectStore>(store: &S, mut node: Node) -> Node {
    let fetched = store
        .fetch_metadata(node.container(), node.object_name())
        .await;
    let (descriptor, headers) = match fetched {
        Ok(metadata) => metadata,
        Err(err) => {
            warn!(
                container = node.container(),
                object = node.object_name(),
                %err,
                "metadata fetch failed, keeping listing metadata"
            );
            return node;
        }
    };

    match &mut node {
        Node::Object(object) => {
            object.segmented = is_segment_manifest(&headers);
            object.headers = headers;
            object.descriptor = descriptor;
        }
        Node::Directory(directory) => {
            directory.headers = headers;
            directory.descriptor = descriptor;
        }
        Node::Symlink(symlink) => {
            symlink.headers = headers;
            symlink.descriptor = descriptor;
        }
    }
    node
}
