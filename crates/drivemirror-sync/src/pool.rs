//! Work queue and worker pool
//!
//! Whole-tree traversal comes from a single shared queue: the scheduler
//! pushes the root node, each processed folder pushes its subfolders, and a
//! fixed set of workers drains whatever is queued.
//!
//! ## Backpressure
//!
//! The queue is unbounded and pushing never waits. Workers are both the
//! producers and the consumers of the queue, so a bounded queue that is full
//! while every worker is blocked pushing would deadlock the pool. Memory
//! grows with the number of folders awaiting processing instead.
//!
//! ```text
//! Scheduler ──push(root)──→ WorkQueue ←──push(child)── process_folder
//!                              │                            ↑
//!                              └───next()──→ worker × N ────┘
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use drivemirror_core::domain::MirrorNode;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::context::MirrorContext;
use crate::processor;

// ============================================================================
// WorkQueue
// ============================================================================

/// Unbounded multi-producer, multi-consumer queue of mirror nodes
///
/// Tracks two numbers: `depth`, the nodes waiting to be taken, and
/// `outstanding`, the nodes pushed but not yet fully processed. A pass has
/// drained when `outstanding` reaches zero.
#[derive(Debug, Clone)]
pub struct WorkQueue {
    tx: async_channel::Sender<MirrorNode>,
    rx: async_channel::Receiver<MirrorNode>,
    outstanding: Arc<AtomicUsize>,
    idle: Arc<Notify>,
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkQueue {
    pub fn new() -> Self {
        let (tx, rx) = async_channel::unbounded();
        Self {
            tx,
            rx,
            outstanding: Arc::new(AtomicUsize::new(0)),
            idle: Arc::new(Notify::new()),
        }
    }

    /// Enqueues `node` without waiting
    ///
    /// Returns false if the queue has been closed.
    pub fn push(&self, node: MirrorNode) -> bool {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        if self.tx.try_send(node).is_err() {
            self.finish_one();
            return false;
        }
        true
    }

    /// Takes the next node, waiting while the queue is empty
    ///
    /// Returns `None` once the queue is closed and empty. Every node
    /// returned must be acknowledged with [`complete`](Self::complete).
    pub async fn next(&self) -> Option<MirrorNode> {
        self.rx.recv().await.ok()
    }

    /// Marks one node returned by [`next`](Self::next) as processed
    pub fn complete(&self) {
        self.finish_one();
    }

    /// Stops accepting nodes; queued nodes can still be taken
    pub fn close(&self) {
        self.tx.close();
    }

    /// Nodes waiting to be taken
    pub fn depth(&self) -> usize {
        self.rx.len()
    }

    /// Nodes pushed and not yet completed
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    /// Waits until every pushed node has been completed
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if self.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn finish_one(&self) {
        if self.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

// ============================================================================
// WorkerPool
// ============================================================================

/// Fixed set of tasks processing nodes from a [`WorkQueue`]
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `workers` tasks on the current runtime
    ///
    /// Each worker checks for shutdown before taking a node and exits when
    /// shutdown is requested or the queue is closed. A failure while
    /// processing a node never ends the worker.
    pub fn spawn(workers: usize, ctx: MirrorContext, queue: WorkQueue) -> Self {
        let workers = workers.max(1);
        info!(workers, "Starting worker pool");

        let handles = (0..workers)
            .map(|worker| {
                let ctx = ctx.clone();
                let queue = queue.clone();
                tokio::spawn(run_worker(worker, ctx, queue))
            })
            .collect();

        Self { handles }
    }

    /// Number of workers
    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Workers that have not exited
    pub fn running(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    /// Waits for every worker to exit
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Worker task ended abnormally");
            }
        }
        info!("Worker pool stopped");
    }
}

async fn run_worker(worker: usize, ctx: MirrorContext, queue: WorkQueue) {
    debug!(worker, "Worker started");
    loop {
        let node = tokio::select! {
            biased;
            _ = ctx.shutdown().cancelled() => break,
            node = queue.next() => match node {
                Some(node) => node,
                None => break,
            },
        };

        processor::process_folder(&ctx, &queue, node).await;
        queue.complete();
    }
    debug!(worker, "Worker stopped");
}
