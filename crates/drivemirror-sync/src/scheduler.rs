//! Mirror scheduler - seeds the work queue with the root node
//!
//! Every `interval` the [`MirrorScheduler`] pushes the root [`MirrorNode`]
//! onto the shared [`WorkQueue`], whether or not the previous pass has
//! drained. Overlapping passes over the same tree are tolerated by the
//! engine; at worst they create a duplicate remote entry.
//!
//! ```text
//! tick ──→ push(root) ──→ WorkQueue ──→ WorkerPool
//!  ↑                                       │
//!  └──────────── interval ─────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use drivemirror_core::domain::MirrorNode;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::pool::WorkQueue;
use crate::stats::MirrorStats;

/// Periodically starts a pass over the whole tree
pub struct MirrorScheduler {
    root: MirrorNode,
    queue: WorkQueue,
    interval: Duration,
    stats: Arc<MirrorStats>,
    shutdown: CancellationToken,
}

impl MirrorScheduler {
    /// Creates a scheduler
    ///
    /// # Arguments
    /// * `root` - Node binding the source root to the destination folder
    /// * `queue` - Queue drained by the worker pool
    /// * `interval` - Time between pass starts
    /// * `stats` - Counters logged at each pass start
    /// * `shutdown` - Stops the scheduler when cancelled
    pub fn new(
        root: MirrorNode,
        queue: WorkQueue,
        interval: Duration,
        stats: Arc<MirrorStats>,
        shutdown: CancellationToken,
    ) -> Self {
        info!(
            root = %root.local_path().display(),
            interval_secs = interval.as_secs(),
            "Creating mirror scheduler"
        );
        Self {
            root,
            queue,
            interval,
            stats,
            shutdown,
        }
    }

    /// Seeds a pass immediately, then every interval, until shutdown
    pub async fn run(&self) {
        info!("Mirror scheduler starting");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut pass: u64 = 0;

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            pass += 1;
            if !self.seed(pass) {
                break;
            }
        }

        info!(passes = pass, "Mirror scheduler stopped");
    }

    /// Seeds one pass and waits for it to drain
    ///
    /// Returns early if shutdown is requested.
    pub async fn run_once(&self) {
        if !self.seed(1) {
            return;
        }
        tokio::select! {
            _ = self.shutdown.cancelled() => {
                info!("Shutdown requested before pass completed");
            }
            _ = self.queue.wait_idle() => {
                info!(stats = %self.stats.snapshot(), "Pass complete");
            }
        }
    }

    fn seed(&self, pass: u64) -> bool {
        let outstanding = self.queue.outstanding();
        if outstanding > 0 {
            info!(pass, outstanding, "Previous pass still running, starting another");
        }
        info!(
            pass,
            queued = self.queue.depth(),
            stats = %self.stats.snapshot(),
            "Starting mirror pass"
        );

        if !self.queue.push(self.root.clone()) {
            warn!(pass, "Work queue closed, cannot start pass");
            return false;
        }
        true
    }
}
