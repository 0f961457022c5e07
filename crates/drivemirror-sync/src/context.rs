//! Shared state handed to every worker

use std::sync::Arc;

use drivemirror_core::ports::{SharedStore, TransportHandle};
use tokio_util::sync::CancellationToken;

use crate::stats::MirrorStats;

/// What a worker needs besides the node it is processing
///
/// Cheap to clone. The remote store is read through the transport handle
/// on every use so a rotated credential takes effect on the next call.
#[derive(Debug, Clone)]
pub struct MirrorContext {
    transport: TransportHandle,
    stats: Arc<MirrorStats>,
    shutdown: CancellationToken,
}

impl MirrorContext {
    pub fn new(
        transport: TransportHandle,
        stats: Arc<MirrorStats>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            transport,
            stats,
            shutdown,
        }
    }

    /// The remote store active right now
    pub fn store(&self) -> SharedStore {
        self.transport.current()
    }

    pub fn stats(&self) -> &MirrorStats {
        &self.stats
    }

    pub fn shutdown(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Returns true once shutdown has been requested
    pub fn is_cancelled(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
