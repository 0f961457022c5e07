//! Swappable transport holder
//!
//! Every worker receives a [`TransportHandle`] at construction time and
//! reads the active [`RemoteStore`] through [`TransportHandle::current`]
//! on each use. The credential manager owns the [`TransportSwap`] and
//! replaces the store when the access token rotates; all handles observe
//! the new value on their next read.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use super::remote_store::RemoteStore;

/// Shared reference to a remote store
pub type SharedStore = Arc<dyn RemoteStore>;

/// Creates a holder seeded with `initial`
pub fn transport(initial: SharedStore) -> (TransportSwap, TransportHandle) {
    let (tx, rx) = watch::channel(initial);
    (TransportSwap { tx }, TransportHandle { rx })
}

/// Read side of the holder; cheap to clone
#[derive(Clone)]
pub struct TransportHandle {
    rx: watch::Receiver<SharedStore>,
}

impl TransportHandle {
    /// Returns the store that is active right now
    pub fn current(&self) -> SharedStore {
        self.rx.borrow().clone()
    }
}

impl fmt::Debug for TransportHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportHandle").finish_non_exhaustive()
    }
}

/// Write side of the holder, owned by the credential manager
pub struct TransportSwap {
    tx: watch::Sender<SharedStore>,
}

impl TransportSwap {
    /// Atomically replaces the active store
    pub fn replace(&self, store: SharedStore) {
        self.tx.send_replace(store);
        debug!("Remote transport replaced");
    }

    /// Returns a new read handle
    pub fn handle(&self) -> TransportHandle {
        TransportHandle {
            rx: self.tx.subscribe(),
        }
    }
}

impl fmt::Debug for TransportSwap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportSwap")
            .field("handles", &self.tx.receiver_count())
            .finish()
    }
}
