//! Folder processor
//!
//! Handles one [`MirrorNode`] in three ordered steps:
//!
//! 1. **Scanning** - list the local directory. If that fails the node is
//!    dropped without sweeping: an unavailable listing is not an empty one.
//! 2. **Dispatching** - skip reserved names, materialize each subfolder and
//!    push its node onto the queue, reconcile each file inline.
//! 3. **Sweeping** - delete remote children with no local counterpart of
//!    the same name and kind, reserved names included.
//!
//! Nothing is returned; every failure is logged where it happens.

use drivemirror_core::domain::{EntryKind, MirrorNode};
use tracing::{debug, warn};

use crate::context::MirrorContext;
use crate::local;
use crate::materializer;
use crate::pool::WorkQueue;
use crate::reconciler;
use crate::sweeper;

/// Processes one folder node
#[tracing::instrument(skip_all, fields(path = %node.local_path().display()))]
pub async fn process_folder(ctx: &MirrorContext, queue: &WorkQueue, node: MirrorNode) {
    // Scanning
    let listing = match local::list_dir(node.local_path()).await {
        Ok(listing) => listing,
        Err(e) => {
            warn!(error = %e, "Cannot list local folder, skipping without sweep");
            ctx.stats().record_error();
            return;
        }
    };
    ctx.stats().record_folder_scanned();
    debug!(entries = listing.entries.len(), "Scanned local folder");

    // Dispatching
    for entry in &listing.entries {
        if ctx.is_cancelled() {
            debug!("Shutdown requested, abandoning folder");
            return;
        }
        if local::is_denylisted(&entry.name) {
            debug!(name = %entry.name, "Skipping reserved name");
            continue;
        }

        match entry.kind {
            EntryKind::Folder => {
                if let Some(child) = materializer::ensure_child_folder(ctx, &node, &entry.name).await {
                    if !queue.push(child) {
                        debug!(name = %entry.name, "Queue closed, subfolder not scheduled");
                    }
                }
            }
            EntryKind::File => {
                reconciler::reconcile_file(ctx, &node, entry).await;
            }
        }
    }

    // Sweeping
    sweeper::sweep(ctx, &node, &listing).await;
}
