//! File reconciler
//!
//! Brings one remote file in line with its local counterpart. Size is the
//! only change signal:
//!
//! | remote file | same size | action |
//! |---|---|---|
//! | absent | - | upload |
//! | present | yes | nothing |
//! | present | no | delete, then upload |
//!
//! A remote file whose size is unknown is treated as a size mismatch.

use anyhow::{Context, Result};
use drivemirror_core::domain::{EntryKind, LocalEntry, MirrorNode, RemoteEntry};
use drivemirror_core::ports::{FileContent, NewEntry, RemoteStore};
use tracing::{debug, info, warn};

use crate::context::MirrorContext;
use crate::lookup;

/// What reconciling one file did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// No remote file existed; it was uploaded
    Uploaded,
    /// The remote file had a different size; it was deleted and re-uploaded
    Replaced,
    /// The remote file already matched
    Unchanged,
    /// A remote call or the local read failed; retried next pass
    Failed,
}

/// Reconciles `file`, a direct child of `node`'s directory
///
/// Failures are logged and counted; they never propagate.
pub async fn reconcile_file(ctx: &MirrorContext, node: &MirrorNode, file: &LocalEntry) -> FileOutcome {
    let store = ctx.store();
    let path = node.entry_path(&file.name);

    let remote = match lookup::find(
        store.as_ref(),
        node.remote_folder_id(),
        &file.name,
        EntryKind::File,
    )
    .await
    {
        Ok(remote) => remote,
        Err(e) => {
            warn!(path = %path.display(), error = %format!("{e:#}"), "File lookup failed");
            ctx.stats().record_error();
            return FileOutcome::Failed;
        }
    };

    let outcome = match remote {
        Some(existing) if existing.size_matches(file.size) => {
            debug!(path = %path.display(), size = file.size, "Remote file up to date");
            return FileOutcome::Unchanged;
        }
        Some(stale) => {
            info!(
                path = %path.display(),
                local_size = file.size,
                remote_size = ?stale.size,
                "Size changed, replacing remote file"
            );
            if let Err(e) = store.delete(&stale.id).await {
                warn!(path = %path.display(), error = %format!("{e:#}"), "Delete of stale remote file failed");
                ctx.stats().record_error();
                return FileOutcome::Failed;
            }
            FileOutcome::Replaced
        }
        None => FileOutcome::Uploaded,
    };

    match upload(store.as_ref(), node, file).await {
        Ok(created) => {
            info!(path = %path.display(), id = %created.id, size = file.size, "Uploaded file");
            match outcome {
                FileOutcome::Replaced => ctx.stats().record_file_replaced(),
                _ => ctx.stats().record_file_uploaded(),
            }
            outcome
        }
        Err(e) => {
            warn!(path = %path.display(), error = %format!("{e:#}"), "Upload failed, retrying next pass");
            ctx.stats().record_error();
            FileOutcome::Failed
        }
    }
}

async fn upload(store: &dyn RemoteStore, node: &MirrorNode, file: &LocalEntry) -> Result<RemoteEntry> {
    let path = node.entry_path(&file.name);
    let content = FileContent::open(&path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;

    if content.len != file.size {
        debug!(
            path = %path.display(),
            listed = file.size,
            actual = content.len,
            "File changed size since listing"
        );
    }

    store
        .create(
            NewEntry::file(file.name.clone(), node.remote_folder_id().clone()),
            Some(content),
        )
        .await
}
