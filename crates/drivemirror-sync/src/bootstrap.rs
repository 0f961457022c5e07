//! Startup checks
//!
//! Resolves the root [`MirrorNode`] before any pass is scheduled. Both
//! failures here are fatal: without a readable source directory or a
//! destination folder there is nothing to mirror.

use std::path::Path;

use drivemirror_core::domain::{EntryKind, MirrorNode, RemoteId};
use drivemirror_core::ports::{NewEntry, RemoteStore};
use tracing::info;

use crate::lookup;
use crate::MirrorError;

/// Validates `source` and finds or creates `destination` under the remote root
///
/// # Errors
/// - [`MirrorError::SourceUnavailable`] if `source` cannot be read
/// - [`MirrorError::SourceNotDirectory`] if `source` is not a directory
/// - [`MirrorError::DestinationUnavailable`] if the destination folder
///   cannot be looked up or created
pub async fn bootstrap(
    store: &dyn RemoteStore,
    source: &Path,
    destination: &str,
) -> Result<MirrorNode, MirrorError> {
    check_source(source).await?;
    let folder_id = resolve_destination(store, destination).await?;

    info!(
        source = %source.display(),
        destination,
        id = %folder_id,
        "Mirror root resolved"
    );
    Ok(MirrorNode::new(source, folder_id))
}

async fn check_source(source: &Path) -> Result<(), MirrorError> {
    let unavailable = |e: std::io::Error| MirrorError::SourceUnavailable {
        path: source.to_path_buf(),
        source: e,
    };

    let metadata = tokio::fs::metadata(source).await.map_err(unavailable)?;
    if !metadata.is_dir() {
        return Err(MirrorError::SourceNotDirectory(source.to_path_buf()));
    }

    let mut entries = tokio::fs::read_dir(source).await.map_err(unavailable)?;
    let mut count = 0usize;
    while entries.next_entry().await.map_err(unavailable)?.is_some() {
        count += 1;
    }
    info!(source = %source.display(), entries = count, "Source folder ready");
    Ok(())
}

/// Finds the folder named `name` directly under the remote root, creating it if absent
pub async fn resolve_destination(store: &dyn RemoteStore, name: &str) -> Result<RemoteId, MirrorError> {
    let unavailable = |e: anyhow::Error| MirrorError::DestinationUnavailable {
        name: name.to_string(),
        reason: format!("{e:#}"),
    };

    let root = RemoteId::root();
    if let Some(existing) = lookup::find(store, &root, name, EntryKind::Folder)
        .await
        .map_err(unavailable)?
    {
        info!(name, id = %existing.id, "Using existing destination folder");
        return Ok(existing.id);
    }

    let created = store
        .create(NewEntry::folder(name, root), None)
        .await
        .map_err(unavailable)?;
    info!(name, id = %created.id, "Created destination folder");
    Ok(created.id)
}
