//! Local directory listing
//!
//! Produces the two views the folder processor needs from one `read_dir`:
//! the entries to mirror, and the set of every name present locally. The
//! sweeper keeps a remote child when a local entry has the same name and
//! kind, or when the name is present but its kind could not be read.
//!
//! Symlinks are followed for files. A symlink to a directory is reported
//! present but not descended into, which keeps link cycles out of the queue.

use std::collections::HashSet;
use std::io;
use std::path::Path;

use drivemirror_core::domain::{EntryKind, LocalEntry};
use tracing::{debug, warn};

/// Names that are never created or reconciled on the remote
///
/// Volume metadata, recycle bins and partial-download markers.
pub const DENYLIST: &[&str] = &["$RECYCLE.BIN", ".tmp.drivedownload", "System Volume Information"];

/// Returns true if `name` is reserved and must not be mirrored
pub fn is_denylisted(name: &str) -> bool {
    DENYLIST.contains(&name)
}

/// Result of listing one local directory
#[derive(Debug, Default)]
pub struct LocalListing {
    /// Entries whose type and size could be read, sorted by name
    pub entries: Vec<LocalEntry>,
    /// Every name present in the directory
    pub names: HashSet<String>,
}

impl LocalListing {
    /// Returns true if a remote child `name` of `kind` still has a local counterpart
    ///
    /// A local entry of the other kind does not count. A name whose kind is
    /// unknown (dangling link, directory link, special file) keeps any kind.
    pub fn has_counterpart(&self, name: &str, kind: EntryKind) -> bool {
        match self
            .entries
            .binary_search_by(|entry| entry.name.as_str().cmp(name))
        {
            Ok(i) => self.entries[i].kind == kind,
            Err(_) => self.names.contains(name),
        }
    }
}

/// Lists the direct children of `dir`
///
/// # Errors
/// Fails only if the directory itself cannot be opened or iterated; the
/// caller must then treat the listing as unavailable, not as empty.
pub async fn list_dir(dir: &Path) -> io::Result<LocalListing> {
    let mut listing = LocalListing::default();
    let mut read_dir = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = read_dir.next_entry().await? {
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                warn!(dir = %dir.display(), name = ?raw, "Skipping entry with non UTF-8 name");
                continue;
            }
        };
        listing.names.insert(name.clone());

        let file_type = match entry.file_type().await {
            Ok(t) => t,
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "Cannot read entry type");
                continue;
            }
        };

        if file_type.is_dir() {
            listing.entries.push(LocalEntry::folder(name));
            continue;
        }

        // Follows symlinks
        let metadata = match tokio::fs::metadata(entry.path()).await {
            Ok(m) => m,
            Err(e) => {
                warn!(path = %entry.path().display(), error = %e, "Cannot read entry metadata");
                continue;
            }
        };

        if metadata.is_dir() {
            debug!(path = %entry.path().display(), "Not following directory symlink");
        } else if metadata.is_file() {
            listing.entries.push(LocalEntry::file(name, metadata.len()));
        } else {
            debug!(path = %entry.path().display(), "Skipping special file");
        }
    }

    listing.entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(listing)
}
