//! Remote and local entry descriptors
//!
//! Entries are matched across the two sides purely by exact, case-sensitive
//! name plus [`EntryKind`]. Only size is compared for files.

use serde::{Deserialize, Serialize};

use super::newtypes::RemoteId;

/// Whether an entry is a folder or anything else
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A directory / remote folder
    Folder,
    /// Any non-folder entry
    File,
}

/// A child of a remote folder, as reported by the remote store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Remote identifier
    pub id: RemoteId,
    /// Display name (exact, case-sensitive)
    pub name: String,
    /// Folder or file
    pub kind: EntryKind,
    /// Size in bytes; `None` for folders and for remote-native documents
    pub size: Option<u64>,
}

impl RemoteEntry {
    /// Returns true if this is a file whose size equals `local_size`
    ///
    /// An unknown remote size never matches.
    pub fn size_matches(&self, local_size: u64) -> bool {
        self.size == Some(local_size)
    }
}

/// One entry of a local directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEntry {
    /// File name within the parent directory
    pub name: String,
    /// Folder or file
    pub kind: EntryKind,
    /// Size in bytes (0 for directories)
    pub size: u64,
}

impl LocalEntry {
    /// Creates a file entry
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::File,
            size,
        }
    }

    /// Creates a directory entry
    pub fn folder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntryKind::Folder,
            size: 0,
        }
    }
}
