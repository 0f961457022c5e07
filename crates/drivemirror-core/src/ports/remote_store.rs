//! Remote store port (driven/secondary port)
//!
//! The reconciliation engine talks to remote storage only through this
//! trait: list children by query, create with metadata and optional
//! content, delete by id.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are adapter-specific
//!   and the engine only logs them.
//! - Uses `#[async_trait]` for async trait methods.
//! - Listing is paginated; callers decide whether to follow `next_page_token`.

use tokio::fs::File;

use crate::domain::{EntryKind, RemoteEntry, RemoteId};

/// Filter for listing the children of one remote folder
///
/// Trashed entries are always excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildQuery {
    /// Folder whose direct children are listed
    pub parent: RemoteId,
    /// Exact name match, if set
    pub name: Option<String>,
    /// Folder / non-folder filter, if set
    pub kind: Option<EntryKind>,
}

impl ChildQuery {
    /// All non-trashed children of `parent`
    pub fn children_of(parent: RemoteId) -> Self {
        Self {
            parent,
            name: None,
            kind: None,
        }
    }

    /// Children of `parent` named exactly `name` and of the given kind
    pub fn named(parent: RemoteId, name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            parent,
            name: Some(name.into()),
            kind: Some(kind),
        }
    }

    /// Returns true if `entry` satisfies the name and kind filters
    pub fn matches(&self, entry: &RemoteEntry) -> bool {
        self.name.as_deref().map_or(true, |n| n == entry.name)
            && self.kind.map_or(true, |k| k == entry.kind)
    }
}

/// One page of a child listing
#[derive(Debug, Clone, Default)]
pub struct RemotePage {
    /// Entries on this page
    pub entries: Vec<RemoteEntry>,
    /// Token for the next page (None on the last page)
    pub next_page_token: Option<String>,
}

/// Metadata for an entry to be created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    /// Name of the new entry
    pub name: String,
    /// Parent folder
    pub parent: RemoteId,
    /// Folder or file
    pub kind: EntryKind,
}

impl NewEntry {
    /// A folder named `name` inside `parent`
    pub fn folder(name: impl Into<String>, parent: RemoteId) -> Self {
        Self {
            name: name.into(),
            parent,
            kind: EntryKind::Folder,
        }
    }

    /// A file named `name` inside `parent`
    pub fn file(name: impl Into<String>, parent: RemoteId) -> Self {
        Self {
            name: name.into(),
            parent,
            kind: EntryKind::File,
        }
    }
}

/// Local file content streamed to the remote store on creation
#[derive(Debug)]
pub struct FileContent {
    /// Open handle positioned at the start of the file
    pub file: File,
    /// Number of bytes that will be sent
    pub len: u64,
}

impl FileContent {
    /// Opens `path` for upload, capturing its current length
    pub async fn open(path: &std::path::Path) -> std::io::Result<Self> {
        let file = File::open(path).await?;
        let len = file.metadata().await?.len();
        Ok(Self { file, len })
    }
}

/// Port trait for hierarchical remote storage
///
/// ## Implementation Notes
///
/// - Implementations apply their own per-request timeouts and transient
///   retry; anything returned as `Err` is treated by the engine as a
///   recoverable per-entry failure.
/// - `delete` removes a folder together with its whole remote subtree.
#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    /// Lists one page of non-trashed children matching `query`
    ///
    /// # Arguments
    /// * `query` - Parent and optional name/kind filters
    /// * `page_size` - Maximum entries on the returned page
    /// * `page_token` - Continuation token from a previous page
    async fn list(
        &self,
        query: &ChildQuery,
        page_size: u32,
        page_token: Option<&str>,
    ) -> anyhow::Result<RemotePage>;

    /// Creates an entry, uploading `content` for files
    ///
    /// # Returns
    /// The created entry as reported by the remote
    async fn create(
        &self,
        entry: NewEntry,
        content: Option<FileContent>,
    ) -> anyhow::Result<RemoteEntry>;

    /// Deletes an entry (and, for folders, its remote subtree)
    async fn delete(&self, id: &RemoteId) -> anyhow::Result<()>;
}
