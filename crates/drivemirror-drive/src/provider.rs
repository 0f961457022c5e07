//! DriveRemoteStore - RemoteStore implementation for Google Drive
//!
//! Wraps a [`DriveClient`] and delegates to the [`files`] module to fulfil
//! the [`RemoteStore`] port contract.
//!
//! ## Design Notes
//!
//! - No interior mutability: a store carries one access token for its whole
//!   life. Credential renewal builds a new store and publishes it through
//!   the transport holder, so in-flight calls finish on the old token.
//! - Files with content go through a resumable upload; zero-length files
//!   and folders are metadata-only creates.

use anyhow::Result;
use tracing::debug;

use drivemirror_core::domain::{EntryKind, RemoteEntry, RemoteId};
use drivemirror_core::ports::{ChildQuery, FileContent, NewEntry, RemotePage, RemoteStore};

use crate::client::DriveClient;
use crate::files;

/// Remote store backed by the Google Drive v3 API
#[derive(Debug, Clone)]
pub struct DriveRemoteStore {
    client: DriveClient,
}

impl DriveRemoteStore {
    /// Creates a store using `client` for every call
    pub fn new(client: DriveClient) -> Self {
        Self { client }
    }

    /// The underlying client
    pub fn client(&self) -> &DriveClient {
        &self.client
    }
}

#[async_trait::async_trait]
impl RemoteStore for DriveRemoteStore {
    async fn list(
        &self,
        query: &ChildQuery,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<RemotePage> {
        files::list_children(&self.client, query, page_size, page_token).await
    }

    async fn create(&self, entry: NewEntry, content: Option<FileContent>) -> Result<RemoteEntry> {
        debug!(
            name = %entry.name,
            parent = %entry.parent,
            kind = ?entry.kind,
            "DriveRemoteStore::create"
        );
        match (entry.kind, content) {
            (EntryKind::Folder, _) => {
                files::create_folder(&self.client, &entry.name, &entry.parent).await
            }
            (EntryKind::File, Some(content)) if content.len > 0 => {
                files::upload_file(&self.client, &entry.name, &entry.parent, content).await
            }
            (EntryKind::File, _) => {
                files::create_empty_file(&self.client, &entry.name, &entry.parent).await
            }
        }
    }

    async fn delete(&self, id: &RemoteId) -> Result<()> {
        debug!(%id, "DriveRemoteStore::delete");
        files::delete_file(&self.client, id).await
    }
}
