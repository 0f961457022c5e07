//! Drive `files` resource operations
//!
//! - [`list_children`] - one page of `files.list` for a [`ChildQuery`]
//! - [`create_folder`] / [`create_empty_file`] - metadata-only `files.create`
//! - [`upload_file`] - resumable upload: open a session, then stream the content
//! - [`delete_file`] - permanent deletion (a folder takes its subtree with it)
//!
//! ## API References
//!
//! - [files.list](https://developers.google.com/drive/api/reference/rest/v3/files/list)
//! - [Resumable upload](https://developers.google.com/drive/api/guides/manage-uploads#resumable)

use anyhow::{Context, Result};
use drivemirror_core::domain::{EntryKind, RemoteEntry, RemoteId};
use drivemirror_core::ports::{ChildQuery, FileContent, RemotePage};
use reqwest::{header, Body, Method};
use serde::Deserialize;
use serde_json::json;
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::client::DriveClient;
use crate::query::{self, FOLDER_MIME_TYPE};
use crate::DriveError;

/// Partial-response selector for a single file
const FILE_FIELDS: &str = "id, name, mimeType, size";

/// Partial-response selector for a listing
const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType, size)";

// ============================================================================
// Drive API response types
// ============================================================================

/// A Drive `File` resource, restricted to [`FILE_FIELDS`]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
    mime_type: Option<String>,
    /// int64 values are transported as JSON strings
    size: Option<String>,
}

/// Response of `files.list`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

impl TryFrom<DriveFile> for RemoteEntry {
    type Error = anyhow::Error;

    fn try_from(file: DriveFile) -> Result<Self> {
        let kind = if file.mime_type.as_deref() == Some(FOLDER_MIME_TYPE) {
            EntryKind::Folder
        } else {
            EntryKind::File
        };
        let size = file.size.as_deref().and_then(|s| s.parse::<u64>().ok());
        let id = RemoteId::new(file.id).context("Drive returned an unusable file id")?;

        Ok(RemoteEntry {
            id,
            name: file.name,
            kind,
            size,
        })
    }
}

// ============================================================================
// Listing
// ============================================================================

/// Lists one page of non-trashed children matching `query`
///
/// # Arguments
/// * `page_size` - Drive accepts 1..=1000
/// * `page_token` - `nextPageToken` from the previous page
pub async fn list_children(
    client: &DriveClient,
    query: &ChildQuery,
    page_size: u32,
    page_token: Option<&str>,
) -> Result<RemotePage> {
    let q = query::render(query);
    let page_size = page_size.clamp(1, 1000).to_string();
    debug!(q = %q, page_token, "Listing Drive children");

    let list: DriveFileList = client
        .execute("files.list", || {
            let mut params = vec![
                ("q", q.as_str()),
                ("pageSize", page_size.as_str()),
                ("fields", LIST_FIELDS),
                ("orderBy", "folder,name"),
            ];
            if let Some(token) = page_token {
                params.push(("pageToken", token));
            }
            client.request(Method::GET, "/files").query(&params)
        })
        .await?
        .json()
        .await
        .context("Failed to parse files.list response")?;

    let entries = list
        .files
        .into_iter()
        .map(RemoteEntry::try_from)
        .collect::<Result<Vec<_>>>()?;

    Ok(RemotePage {
        entries,
        next_page_token: list.next_page_token.filter(|t| !t.is_empty()),
    })
}

// ============================================================================
// Creation
// ============================================================================

/// Creates a folder named `name` inside `parent`
pub async fn create_folder(
    client: &DriveClient,
    name: &str,
    parent: &RemoteId,
) -> Result<RemoteEntry> {
    let body = json!({
        "name": name,
        "mimeType": FOLDER_MIME_TYPE,
        "parents": [parent.as_str()],
    });
    create_metadata_only(client, &body).await
}

/// Creates a zero-length file named `name` inside `parent`
pub async fn create_empty_file(
    client: &DriveClient,
    name: &str,
    parent: &RemoteId,
) -> Result<RemoteEntry> {
    let body = json!({
        "name": name,
        "parents": [parent.as_str()],
    });
    create_metadata_only(client, &body).await
}

async fn create_metadata_only(client: &DriveClient, body: &serde_json::Value) -> Result<RemoteEntry> {
    let file: DriveFile = client
        .execute("files.create", || {
            client
                .request(Method::POST, "/files")
                .query(&[("fields", FILE_FIELDS)])
                .json(body)
        })
        .await?
        .json()
        .await
        .context("Failed to parse files.create response")?;

    debug!(id = %file.id, name = %file.name, "Created Drive entry");
    RemoteEntry::try_from(file)
}

/// Uploads `content` as a new file named `name` inside `parent`
///
/// Uses a resumable session: a retried POST carrying the metadata returns
/// the session URI in `Location`; the content is then streamed in a single
/// PUT bounded by a size-scaled timeout. The PUT is not retried because its
/// body is consumed.
pub async fn upload_file(
    client: &DriveClient,
    name: &str,
    parent: &RemoteId,
    content: FileContent,
) -> Result<RemoteEntry> {
    let metadata = json!({
        "name": name,
        "parents": [parent.as_str()],
    });
    let len = content.len;

    let session = client
        .execute("files.create (resumable session)", || {
            client
                .upload_request(Method::POST, "/files")
                .query(&[("uploadType", "resumable"), ("fields", FILE_FIELDS)])
                .header("X-Upload-Content-Length", len)
                .json(&metadata)
        })
        .await?;

    let session_uri = session
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| DriveError::InvalidResponse("upload session without Location".into()))?;

    debug!(name, len, "Streaming file content to upload session");

    let body = Body::wrap_stream(ReaderStream::new(content.file));
    let file: DriveFile = client
        .execute_once(
            "upload content",
            client
                .content_request(Method::PUT, &session_uri, len)
                .header(header::CONTENT_LENGTH, len)
                .body(body),
        )
        .await?
        .json()
        .await
        .context("Failed to parse upload response")?;

    debug!(id = %file.id, name = %file.name, len, "Upload complete");
    RemoteEntry::try_from(file)
}

// ============================================================================
// Deletion
// ============================================================================

/// Permanently deletes an entry
///
/// A 404 means the entry is already gone (for instance removed by an
/// overlapping pass) and counts as success.
pub async fn delete_file(client: &DriveClient, id: &RemoteId) -> Result<()> {
    let path = format!("/files/{}", id.as_str());
    let result = client
        .execute("files.delete", || client.request(Method::DELETE, &path))
        .await;

    match result {
        Ok(_) => {
            debug!(%id, "Deleted Drive entry");
            Ok(())
        }
        Err(e) if matches!(e.downcast_ref::<DriveError>(), Some(DriveError::NotFound(_))) => {
            debug!(%id, "Drive entry already deleted");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
