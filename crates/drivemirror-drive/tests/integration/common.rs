//! Shared test helpers for Drive API integration tests
//!
//! Each helper mounts the endpoints a test needs on a wiremock server and
//! returns a client or store pointing at it.

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use drivemirror_core::domain::RemoteId;
use drivemirror_drive::client::DriveClient;
use drivemirror_drive::provider::DriveRemoteStore;

pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// Starts a mock server and returns a store pointing at it
///
/// Retries are limited to one so failure tests stay fast.
pub async fn setup_drive_mock() -> (MockServer, DriveRemoteStore) {
    let server = MockServer::start().await;
    let client = DriveClient::builder("test-access-token")
        .base_url(server.uri())
        .max_retries(1)
        .build()
        .expect("client builds");
    (server, DriveRemoteStore::new(client))
}

/// Like [`setup_drive_mock`], with a short request timeout and no retries
pub async fn setup_drive_mock_with_timeout(timeout: Duration) -> (MockServer, DriveRemoteStore) {
    let server = MockServer::start().await;
    let client = DriveClient::builder("test-access-token")
        .base_url(server.uri())
        .timeout(timeout)
        .max_retries(0)
        .build()
        .expect("client builds");
    (server, DriveRemoteStore::new(client))
}

pub fn id(value: &str) -> RemoteId {
    RemoteId::new(value.to_string()).unwrap()
}

/// A file resource as Drive returns it
pub fn file_json(id: &str, name: &str, size: u64) -> Value {
    json!({
        "id": id,
        "name": name,
        "mimeType": "application/octet-stream",
        "size": size.to_string(),
    })
}

/// A folder resource as Drive returns it
pub fn folder_json(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "mimeType": FOLDER_MIME,
    })
}

/// Mounts a single-page `files.list` response
pub async fn mount_list(server: &MockServer, files: Value) {
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "files": files })))
        .mount(server)
        .await;
}

/// Mounts a two-page `files.list` response
///
/// The request carrying `pageToken=page-2` is matched first; any other
/// listing request gets page 1 with a `nextPageToken`.
pub async fn mount_list_paginated(server: &MockServer, page1: Value, page2: Value) {
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "files": page2 })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "nextPageToken": "page-2",
            "files": page1,
        })))
        .mount(server)
        .await;
}

/// Mounts a resumable upload: session creation plus the content PUT
pub async fn mount_resumable_upload(server: &MockServer, response: Value) {
    mount_delayed_upload(server, response, Duration::ZERO).await;
}

/// Mounts a resumable upload whose content PUT answers after `delay`
pub async fn mount_delayed_upload(server: &MockServer, response: Value, delay: Duration) {
    let session = format!("{}/upload/session/s-001", server.uri());

    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .and(query_param("uploadType", "resumable"))
        .respond_with(ResponseTemplate::new(200).insert_header("Location", session.as_str()))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/upload/session/s-001"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(response)
                .set_delay(delay),
        )
        .expect(1)
        .mount(server)
        .await;
}
