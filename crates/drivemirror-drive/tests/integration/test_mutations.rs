//! Integration tests for folder creation, upload and deletion

use std::time::Duration;

use wiremock::matchers::{body_bytes, body_partial_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

use drivemirror_core::domain::EntryKind;
use drivemirror_core::ports::{ChildQuery, FileContent, NewEntry, RemoteStore};

use crate::common;

#[tokio::test]
async fn test_create_folder() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("POST"))
        .and(path("/drive/v3/files"))
        .and(body_partial_json(serde_json::json!({
            "name": "Photos",
            "mimeType": common::FOLDER_MIME,
            "parents": ["P1"],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::folder_json("F1", "Photos")))
        .expect(1)
        .mount(&server)
        .await;

    let created = store
        .create(NewEntry::folder("Photos", common::id("P1")), None)
        .await
        .expect("create failed");

    assert_eq!(created.id.as_str(), "F1");
    assert_eq!(created.kind, EntryKind::Folder);
}

#[tokio::test]
async fn test_upload_streams_content_through_session() {
    let (server, store) = common::setup_drive_mock().await;
    common::mount_resumable_upload(&server, common::file_json("A1", "data.bin", 10)).await;

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("data.bin");
    std::fs::write(&local, b"0123456789").unwrap();
    let content = FileContent::open(&local).await.unwrap();

    let created = store
        .create(NewEntry::file("data.bin", common::id("P1")), Some(content))
        .await
        .expect("upload failed");

    assert_eq!(created.id.as_str(), "A1");
    assert_eq!(created.size, Some(10));

    let requests = server.received_requests().await.unwrap();
    let put = requests
        .iter()
        .find(|r| r.method.as_str() == "PUT")
        .expect("content PUT sent");
    assert_eq!(put.body, b"0123456789");
}

#[tokio::test]
async fn test_upload_session_announces_length() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .and(header("X-Upload-Content-Length", "4"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Location", format!("{}/upload/session/s-9", server.uri()).as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/upload/session/s-9"))
        .and(body_bytes(b"abcd".to_vec()))
        .respond_with(ResponseTemplate::new(201).set_body_json(common::file_json("A2", "x", 4)))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("x");
    std::fs::write(&local, b"abcd").unwrap();

    let created = store
        .create(
            NewEntry::file("x", common::id("P1")),
            Some(FileContent::open(&local).await.unwrap()),
        )
        .await
        .unwrap();
    assert_eq!(created.id.as_str(), "A2");
}

#[tokio::test]
async fn test_upload_without_location_fails() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("x");
    std::fs::write(&local, b"abcd").unwrap();

    let result = store
        .create(
            NewEntry::file("x", common::id("P1")),
            Some(FileContent::open(&local).await.unwrap()),
        )
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_empty_file_is_metadata_only() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("POST"))
        .and(path("/drive/v3/files"))
        .and(body_partial_json(serde_json::json!({ "name": "empty", "parents": ["P1"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::file_json("E1", "empty", 0)))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("empty");
    std::fs::write(&local, b"").unwrap();

    let created = store
        .create(
            NewEntry::file("empty", common::id("P1")),
            Some(FileContent::open(&local).await.unwrap()),
        )
        .await
        .unwrap();
    assert_eq!(created.size, Some(0));
}

#[tokio::test]
async fn test_delete_entry() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("DELETE"))
        .and(path("/drive/v3/files/A1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    store.delete(&common::id("A1")).await.expect("delete failed");
}

#[tokio::test]
async fn test_delete_missing_entry_is_ok() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("DELETE"))
        .and(path("/drive/v3/files/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_string("File not found"))
        .mount(&server)
        .await;

    store
        .delete(&common::id("gone"))
        .await
        .expect("404 counts as deleted");
}

#[tokio::test]
async fn test_delete_forbidden_is_error() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("DELETE"))
        .and(path("/drive/v3/files/A1"))
        .respond_with(ResponseTemplate::new(403).set_body_string("insufficientFilePermissions"))
        .mount(&server)
        .await;

    let err = store.delete(&common::id("A1")).await.unwrap_err();
    assert!(format!("{err:#}").contains("Forbidden"));
}

#[tokio::test]
async fn test_slow_upload_outlives_request_timeout() {
    let (server, store) = common::setup_drive_mock_with_timeout(Duration::from_secs(1)).await;
    common::mount_delayed_upload(
        &server,
        common::file_json("A9", "big.bin", 4),
        Duration::from_secs(2),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("big.bin");
    std::fs::write(&local, b"data").unwrap();
    let content = FileContent::open(&local).await.unwrap();

    let created = store
        .create(NewEntry::file("big.bin", common::id("P1")), Some(content))
        .await
        .expect("content transfer must not be bound by the request timeout");

    assert_eq!(created.id.as_str(), "A9");
}

#[tokio::test]
async fn test_slow_metadata_request_times_out() {
    let (server, store) = common::setup_drive_mock_with_timeout(Duration::from_secs(1)).await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "files": [] }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let result = store
        .list(&ChildQuery::children_of(common::id("P1")), 10, None)
        .await;

    assert!(result.is_err());
}
