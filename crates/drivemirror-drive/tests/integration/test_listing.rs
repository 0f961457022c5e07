//! Integration tests for child listing

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use drivemirror_core::domain::EntryKind;
use drivemirror_core::ports::{ChildQuery, RemoteStore};

use crate::common;

#[tokio::test]
async fn test_list_converts_files_and_folders() {
    let (server, store) = common::setup_drive_mock().await;
    common::mount_list(
        &server,
        json!([
            common::folder_json("F1", "Photos"),
            common::file_json("A1", "notes.txt", 10),
        ]),
    )
    .await;

    let page = store
        .list(&ChildQuery::children_of(common::id("P1")), 1000, None)
        .await
        .expect("list failed");

    assert_eq!(page.entries.len(), 2);
    assert_eq!(page.entries[0].name, "Photos");
    assert_eq!(page.entries[0].kind, EntryKind::Folder);
    assert_eq!(page.entries[1].size, Some(10));
    assert!(page.next_page_token.is_none());
}

#[tokio::test]
async fn test_list_sends_rendered_query() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param(
            "q",
            "'P1' in parents and mimeType = 'application/vnd.google-apps.folder' \
             and name = 'Bob\\'s' and trashed = false",
        ))
        .and(query_param("pageSize", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [common::folder_json("F9", "Bob's")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let query = ChildQuery::named(common::id("P1"), "Bob's", EntryKind::Folder);
    let page = store.list(&query, 1, None).await.expect("list failed");

    assert_eq!(page.entries.len(), 1);
    assert_eq!(page.entries[0].id.as_str(), "F9");
}

#[tokio::test]
async fn test_list_follows_page_token() {
    let (server, store) = common::setup_drive_mock().await;
    common::mount_list_paginated(
        &server,
        json!([common::file_json("A1", "a", 1)]),
        json!([common::file_json("B1", "b", 2)]),
    )
    .await;

    let query = ChildQuery::children_of(common::id("P1"));
    let first = store.list(&query, 1000, None).await.unwrap();
    assert_eq!(first.entries[0].name, "a");
    assert_eq!(first.next_page_token.as_deref(), Some("page-2"));

    let second = store
        .list(&query, 1000, first.next_page_token.as_deref())
        .await
        .unwrap();
    assert_eq!(second.entries[0].name, "b");
    assert!(second.next_page_token.is_none());
}

#[tokio::test]
async fn test_list_retries_server_error() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    common::mount_list(&server, json!([common::file_json("A1", "a", 1)])).await;

    let page = store
        .list(&ChildQuery::children_of(common::id("P1")), 1000, None)
        .await
        .expect("retry should recover");
    assert_eq!(page.entries.len(), 1);
}

#[tokio::test]
async fn test_list_client_error_is_not_retried() {
    let (server, store) = common::setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Invalid Value"))
        .expect(1)
        .mount(&server)
        .await;

    let result = store
        .list(&ChildQuery::children_of(common::id("P1")), 1000, None)
        .await;
    assert!(result.is_err());
}
