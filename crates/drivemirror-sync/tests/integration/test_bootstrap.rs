//! Startup checks and destination resolution

use drivemirror_sync::bootstrap::{bootstrap, resolve_destination};
use drivemirror_sync::MirrorError;

use crate::common::{self, MemoryStore};

#[tokio::test]
async fn test_missing_source_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();

    let err = bootstrap(&*store, &tmp.path().join("nope"), "CLOUD")
        .await
        .unwrap_err();

    assert!(matches!(err, MirrorError::SourceUnavailable { .. }));
    assert_eq!(store.mutations(), (0, 0));
}

#[tokio::test]
async fn test_file_source_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    common::write_file(tmp.path(), "file", b"1");
    let store = MemoryStore::new();

    let err = bootstrap(&*store, &tmp.path().join("file"), "CLOUD")
        .await
        .unwrap_err();

    assert!(matches!(err, MirrorError::SourceNotDirectory(_)));
}

#[tokio::test]
async fn test_destination_created_under_root() {
    let tmp = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();

    let root = bootstrap(&*store, tmp.path(), "CLOUD").await.unwrap();

    let created = store.child("root", "CLOUD").unwrap();
    assert_eq!(root.remote_folder_id().as_str(), created.id);
    assert_eq!(root.local_path(), tmp.path());
}

#[tokio::test]
async fn test_existing_destination_is_reused() {
    let store = MemoryStore::new();
    let existing = store.seed_folder("root", "CLOUD");
    // a file with the same name is not a candidate
    store.seed_file("root", "CLOUD", b"x");

    let id = resolve_destination(&*store, "CLOUD").await.unwrap();

    assert_eq!(id.as_str(), existing);
    assert_eq!(store.mutations(), (0, 0));
}

#[tokio::test]
async fn test_destination_lookup_failure_is_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let store = MemoryStore::new();
    store.fail_lookups_of("CLOUD");

    let err = bootstrap(&*store, tmp.path(), "CLOUD").await.unwrap_err();

    match err {
        MirrorError::DestinationUnavailable { name, reason } => {
            assert_eq!(name, "CLOUD");
            assert!(reason.contains("injected"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
