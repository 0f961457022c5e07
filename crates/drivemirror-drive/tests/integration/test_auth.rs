//! Integration tests for token refresh and transport renewal

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use drivemirror_core::ports::{transport, ChildQuery, SharedStore};
use drivemirror_drive::auth::{CredentialManager, OAuth2Config, TokenFile, Tokens};
use drivemirror_drive::client::DriveClient;
use drivemirror_drive::provider::DriveRemoteStore;

use crate::common;

fn expired_tokens() -> Tokens {
    Tokens {
        access_token: "old-token".to_string(),
        refresh_token: Some("refresh-1".to_string()),
        expires_at: Utc::now() - chrono::Duration::minutes(1),
    }
}

async fn mount_token_endpoint(server: &MockServer, access_token: &str) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": access_token,
            "expires_in": 3599,
            "token_type": "Bearer",
        })))
        .mount(server)
        .await;
}

fn manager(server: &MockServer, dir: &tempfile::TempDir) -> CredentialManager {
    let oauth = OAuth2Config::new("test-client")
        .with_client_secret("test-secret")
        .with_endpoints(
            format!("{}/auth", server.uri()),
            format!("{}/token", server.uri()),
        );
    CredentialManager::new(&oauth, TokenFile::new(dir.path().join("token.json")))
        .unwrap()
        .with_api_base_url(server.uri())
}

#[tokio::test]
async fn test_renew_refreshes_and_persists() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "new-token").await;
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&server, &dir);

    let renewed = manager
        .renew(&expired_tokens(), chrono::Duration::minutes(5))
        .await
        .unwrap()
        .expect("token should be renewed");

    assert_eq!(renewed.access_token, "new-token");
    // Google omits the refresh token on refresh
    assert_eq!(renewed.refresh_token.as_deref(), Some("refresh-1"));
    assert!(renewed.expires_at > Utc::now());
    assert_eq!(manager.token_file().load().unwrap(), Some(renewed));
}

#[tokio::test]
async fn test_renew_failure_is_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&server, &dir);

    assert!(manager
        .renew(&expired_tokens(), chrono::Duration::minutes(5))
        .await
        .is_err());
    assert!(manager.token_file().load().unwrap().is_none());
}

#[tokio::test]
async fn test_initial_tokens_uses_saved_file() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&server, &dir);

    let saved = Tokens {
        access_token: "saved".to_string(),
        refresh_token: Some("refresh-1".to_string()),
        expires_at: Utc::now() + chrono::Duration::hours(1),
    };
    manager.token_file().store(&saved).unwrap();

    assert_eq!(manager.initial_tokens().await.unwrap(), saved);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_built_store_uses_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(wiremock::matchers::header("authorization", "Bearer saved"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "files": [] })))
        .expect(1)
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let manager = manager(&server, &dir);

    let tokens = Tokens {
        access_token: "saved".to_string(),
        refresh_token: None,
        expires_at: Utc::now() + chrono::Duration::hours(1),
    };
    let store = manager.build_store(&tokens).unwrap();
    let page = store
        .list(&ChildQuery::children_of(common::id("P1")), 10, None)
        .await
        .unwrap();
    assert!(page.entries.is_empty());
}

#[tokio::test]
async fn test_renewal_loop_swaps_transport() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, "rotated").await;
    let dir = tempfile::tempdir().unwrap();
    let manager = Arc::new(manager(&server, &dir));

    let initial: SharedStore = Arc::new(DriveRemoteStore::new(DriveClient::new("old-token")));
    let (swap, handle) = transport(Arc::clone(&initial));
    let shutdown = CancellationToken::new();

    let task = {
        let manager = Arc::clone(&manager);
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            manager
                .renewal_loop(expired_tokens(), swap, Duration::from_millis(50), shutdown)
                .await;
        })
    };

    tokio::time::timeout(Duration::from_secs(5), async {
        while Arc::ptr_eq(&handle.current(), &initial) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("transport was not replaced in time");

    let stored = manager.token_file().load().unwrap().unwrap();
    assert_eq!(stored.access_token, "rotated");

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("loop did not stop")
        .unwrap();
}
