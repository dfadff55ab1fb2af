//! End-to-end authenticated-retry scenarios against a mock server.
//!
//! Exercises the full pipeline: decorator, reqwest transport, error
//! translation, retry coordinator, and token refresh over the wire.

use std::sync::Arc;

use chrono::{Duration, Utc};
use courier_core::operation::storage::StorageOperationKind;
use courier_core::ports::{Method, Record, RecordStore};
use courier_domain::{DataError, TokenState};
use courier_infra::{Courier, MemoryTokenStore, SqliteRecordStore};
use serde::{Deserialize, Serialize};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Profile {
    id: String,
    name: String,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn expired_state() -> TokenState {
    let mut state = TokenState::new("stale-access", Some("refresh-1".to_string()), 60);
    state.refreshed_at = Utc::now() - Duration::seconds(600);
    state
}

fn envelope_body(profile: &Profile) -> serde_json::Value {
    serde_json::json!({
        "status": {"code": "200", "code_text": "OK"},
        "body": profile,
    })
}

async fn courier_for(server: &MockServer, state: TokenState) -> Courier {
    let store = Arc::new(MemoryTokenStore::new());
    let courier = Courier::builder()
        .config(courier_domain::CourierConfig {
            api: courier_domain::ApiConfig { base_url: server.uri(), timeout_secs: 5 },
            retry: courier_domain::RetryConfig {
                max_retries: 3,
                delay_increment_ms: 1,
                max_replay_delay_ms: 10,
            },
            device: courier_domain::DeviceConfig {
                device_id: Some("itest-device".to_string()),
                locale: "en".to_string(),
                platform: "test".to_string(),
            },
        })
        .token_store(store)
        .build()
        .unwrap();
    courier.tokens().set_tokens(state).await.unwrap();
    courier
}

fn refresh_success() -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_json(serde_json::json!({"status": {"code": "200"}, "body": {}}))
        .insert_header("Access-Token", "fresh-access")
        .insert_header("Refresh-Token", "refresh-2")
        .insert_header("Expires-In", "3600")
}

#[tokio::test]
async fn expired_token_is_refreshed_once_and_requests_replayed() {
    init_tracing();
    let server = MockServer::start().await;

    // First attempts carry the stale bearer and are rejected.
    Mock::given(method("GET"))
        .and(path("/profiles/me"))
        .and(header("Authorization", "Bearer stale-access"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "status": {"code": "401", "message": "token expired"}
        })))
        .mount(&server)
        .await;

    // Exactly one refresh is allowed on the wire.
    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .respond_with(refresh_success())
        .expect(1)
        .mount(&server)
        .await;

    // Replays carry the refreshed bearer.
    Mock::given(method("GET"))
        .and(path("/profiles/me"))
        .and(header("Authorization", "Bearer fresh-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope_body(&Profile {
            id: "me".to_string(),
            name: "Nova".to_string(),
        })))
        .expect(4)
        .mount(&server)
        .await;

    let courier = courier_for(&server, expired_state()).await;
    let operation = courier.remote::<()>(Method::Get, "profiles/me").enveloped::<Profile>();

    // Four concurrent calls all fail with 401, coalesce into one refresh,
    // and replay successfully.
    let mut handles = Vec::new();
    for _ in 0..4 {
        let operation = operation.clone();
        handles.push(tokio::spawn(async move { operation.call(()).await }));
    }

    for handle in handles {
        let profile = handle.await.unwrap().unwrap();
        assert_eq!(profile.name, "Nova");
    }

    // Mock expectations (one refresh, four replays) are verified on drop.
}

#[tokio::test]
async fn failed_refresh_surfaces_a_terminal_auth_error_and_resets_the_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/profiles/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "status": {"code": "401", "message": "token expired"}
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let courier = courier_for(&server, expired_state()).await;
    let operation = courier.remote::<()>(Method::Get, "profiles/me").enveloped::<Profile>();

    let err = operation.call(()).await.unwrap_err();
    assert!(matches!(err, DataError::Auth(_)), "terminal auth error, got {err:?}");

    // The stored access token was reset; the refresh token survives.
    let state = courier.tokens().current().await.unwrap();
    assert!(state.access_token.is_empty());
    assert_eq!(state.refresh_token.as_deref(), Some("refresh-1"));
}

#[tokio::test]
async fn valid_token_races_replay_without_refreshing() {
    let server = MockServer::start().await;

    // The server rejects the first attempt even though the stored token is
    // fresh (stale-token race); the replay goes through.
    Mock::given(method("GET"))
        .and(path("/profiles/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "status": {"code": "401", "message": "who are you"}
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/profiles/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope_body(&Profile {
            id: "me".to_string(),
            name: "Nova".to_string(),
        })))
        .mount(&server)
        .await;

    // No refresh call may reach the wire.
    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .respond_with(refresh_success())
        .expect(0)
        .mount(&server)
        .await;

    let courier =
        courier_for(&server, TokenState::new("fresh", Some("refresh-1".to_string()), 3600)).await;
    let operation = courier.remote::<()>(Method::Get, "profiles/me").enveloped::<Profile>();

    let profile = operation.call(()).await.unwrap();
    assert_eq!(profile.id, "me");
}

#[tokio::test]
async fn device_headers_travel_with_every_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/profiles/me"))
        .and(header("Device-Id", "itest-device"))
        .and(header("Locale", "en"))
        .and(header("Platform", "test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope_body(&Profile {
            id: "me".to_string(),
            name: "Nova".to_string(),
        })))
        .expect(1)
        .mount(&server)
        .await;

    let courier =
        courier_for(&server, TokenState::new("fresh", Some("refresh-1".to_string()), 3600)).await;
    let operation = courier.remote::<()>(Method::Get, "profiles/me").enveloped::<Profile>();
    operation.call(()).await.unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Draft {
    id: String,
    text: String,
}

impl Record for Draft {
    fn collection() -> &'static str {
        "drafts"
    }

    fn key(&self) -> String {
        self.id.clone()
    }
}

#[tokio::test]
async fn storage_operations_run_through_the_same_facade() {
    let server = MockServer::start().await;
    let courier =
        courier_for(&server, TokenState::new("fresh", Some("refresh-1".to_string()), 3600)).await;

    let store = Arc::new(SqliteRecordStore::in_memory().unwrap());
    let insert = courier.storage(
        StorageOperationKind::Insert,
        Arc::clone(&store) as Arc<dyn RecordStore<Draft>>,
    );
    let fetch = courier
        .storage(StorageOperationKind::Fetch, Arc::clone(&store) as Arc<dyn RecordStore<Draft>>)
        .pipe(|draft: Draft| Ok(draft.text));

    insert.call(Draft { id: "d1".to_string(), text: "hello".to_string() }).await.unwrap();
    let text = fetch.call(Draft { id: "d1".to_string(), text: String::new() }).await.unwrap();
    assert_eq!(text, "hello");
}
