use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use opsdesk_codec::{SecretCipher, TokenSigner};
use opsdesk_common::models::CalendarAccount;
use opsdesk_common::OperatorAuthState;
use opsdesk_config::GcalConfig;
use opsdesk_db::{CalendarAccountRepository, MemoryStore};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use crate::handlers::GcalState;
use crate::oauth::AUTH_ENDPOINT;
use crate::routes::routes;

fn config() -> GcalConfig {
    GcalConfig {
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
        redirect_uri: "http://localhost:8086/api/calendar/oauth/callback".to_string(),
        default_calendar_id: "primary".to_string(),
    }
}

fn app(store: MemoryStore, config: Option<GcalConfig>) -> Router {
    let state = Arc::new(GcalState {
        store,
        cipher: Arc::new(SecretCipher::new("encryption-secret").unwrap()),
        signer: Arc::new(TokenSigner::new("signing-secret")),
        config,
    });
    routes(state, OperatorAuthState::new("op-secret"))
}

fn operator_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", "Bearer op-secret")
        .header("X-Operator-Id", "op-1")
        .body(Body::empty())
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_operator_routes_require_credentials() {
    let response = app(MemoryStore::new(), Some(config()))
        .oneshot(
            Request::builder()
                .uri("/operator/calendar")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_status_without_account() {
    let response = app(MemoryStore::new(), Some(config()))
        .oneshot(operator_request("GET", "/operator/calendar"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["connected"], false);
    assert_eq!(body["sync_enabled"], false);
}

#[tokio::test]
async fn test_status_never_exposes_refresh_token() {
    let store = MemoryStore::new();
    store
        .upsert_calendar_account(CalendarAccount {
            operator_id: "op-1".to_string(),
            provider_email: Some("ops@example.com".to_string()),
            encrypted_refresh_token: "00aa:11bb:22cc".to_string(),
            calendar_id: "primary".to_string(),
            sync_enabled: true,
            last_synced_at: None,
            sync_error: Some("Token exchange failed: invalid_grant".to_string()),
        })
        .await
        .unwrap();

    let response = app(store, Some(config()))
        .oneshot(operator_request("GET", "/operator/calendar"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(!text.contains("00aa:11bb:22cc"));

    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["connected"], true);
    assert_eq!(body["provider_email"], "ops@example.com");
    assert_eq!(body["sync_error"], "Token exchange failed: invalid_grant");
}

#[tokio::test]
async fn test_connect_returns_consent_url() {
    let response = app(MemoryStore::new(), Some(config()))
        .oneshot(operator_request("GET", "/operator/calendar/connect"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let url = body["authorization_url"].as_str().unwrap();
    assert!(url.starts_with(AUTH_ENDPOINT));
    assert!(url.contains("state="));
}

#[tokio::test]
async fn test_connect_without_integration_is_unavailable() {
    let response = app(MemoryStore::new(), None)
        .oneshot(operator_request("GET", "/operator/calendar/connect"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["code"], "CALENDAR_NOT_CONFIGURED");
}

#[tokio::test]
async fn test_disconnect_removes_account_once() {
    let store = MemoryStore::new();
    store
        .upsert_calendar_account(CalendarAccount {
            operator_id: "op-1".to_string(),
            provider_email: None,
            encrypted_refresh_token: "x".to_string(),
            calendar_id: "primary".to_string(),
            sync_enabled: true,
            last_synced_at: None,
            sync_error: None,
        })
        .await
        .unwrap();
    let app = app(store.clone(), Some(config()));

    let first = app
        .clone()
        .oneshot(operator_request("DELETE", "/operator/calendar"))
        .await
        .unwrap();
    assert_eq!(json_body(first).await["disconnected"], true);
    assert!(store.get_calendar_account("op-1").await.unwrap().is_none());

    let second = app
        .oneshot(operator_request("DELETE", "/operator/calendar"))
        .await
        .unwrap();
    assert_eq!(json_body(second).await["disconnected"], false);
}

#[tokio::test]
async fn test_callback_reports_declined_consent() {
    let response = app(MemoryStore::new(), Some(config()))
        .oneshot(
            Request::builder()
                .uri("/calendar/oauth/callback?error=access_denied&state=abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "CALENDAR_AUTH_DENIED");
}

#[tokio::test]
async fn test_callback_rejects_forged_state() {
    let response = app(MemoryStore::new(), Some(config()))
        .oneshot(
            Request::builder()
                .uri("/calendar/oauth/callback?code=abc&state=forged.state.value")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "INVALID_TOKEN");
}
