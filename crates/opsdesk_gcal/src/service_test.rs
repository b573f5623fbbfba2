use chrono::{TimeZone, Utc};
use opsdesk_codec::SecretCipher;
use opsdesk_common::models::CalendarAccount;
use opsdesk_common::services::{CalendarEvent, CalendarService};
use opsdesk_config::GcalConfig;
use opsdesk_db::{CalendarAccountRepository, MemoryStore};
use std::sync::Arc;

use crate::error::GcalError;
use crate::service::{is_gone, GoogleCalendarService};

fn config() -> GcalConfig {
    GcalConfig {
        client_id: "client-id".to_string(),
        client_secret: "client-secret".to_string(),
        redirect_uri: "http://localhost:8086/api/calendar/oauth/callback".to_string(),
        default_calendar_id: "primary".to_string(),
    }
}

fn service(store: MemoryStore) -> GoogleCalendarService<MemoryStore> {
    let cipher = Arc::new(SecretCipher::new("test-encryption-secret").unwrap());
    GoogleCalendarService::new(store, cipher, config())
}

fn event() -> CalendarEvent {
    CalendarEvent {
        start_time: Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap(),
        end_time: Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap(),
        time_zone: "Asia/Riyadh".to_string(),
        summary: "Intro call".to_string(),
        description: None,
        attendees: vec!["client@example.com".to_string()],
    }
}

fn account(operator_id: &str, encrypted: &str, sync_enabled: bool) -> CalendarAccount {
    CalendarAccount {
        operator_id: operator_id.to_string(),
        provider_email: Some("ops@example.com".to_string()),
        encrypted_refresh_token: encrypted.to_string(),
        calendar_id: "primary".to_string(),
        sync_enabled,
        last_synced_at: None,
        sync_error: None,
    }
}

#[tokio::test]
async fn test_unconnected_operator_skips_every_call() {
    let service = service(MemoryStore::new());
    let start = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();

    assert!(service.fresh_access_token("op-1").await.unwrap().is_none());
    assert!(service.get_busy_times("op-1", start, end).await.unwrap().is_empty());

    let created = service.create_event("op-1", event()).await.unwrap();
    assert_eq!(created.event_id, None);
    assert_eq!(created.status, "skipped");

    let updated = service.update_event("op-1", "evt-1", event()).await.unwrap();
    assert_eq!(updated.status, "skipped");

    service.delete_event("op-1", "evt-1").await.unwrap();
}

#[tokio::test]
async fn test_disabled_sync_is_treated_as_unconnected() {
    let store = MemoryStore::new();
    store
        .upsert_calendar_account(account("op-1", "whatever", false))
        .await
        .unwrap();
    let service = service(store);

    assert!(service.fresh_access_token("op-1").await.unwrap().is_none());
    let created = service.create_event("op-1", event()).await.unwrap();
    assert_eq!(created.event_id, None);
}

#[tokio::test]
async fn test_undecryptable_token_records_sync_error() {
    let store = MemoryStore::new();
    store
        .upsert_calendar_account(account("op-1", "not-a-ciphertext", true))
        .await
        .unwrap();
    let service = service(store.clone());

    let start = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap();
    let result = service.get_busy_times("op-1", start, end).await;
    assert!(matches!(result, Err(GcalError::Codec(_))));

    let stored = store.get_calendar_account("op-1").await.unwrap().unwrap();
    assert!(stored.sync_error.is_some());
    assert_eq!(stored.last_synced_at, None);
}

#[tokio::test]
async fn test_fresh_access_token_failure_is_recorded() {
    let store = MemoryStore::new();
    store
        .upsert_calendar_account(account("op-1", "aa:bb:cc", true))
        .await
        .unwrap();
    let service = service(store.clone());

    assert!(service.fresh_access_token("op-1").await.is_err());
    let stored = store.get_calendar_account("op-1").await.unwrap().unwrap();
    assert!(stored.sync_error.is_some());
}

#[test]
fn test_missing_events_are_recognised_by_status() {
    let not_found = google_calendar3::Error::BadRequest(serde_json::json!({
        "error": { "code": 404, "message": "Not Found" }
    }));
    let deleted = google_calendar3::Error::BadRequest(serde_json::json!({
        "error": { "code": 410, "message": "Resource has been deleted" }
    }));
    assert!(is_gone(&not_found));
    assert!(is_gone(&deleted));

    // A message that merely mentions the numbers is not a missing event.
    let forbidden = google_calendar3::Error::BadRequest(serde_json::json!({
        "error": { "code": 403, "message": "quota 404 exceeded after 410 calls" }
    }));
    assert!(!is_gone(&forbidden));
    assert!(!is_gone(&google_calendar3::Error::Cancelled));
}
