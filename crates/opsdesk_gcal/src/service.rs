// --- File: crates/opsdesk_gcal/src/service.rs ---
//! Google Calendar implementation of [`CalendarService`].
//!
//! Every call resolves the operator's connected account, decrypts the stored
//! refresh token, exchanges it for an access token and performs exactly one
//! API operation with it. The outcome is written back to the account's
//! `sync_error` / `last_synced_at` fields so operators can see broken syncs.

use chrono::{DateTime, Utc};
use google_calendar3::api::{
    Event, EventAttendee, EventDateTime, FreeBusyRequest, FreeBusyRequestItem,
};
use opsdesk_codec::SecretCipher;
use opsdesk_common::models::CalendarAccount;
use opsdesk_common::services::{
    BoxFuture, BusyInterval, CalendarEvent, CalendarEventResult, CalendarService,
};
use opsdesk_config::GcalConfig;
use opsdesk_db::CalendarAccountRepository;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::auth::{exchange_refresh_token, hub_with_token, HubType};
use crate::error::GcalError;

/// Calendar adapter backed by per-operator Google accounts.
pub struct GoogleCalendarService<S> {
    store: S,
    cipher: Arc<SecretCipher>,
    config: GcalConfig,
}

/// One authorized hub plus the calendar it targets. Lives for one operation.
struct CalendarSession {
    hub: HubType,
    calendar_id: String,
}

impl<S> GoogleCalendarService<S>
where
    S: CalendarAccountRepository + Send + Sync,
{
    pub fn new(store: S, cipher: Arc<SecretCipher>, config: GcalConfig) -> Self {
        Self {
            store,
            cipher,
            config,
        }
    }

    /// The operator's connected account, if calendar sync is enabled for it.
    async fn synced_account(&self, operator_id: &str) -> Result<Option<CalendarAccount>, GcalError> {
        match self.store.get_calendar_account(operator_id).await? {
            Some(account) if account.sync_enabled => Ok(Some(account)),
            Some(_) => {
                debug!(operator_id, "Calendar sync disabled; skipping");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn access_token_for(&self, account: &CalendarAccount) -> Result<String, GcalError> {
        let refresh_token = self.cipher.decrypt(&account.encrypted_refresh_token)?;
        exchange_refresh_token(&self.config, refresh_token).await
    }

    /// Exchanges the stored refresh token for a short-lived access token.
    ///
    /// Returns `Ok(None)` when the operator has no connected account (or sync
    /// is disabled). The token is never cached or written to storage.
    pub async fn fresh_access_token(&self, operator_id: &str) -> Result<Option<String>, GcalError> {
        let Some(account) = self.synced_account(operator_id).await? else {
            return Ok(None);
        };
        match self.access_token_for(&account).await {
            Ok(token) => Ok(Some(token)),
            Err(e) => {
                self.record_outcome(operator_id, Some(&e)).await;
                Err(e)
            }
        }
    }

    async fn session(&self, operator_id: &str) -> Result<Option<CalendarSession>, GcalError> {
        let Some(account) = self.synced_account(operator_id).await? else {
            return Ok(None);
        };
        let session = match self.access_token_for(&account).await {
            Ok(token) => hub_with_token(token).map(|hub| CalendarSession {
                hub,
                calendar_id: account.calendar_id.clone(),
            }),
            Err(e) => Err(e),
        };
        match session {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                self.record_outcome(operator_id, Some(&e)).await;
                Err(e)
            }
        }
    }

    /// Writes the result of a sync attempt. Storage failures here are only logged.
    async fn record_outcome(&self, operator_id: &str, error: Option<&GcalError>) {
        if let Some(e) = error {
            warn!(operator_id, "Calendar sync failed: {}", e);
        }
        let message = error.map(|e| e.to_string());
        if let Err(e) = self
            .store
            .record_sync_result(operator_id, message, Utc::now())
            .await
        {
            warn!(operator_id, "Could not record calendar sync result: {}", e);
        }
    }

    async fn finish<T>(&self, operator_id: &str, result: Result<T, GcalError>) -> Result<T, GcalError> {
        self.record_outcome(operator_id, result.as_ref().err()).await;
        result
    }
}

impl CalendarSession {
    async fn busy(
        &self,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, GcalError> {
        let req = FreeBusyRequest {
            time_min: Some(start_time),
            time_max: Some(end_time),
            time_zone: Some("UTC".to_string()),
            items: Some(vec![FreeBusyRequestItem {
                id: Some(self.calendar_id.clone()),
                ..Default::default()
            }]),
            ..Default::default()
        };

        let (_response, freebusy) = self.hub.freebusy().query(req).doit().await?;

        let mut busy: Vec<BusyInterval> = freebusy
            .calendars
            .and_then(|mut calendars| calendars.remove(&self.calendar_id))
            .and_then(|info| info.busy)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|period| match (period.start, period.end) {
                (Some(start), Some(end)) => Some(BusyInterval { start, end }),
                _ => {
                    info!("Skipping busy period with missing start/end: {:?}", period);
                    None
                }
            })
            .collect();
        busy.sort_by_key(|interval| interval.start);
        Ok(busy)
    }

    async fn insert(&self, event: CalendarEvent) -> Result<CalendarEventResult, GcalError> {
        let (_response, created) = self
            .hub
            .events()
            .insert(to_google_event(event), &self.calendar_id)
            .send_updates("all")
            .doit()
            .await?;

        Ok(CalendarEventResult {
            event_id: created.id,
            status: created.status.unwrap_or_else(|| "confirmed".to_string()),
        })
    }

    async fn patch(&self, event_id: &str, event: CalendarEvent) -> Result<CalendarEventResult, GcalError> {
        let (_response, updated) = self
            .hub
            .events()
            .patch(to_google_event(event), &self.calendar_id, event_id)
            .send_updates("all")
            .doit()
            .await?;

        Ok(CalendarEventResult {
            event_id: updated.id.or_else(|| Some(event_id.to_string())),
            status: updated.status.unwrap_or_else(|| "confirmed".to_string()),
        })
    }

    async fn delete(&self, event_id: &str) -> Result<(), GcalError> {
        let result = self
            .hub
            .events()
            .delete(&self.calendar_id, event_id)
            .send_updates("all")
            .doit()
            .await;

        match result {
            Ok(_) => Ok(()),
            // Already gone on the provider side.
            Err(e) if is_gone(&e) => {
                debug!(event_id, "Calendar event already deleted");
                Ok(())
            }
            Err(e) => Err(GcalError::ApiError(e)),
        }
    }
}

/// 404/410 from the events API: the event no longer exists on the provider.
///
/// JSON error bodies arrive as `BadRequest` carrying the status in
/// `error.code`; anything else unsuccessful arrives as a raw `Failure`.
pub(crate) fn is_gone(err: &google_calendar3::Error) -> bool {
    let status = match err {
        google_calendar3::Error::Failure(response) => Some(u64::from(response.status().as_u16())),
        google_calendar3::Error::BadRequest(body) => body["error"]["code"].as_u64(),
        _ => None,
    };
    matches!(status, Some(404 | 410))
}

fn to_google_event(event: CalendarEvent) -> Event {
    let attendees: Vec<EventAttendee> = event
        .attendees
        .into_iter()
        .map(|email| EventAttendee {
            email: Some(email),
            ..Default::default()
        })
        .collect();

    Event {
        summary: Some(event.summary),
        description: event.description,
        start: Some(EventDateTime {
            date_time: Some(event.start_time),
            time_zone: Some(event.time_zone.clone()),
            ..Default::default()
        }),
        end: Some(EventDateTime {
            date_time: Some(event.end_time),
            time_zone: Some(event.time_zone),
            ..Default::default()
        }),
        attendees: (!attendees.is_empty()).then_some(attendees),
        ..Default::default()
    }
}

impl<S> CalendarService for GoogleCalendarService<S>
where
    S: CalendarAccountRepository + Send + Sync,
{
    type Error = GcalError;

    fn get_busy_times(
        &self,
        operator_id: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> BoxFuture<'_, Vec<BusyInterval>, Self::Error> {
        let operator_id = operator_id.to_string();
        Box::pin(async move {
            let Some(session) = self.session(&operator_id).await? else {
                return Ok(Vec::new());
            };
            let result = session.busy(start_time, end_time).await;
            self.finish(&operator_id, result).await
        })
    }

    fn create_event(
        &self,
        operator_id: &str,
        event: CalendarEvent,
    ) -> BoxFuture<'_, CalendarEventResult, Self::Error> {
        let operator_id = operator_id.to_string();
        Box::pin(async move {
            let Some(session) = self.session(&operator_id).await? else {
                return Ok(CalendarEventResult::skipped());
            };
            let result = session.insert(event).await;
            self.finish(&operator_id, result).await
        })
    }

    fn update_event(
        &self,
        operator_id: &str,
        event_id: &str,
        event: CalendarEvent,
    ) -> BoxFuture<'_, CalendarEventResult, Self::Error> {
        let operator_id = operator_id.to_string();
        let event_id = event_id.to_string();
        Box::pin(async move {
            let Some(session) = self.session(&operator_id).await? else {
                return Ok(CalendarEventResult::skipped());
            };
            let result = session.patch(&event_id, event).await;
            self.finish(&operator_id, result).await
        })
    }

    fn delete_event(&self, operator_id: &str, event_id: &str) -> BoxFuture<'_, (), Self::Error> {
        let operator_id = operator_id.to_string();
        let event_id = event_id.to_string();
        Box::pin(async move {
            let Some(session) = self.session(&operator_id).await? else {
                return Ok(());
            };
            let result = session.delete(&event_id).await;
            self.finish(&operator_id, result).await
        })
    }
}
