// --- File: crates/opsdesk_meetings/src/booking.rs ---
//! Booking service: the meeting state machine.
//!
//! ```text
//! book ──> confirmed ──reschedule──> rescheduled ──reschedule──> rescheduled
//!              │                         │
//!              ├──cancel──> cancelled    ├──cancel──> cancelled
//!              └──set_status──> completed | no_show
//! ```
//!
//! Every rule violation comes back as a typed [`MeetingError`]. The final
//! conflict check and the write happen together in the store, so two
//! concurrent requests for overlapping slots cannot both succeed. Side
//! effects are emitted as [`MeetingEvent`]s after the write commits.

use chrono::{DateTime, Duration, Timelike, Utc};
use opsdesk_codec::TokenAction;
use opsdesk_common::models::{
    ActorKind, AuditEntry, Meeting, MeetingStatus, OperatorMeetingSettings, ALLOWED_DURATIONS,
    MAX_RESCHEDULES,
};
use opsdesk_common::services::{BoxedError, BusyInterval, CalendarService};
use opsdesk_config::MeetingsConfig;
use opsdesk_db::{Buffers, RescheduleWrite, SchedulingStore, StatusChange, WriteOutcome};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::availability::{load_context, local_day_bounds, parse_date_range};
use crate::dispatch::{EventSink, MeetingEvent};
use crate::error::MeetingError;
use crate::extract::ClientMeta;
use crate::models::{BookMeetingRequest, BookingOutcome, SlotsResponse};
use crate::tokens::TokenPolicy;

/// Reschedules must happen at least this long before the current start.
pub const RESCHEDULE_CUTOFF_HOURS: i64 = 24;

const DEFAULT_SOURCE: &str = "booking_page";

#[derive(Clone)]
pub struct BookingService<S> {
    store: S,
    tokens: TokenPolicy,
    events: Arc<dyn EventSink>,
    calendar: Option<Arc<dyn CalendarService<Error = BoxedError>>>,
    config: MeetingsConfig,
}

fn whole_seconds(at: DateTime<Utc>) -> DateTime<Utc> {
    at.with_nanosecond(0).unwrap_or(at)
}

fn buffers_of(settings: &OperatorMeetingSettings) -> Buffers {
    Buffers {
        before_minutes: settings.buffer_before_minutes,
        after_minutes: settings.buffer_after_minutes,
    }
}

/// Key used when the client does not send one.
pub fn derived_dedupe_key(
    operator_id: &str,
    client_email: &str,
    start: DateTime<Utc>,
    duration_minutes: i64,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(
        format!(
            "{}|{}|{}|{}",
            operator_id,
            client_email,
            start.timestamp(),
            duration_minutes
        )
        .as_bytes(),
    );
    hex::encode(hasher.finalize())
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.contains(char::is_whitespace)
}

fn require_text(field: &str, value: &str, max_len: usize) -> Result<String, MeetingError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(MeetingError::Validation(format!("{field} is required")));
    }
    if value.chars().count() > max_len {
        return Err(MeetingError::Validation(format!(
            "{field} must be at most {max_len} characters"
        )));
    }
    Ok(value.to_string())
}

impl<S: SchedulingStore> BookingService<S> {
    pub fn new(
        store: S,
        tokens: TokenPolicy,
        events: Arc<dyn EventSink>,
        config: MeetingsConfig,
    ) -> Self {
        Self {
            store,
            tokens,
            events,
            calendar: None,
            config,
        }
    }

    /// Merges busy time from this calendar into slot computations.
    pub fn with_calendar(mut self, calendar: Arc<dyn CalendarService<Error = BoxedError>>) -> Self {
        self.calendar = Some(calendar);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &MeetingsConfig {
        &self.config
    }

    /// Settings for the operator, created with defaults on first access.
    pub async fn settings_for(&self, operator_id: &str) -> Result<OperatorMeetingSettings, MeetingError> {
        let defaults = OperatorMeetingSettings::defaults(operator_id, &self.config.default_timezone);
        Ok(self.store.get_or_init_settings(defaults).await?)
    }

    /// Busy time from the connected calendar; empty on any failure or timeout.
    async fn external_busy(
        &self,
        operator_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Vec<BusyInterval> {
        let Some(calendar) = &self.calendar else {
            return Vec::new();
        };
        let limit = std::time::Duration::from_secs(self.config.downstream_timeout_secs);
        match tokio::time::timeout(limit, calendar.get_busy_times(operator_id, from, to)).await {
            Ok(Ok(busy)) => busy,
            Ok(Err(e)) => {
                warn!(operator_id, "Ignoring external busy time: {}", e);
                Vec::new()
            }
            Err(_) => {
                warn!(operator_id, "External busy lookup timed out after {:?}", limit);
                Vec::new()
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn audit(
        &self,
        meeting_id: &str,
        action: &str,
        performed_by: ActorKind,
        actor_id: Option<String>,
        meta: &ClientMeta,
        metadata: serde_json::Value,
        now: DateTime<Utc>,
    ) {
        let entry = AuditEntry {
            id: Uuid::new_v4().to_string(),
            meeting_id: meeting_id.to_string(),
            action: action.to_string(),
            performed_by,
            actor_id,
            ip: meta.ip.clone(),
            user_agent: meta.user_agent.clone(),
            metadata,
            created_at: now,
        };
        // The state change is already committed; a lost audit row is logged loudly.
        if let Err(e) = self.store.append_audit(entry).await {
            error!(meeting_id, action, "Failed to write audit entry: {}", e);
        }
    }

    async fn reload(&self, meeting_id: &str) -> Result<Meeting, MeetingError> {
        self.store
            .find_meeting(meeting_id)
            .await?
            .ok_or(MeetingError::MeetingNotFound)
    }

    // --- Slots ---

    /// Bookable slots for an operator over `start_date..=end_date` (local days).
    pub async fn available_slots(
        &self,
        operator_id: &str,
        start_date: &str,
        end_date: &str,
        duration: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<SlotsResponse, MeetingError> {
        let operator = match self.store.find_operator(operator_id).await? {
            Some(operator) if operator.active => operator,
            _ => return Err(MeetingError::SettingsNotFound),
        };
        let settings = self.settings_for(operator_id).await?;
        if !settings.accepting_meetings {
            return Err(MeetingError::NotAcceptingMeetings);
        }

        let duration = duration.unwrap_or(settings.slot_duration_minutes);
        if !ALLOWED_DURATIONS.contains(&duration) {
            return Err(MeetingError::InvalidDuration(duration));
        }
        let (first_day, last_day) = parse_date_range(start_date, end_date, self.config.max_range_days)?;

        let tz = settings.tz();
        let (from, _) = local_day_bounds(tz, first_day);
        let (_, to) = local_day_bounds(tz, last_day);
        let busy = self.external_busy(operator_id, from, to).await;
        let ctx = load_context(&self.store, settings, from, to, busy).await?;

        let slots = ctx.slots(first_day, last_day, duration, now).collect::<Vec<_>>();
        info!(operator_id, slots = slots.len(), %first_day, %last_day, "Computed available slots");

        Ok(SlotsResponse {
            success: true,
            operator: (&operator).into(),
            settings: (&ctx.settings).into(),
            slots,
        })
    }

    // --- Create ---

    pub async fn book(
        &self,
        operator_id: &str,
        request: BookMeetingRequest,
        meta: &ClientMeta,
        now: DateTime<Utc>,
    ) -> Result<BookingOutcome, MeetingError> {
        // Validation first; nothing below runs on malformed input.
        if !ALLOWED_DURATIONS.contains(&request.duration) {
            return Err(MeetingError::InvalidDuration(request.duration));
        }
        let client_name = require_text("client_name", &request.client_name, 200)?;
        let subject = require_text("subject", &request.subject, 200)?;
        let client_email = request.client_email.trim().to_lowercase();
        if !looks_like_email(&client_email) || client_email.len() > 254 {
            return Err(MeetingError::Validation(
                "client_email must be a valid email address".to_string(),
            ));
        }
        let notes = trimmed(request.notes);
        if notes.as_ref().is_some_and(|n| n.chars().count() > 2000) {
            return Err(MeetingError::Validation(
                "notes must be at most 2000 characters".to_string(),
            ));
        }
        let start = whole_seconds(request.datetime);
        let duration = request.duration;

        let dedupe_key = match trimmed(request.idempotency_key) {
            Some(key) if key.len() > 128 => {
                return Err(MeetingError::Validation(
                    "idempotency_key must be at most 128 characters".to_string(),
                ))
            }
            Some(key) => key,
            None => derived_dedupe_key(operator_id, &client_email, start, duration),
        };

        // Preconditions.
        match self.store.find_operator(operator_id).await? {
            Some(operator) if operator.active => {}
            _ => return Err(MeetingError::OperatorNotFound),
        }
        let settings = self.settings_for(operator_id).await?;
        if !settings.accepting_meetings {
            return Err(MeetingError::NotAcceptingMeetings);
        }

        let dedupe_since = now - Duration::minutes(self.config.dedupe_window_minutes);
        if let Some(existing) = self
            .store
            .find_by_dedupe_key(operator_id, &dedupe_key, dedupe_since)
            .await?
        {
            info!(operator_id, meeting_id = %existing.id, "Returning meeting for repeated submission");
            return Ok(BookingOutcome {
                meeting: existing,
                duplicate: true,
            });
        }

        let tz = settings.tz();
        let (day_start, day_end) = local_day_bounds(tz, start.with_timezone(&tz).date_naive());
        let booked_today = self
            .store
            .count_active_starting_between(operator_id, day_start, day_end)
            .await?;
        if booked_today >= settings.max_meetings_per_day {
            return Err(MeetingError::DailyLimitReached {
                limit: settings.max_meetings_per_day,
            });
        }

        let end = start + Duration::minutes(duration);
        let busy = self.external_busy(operator_id, start, end).await;
        let buffers = buffers_of(&settings);
        let timezone = settings.timezone.clone();
        let ctx = load_context(&self.store, settings, start, end, busy).await?;
        ctx.check_slot(start, duration, now)?;

        // Write.
        let meeting_id = Uuid::new_v4().to_string();
        let tokens = self.tokens.mint(&meeting_id, &client_email, start, end, now)?;
        let meeting = Meeting {
            id: meeting_id,
            operator_id: operator_id.to_string(),
            meeting_type_id: trimmed(request.meeting_type_id),
            client_name,
            client_email,
            client_phone: trimmed(request.client_phone),
            client_company: trimmed(request.client_company),
            subject,
            notes,
            start_at: start,
            end_at: end,
            duration_minutes: duration,
            timezone,
            status: MeetingStatus::Confirmed,
            tokens,
            reschedule_count: 0,
            original_start_at: None,
            cancelled_at: None,
            cancelled_by: None,
            cancellation_reason: None,
            rescheduled_at: None,
            rescheduled_by: None,
            reschedule_reason: None,
            reminder_24h_sent: false,
            reminder_1h_sent: false,
            source: trimmed(request.source).unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            request_ip: meta.ip.clone(),
            user_agent: meta.user_agent.clone(),
            dedupe_key: Some(dedupe_key.clone()),
            calendar_event_id: None,
            created_at: now,
            updated_at: now,
        };

        match self.store.insert_meeting_guarded(meeting.clone(), buffers).await? {
            WriteOutcome::Written => {}
            WriteOutcome::Conflict => {
                // A concurrent duplicate of this same request may have won the race.
                if let Some(existing) = self
                    .store
                    .find_by_dedupe_key(operator_id, &dedupe_key, dedupe_since)
                    .await?
                {
                    return Ok(BookingOutcome {
                        meeting: existing,
                        duplicate: true,
                    });
                }
                info!(operator_id, %start, "Slot taken by a concurrent booking");
                return Err(MeetingError::SlotUnavailable);
            }
            WriteOutcome::Stale => {
                return Err(MeetingError::Internal("unexpected stale insert".to_string()))
            }
        }

        self.audit(
            &meeting.id,
            "created",
            ActorKind::Client,
            None,
            meta,
            json!({
                "start_at": meeting.start_at,
                "duration_minutes": meeting.duration_minutes,
                "source": meeting.source,
            }),
            now,
        )
        .await;
        info!(operator_id, meeting_id = %meeting.id, start = %meeting.start_at, "Meeting booked");
        self.events.emit(MeetingEvent::Created(meeting.clone()));

        Ok(BookingOutcome {
            meeting,
            duplicate: false,
        })
    }

    // --- Token access ---

    async fn meeting_for_token(
        &self,
        token: &str,
        action: TokenAction,
        now: DateTime<Utc>,
    ) -> Result<Meeting, MeetingError> {
        let claims = self.tokens.verify(token, action, now)?;
        let meeting = self
            .store
            .find_meeting(&claims.meeting_id)
            .await?
            .ok_or(MeetingError::MeetingNotFound)?;
        TokenPolicy::ensure_current(&meeting, &claims, token)?;
        Ok(meeting)
    }

    /// The meeting a view token points at.
    pub async fn view(&self, token: &str, now: DateTime<Utc>) -> Result<Meeting, MeetingError> {
        self.meeting_for_token(token, TokenAction::View, now).await
    }

    /// A meeting only if it belongs to `operator_id`.
    pub async fn operator_meeting(
        &self,
        operator_id: &str,
        meeting_id: &str,
    ) -> Result<Meeting, MeetingError> {
        match self.store.find_meeting(meeting_id).await? {
            Some(meeting) if meeting.operator_id == operator_id => Ok(meeting),
            _ => Err(MeetingError::MeetingNotFound),
        }
    }

    // --- Cancel ---

    pub async fn cancel_with_token(
        &self,
        token: &str,
        reason: Option<String>,
        meta: &ClientMeta,
        now: DateTime<Utc>,
    ) -> Result<Meeting, MeetingError> {
        let meeting = self.meeting_for_token(token, TokenAction::Cancel, now).await?;
        self.cancel(meeting, ActorKind::Client, None, reason, meta, now)
            .await
    }

    pub async fn cancel_as_operator(
        &self,
        operator_id: &str,
        meeting_id: &str,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Meeting, MeetingError> {
        let meeting = self.operator_meeting(operator_id, meeting_id).await?;
        self.cancel(
            meeting,
            ActorKind::Operator,
            Some(operator_id.to_string()),
            reason,
            &ClientMeta::default(),
            now,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn cancel(
        &self,
        meeting: Meeting,
        by: ActorKind,
        actor_id: Option<String>,
        reason: Option<String>,
        meta: &ClientMeta,
        now: DateTime<Utc>,
    ) -> Result<Meeting, MeetingError> {
        if meeting.status.is_terminal() {
            return Err(MeetingError::for_terminal(meeting.status, MeetingStatus::Cancelled));
        }
        let reason = trimmed(reason);

        let change = StatusChange {
            meeting_id: meeting.id.clone(),
            from: MeetingStatus::ACTIVE.to_vec(),
            to: MeetingStatus::Cancelled,
            at: now,
            by,
            reason: reason.clone(),
        };
        if self.store.transition_status(change).await? != WriteOutcome::Written {
            // Lost a race with another transition.
            let current = self.reload(&meeting.id).await?;
            return Err(MeetingError::for_terminal(current.status, MeetingStatus::Cancelled));
        }

        let cancelled = self.reload(&meeting.id).await?;
        self.audit(
            &cancelled.id,
            "cancelled",
            by,
            actor_id,
            meta,
            json!({
                "reason": reason,
                "start_at": cancelled.start_at,
                "previous_status": meeting.status,
            }),
            now,
        )
        .await;
        info!(meeting_id = %cancelled.id, by = by.as_str(), "Meeting cancelled");
        self.events.emit(MeetingEvent::Cancelled(cancelled.clone()));
        Ok(cancelled)
    }

    // --- Reschedule ---

    pub async fn reschedule_with_token(
        &self,
        token: &str,
        new_start: DateTime<Utc>,
        reason: Option<String>,
        meta: &ClientMeta,
        now: DateTime<Utc>,
    ) -> Result<Meeting, MeetingError> {
        let meeting = self
            .meeting_for_token(token, TokenAction::Reschedule, now)
            .await?;
        self.reschedule(meeting, new_start, ActorKind::Client, None, reason, meta, now)
            .await
    }

    fn reschedule_precondition(meeting: &Meeting, now: DateTime<Utc>) -> Result<(), MeetingError> {
        if meeting.status.is_terminal() {
            return Err(MeetingError::for_terminal(meeting.status, MeetingStatus::Rescheduled));
        }
        if meeting.reschedule_count >= MAX_RESCHEDULES {
            return Err(MeetingError::MaxReschedulesReached);
        }
        if meeting.start_at - now < Duration::hours(RESCHEDULE_CUTOFF_HOURS) {
            return Err(MeetingError::TooLateToReschedule);
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn reschedule(
        &self,
        meeting: Meeting,
        new_start: DateTime<Utc>,
        by: ActorKind,
        actor_id: Option<String>,
        reason: Option<String>,
        meta: &ClientMeta,
        now: DateTime<Utc>,
    ) -> Result<Meeting, MeetingError> {
        Self::reschedule_precondition(&meeting, now)?;
        let reason = trimmed(reason);

        let new_start = whole_seconds(new_start);
        let new_end = new_start + Duration::minutes(meeting.duration_minutes);
        let settings = self.settings_for(&meeting.operator_id).await?;
        let buffers = buffers_of(&settings);

        let mut busy = self
            .external_busy(&meeting.operator_id, new_start, new_end)
            .await;
        // The provider still holds this meeting at its old time.
        busy.retain(|b| !(b.start == meeting.start_at && b.end == meeting.end_at));

        let ctx = load_context(&self.store, settings, new_start, new_end, busy)
            .await?
            .excluding_meeting(&meeting.id);
        ctx.check_slot(new_start, meeting.duration_minutes, now)?;

        let tokens = self
            .tokens
            .mint(&meeting.id, &meeting.client_email, new_start, new_end, now)?;
        let write = RescheduleWrite {
            meeting_id: meeting.id.clone(),
            operator_id: meeting.operator_id.clone(),
            expected_count: meeting.reschedule_count,
            new_start,
            new_end,
            original_start: meeting.start_at,
            at: now,
            by,
            reason: reason.clone(),
            tokens,
            buffers,
        };

        match self.store.reschedule_guarded(write).await? {
            WriteOutcome::Written => {}
            WriteOutcome::Conflict => return Err(MeetingError::SlotUnavailable),
            WriteOutcome::Stale => {
                let current = self.reload(&meeting.id).await?;
                Self::reschedule_precondition(&current, now)?;
                return Err(MeetingError::SlotUnavailable);
            }
        }

        let moved = self.reload(&meeting.id).await?;
        self.audit(
            &moved.id,
            "rescheduled",
            by,
            actor_id,
            meta,
            json!({
                "old_start_at": meeting.start_at,
                "new_start_at": moved.start_at,
                "reason": reason,
                "reschedule_count": moved.reschedule_count,
            }),
            now,
        )
        .await;
        info!(
            meeting_id = %moved.id,
            from = %meeting.start_at,
            to = %moved.start_at,
            count = moved.reschedule_count,
            "Meeting rescheduled"
        );
        self.events.emit(MeetingEvent::Rescheduled {
            meeting: moved.clone(),
            previous_start: meeting.start_at,
        });
        Ok(moved)
    }

    // --- Operator status ---

    /// Marks a meeting completed or no-show. The time does not change, so no
    /// feasibility check is needed.
    pub async fn set_status(
        &self,
        operator_id: &str,
        meeting_id: &str,
        status: MeetingStatus,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Meeting, MeetingError> {
        let meeting = self.operator_meeting(operator_id, meeting_id).await?;
        if !matches!(status, MeetingStatus::Completed | MeetingStatus::NoShow) {
            return Err(MeetingError::InvalidStatusTransition {
                from: meeting.status,
                to: status,
            });
        }
        if meeting.status.is_terminal() {
            return Err(MeetingError::InvalidStatusTransition {
                from: meeting.status,
                to: status,
            });
        }
        let reason = trimmed(reason);

        let change = StatusChange {
            meeting_id: meeting.id.clone(),
            from: MeetingStatus::ACTIVE.to_vec(),
            to: status,
            at: now,
            by: ActorKind::Operator,
            reason: reason.clone(),
        };
        if self.store.transition_status(change).await? != WriteOutcome::Written {
            let current = self.reload(&meeting.id).await?;
            return Err(MeetingError::InvalidStatusTransition {
                from: current.status,
                to: status,
            });
        }

        let updated = self.reload(&meeting.id).await?;
        self.audit(
            &updated.id,
            "status_changed",
            ActorKind::Operator,
            Some(operator_id.to_string()),
            &ClientMeta::default(),
            json!({ "from": meeting.status, "to": status, "reason": reason }),
            now,
        )
        .await;
        info!(meeting_id = %updated.id, from = %meeting.status, to = %status, "Meeting status changed");
        self.events.emit(MeetingEvent::StatusChanged {
            meeting: updated.clone(),
            from: meeting.status,
        });
        Ok(updated)
    }
}
