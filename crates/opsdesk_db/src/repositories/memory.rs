//! In-memory implementation of every repository trait.
//!
//! Used by tests and local runs without a database file. Each operation holds
//! the store lock for its whole check-and-write, which gives the same
//! guarantees as the single-statement guards of the SQL backend.

use crate::error::DbError;
use crate::repositories::{
    audit::AuditRepository,
    availability::AvailabilityRepository,
    calendar_account::CalendarAccountRepository,
    meeting::{Buffers, MeetingRepository, RescheduleWrite, StatusChange, WriteOutcome},
    operator::OperatorRepository,
    rate_limit::RateLimitRepository,
    settings::SettingsRepository,
    time_off::TimeOffRepository,
};
use chrono::{DateTime, Utc};
use opsdesk_common::models::{
    AuditEntry, AvailabilityDay, CalendarAccount, Meeting, MeetingFilter, MeetingStatus,
    OperatorMeetingSettings, OperatorProfile, Page, RateLimitWindow, ReminderKind, TimeOff,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct MemoryState {
    operators: HashMap<String, OperatorProfile>,
    settings: HashMap<String, OperatorMeetingSettings>,
    availability: HashMap<String, BTreeMap<u8, AvailabilityDay>>,
    time_off: Vec<TimeOff>,
    meetings: Vec<Meeting>,
    audit: Vec<AuditEntry>,
    calendar_accounts: HashMap<String, CalendarAccount>,
    rate_limits: HashMap<String, RateLimitWindow>,
}

impl MemoryState {
    fn collides(&self, operator_id: &str, skip_id: Option<&str>, lo: DateTime<Utc>, hi: DateTime<Utc>) -> bool {
        self.meetings.iter().any(|m| {
            m.operator_id == operator_id
                && Some(m.id.as_str()) != skip_id
                && m.status.is_active()
                && m.start_at < hi
                && m.end_at > lo
        })
    }

    fn meeting_mut(&mut self, id: &str) -> Option<&mut Meeting> {
        self.meetings.iter_mut().find(|m| m.id == id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OperatorRepository for MemoryStore {
    async fn upsert_operator(&self, profile: OperatorProfile) -> Result<(), DbError> {
        self.state
            .lock()
            .await
            .operators
            .insert(profile.id.clone(), profile);
        Ok(())
    }

    async fn find_operator(&self, operator_id: &str) -> Result<Option<OperatorProfile>, DbError> {
        Ok(self.state.lock().await.operators.get(operator_id).cloned())
    }
}

impl SettingsRepository for MemoryStore {
    async fn get_settings(
        &self,
        operator_id: &str,
    ) -> Result<Option<OperatorMeetingSettings>, DbError> {
        Ok(self.state.lock().await.settings.get(operator_id).cloned())
    }

    async fn get_or_init_settings(
        &self,
        defaults: OperatorMeetingSettings,
    ) -> Result<OperatorMeetingSettings, DbError> {
        let mut state = self.state.lock().await;
        Ok(state
            .settings
            .entry(defaults.operator_id.clone())
            .or_insert(defaults)
            .clone())
    }

    async fn update_settings(
        &self,
        settings: OperatorMeetingSettings,
    ) -> Result<OperatorMeetingSettings, DbError> {
        self.state
            .lock()
            .await
            .settings
            .insert(settings.operator_id.clone(), settings.clone());
        Ok(settings)
    }
}

impl AvailabilityRepository for MemoryStore {
    async fn get_availability(&self, operator_id: &str) -> Result<Vec<AvailabilityDay>, DbError> {
        Ok(self
            .state
            .lock()
            .await
            .availability
            .get(operator_id)
            .map(|week| week.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_or_init_availability(
        &self,
        operator_id: &str,
        defaults: Vec<AvailabilityDay>,
    ) -> Result<Vec<AvailabilityDay>, DbError> {
        let mut state = self.state.lock().await;
        let week = state.availability.entry(operator_id.to_string()).or_default();
        if week.is_empty() {
            for day in defaults {
                week.insert(day.day_of_week, day);
            }
        }
        Ok(week.values().cloned().collect())
    }

    async fn replace_availability(
        &self,
        operator_id: &str,
        days: Vec<AvailabilityDay>,
    ) -> Result<Vec<AvailabilityDay>, DbError> {
        let week: BTreeMap<u8, AvailabilityDay> =
            days.into_iter().map(|d| (d.day_of_week, d)).collect();
        let result = week.values().cloned().collect();
        self.state
            .lock()
            .await
            .availability
            .insert(operator_id.to_string(), week);
        Ok(result)
    }
}

impl TimeOffRepository for MemoryStore {
    async fn list_time_off(&self, operator_id: &str) -> Result<Vec<TimeOff>, DbError> {
        let mut entries: Vec<TimeOff> = self
            .state
            .lock()
            .await
            .time_off
            .iter()
            .filter(|t| t.operator_id == operator_id)
            .cloned()
            .collect();
        entries.sort_by_key(|t| t.start_at);
        Ok(entries)
    }

    async fn create_time_off(&self, time_off: TimeOff) -> Result<TimeOff, DbError> {
        let mut state = self.state.lock().await;
        if state.time_off.iter().any(|t| t.id == time_off.id) {
            return Err(DbError::QueryError(format!("duplicate time off id {}", time_off.id)));
        }
        state.time_off.push(time_off.clone());
        Ok(time_off)
    }

    async fn delete_time_off(&self, operator_id: &str, id: &str) -> Result<bool, DbError> {
        let mut state = self.state.lock().await;
        let before = state.time_off.len();
        state
            .time_off
            .retain(|t| !(t.id == id && t.operator_id == operator_id));
        Ok(state.time_off.len() != before)
    }
}

impl MeetingRepository for MemoryStore {
    async fn insert_meeting_guarded(
        &self,
        meeting: Meeting,
        buffers: Buffers,
    ) -> Result<WriteOutcome, DbError> {
        let mut state = self.state.lock().await;
        if state.meetings.iter().any(|m| m.id == meeting.id) {
            return Err(DbError::QueryError(format!("duplicate meeting id {}", meeting.id)));
        }
        let (lo, hi) = buffers.conflict_bounds(meeting.start_at, meeting.end_at);
        if state.collides(&meeting.operator_id, None, lo, hi) {
            return Ok(WriteOutcome::Conflict);
        }
        state.meetings.push(meeting);
        Ok(WriteOutcome::Written)
    }

    async fn find_meeting(&self, meeting_id: &str) -> Result<Option<Meeting>, DbError> {
        Ok(self
            .state
            .lock()
            .await
            .meetings
            .iter()
            .find(|m| m.id == meeting_id)
            .cloned())
    }

    async fn find_by_dedupe_key(
        &self,
        operator_id: &str,
        dedupe_key: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Meeting>, DbError> {
        Ok(self
            .state
            .lock()
            .await
            .meetings
            .iter()
            .filter(|m| {
                m.operator_id == operator_id
                    && m.dedupe_key.as_deref() == Some(dedupe_key)
                    && m.created_at >= since
                    && m.status.is_active()
            })
            .max_by_key(|m| m.created_at)
            .cloned())
    }

    async fn list_active_between(
        &self,
        operator_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Meeting>, DbError> {
        let mut found: Vec<Meeting> = self
            .state
            .lock()
            .await
            .meetings
            .iter()
            .filter(|m| {
                m.operator_id == operator_id
                    && m.status.is_active()
                    && m.start_at < to
                    && m.end_at > from
            })
            .cloned()
            .collect();
        found.sort_by_key(|m| m.start_at);
        Ok(found)
    }

    async fn count_active_starting_between(
        &self,
        operator_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64, DbError> {
        let count = self
            .state
            .lock()
            .await
            .meetings
            .iter()
            .filter(|m| {
                m.operator_id == operator_id
                    && m.status.is_active()
                    && m.start_at >= from
                    && m.start_at < to
            })
            .count();
        Ok(count as i64)
    }

    async fn list_meetings(&self, filter: MeetingFilter) -> Result<Page<Meeting>, DbError> {
        let mut matching: Vec<Meeting> = self
            .state
            .lock()
            .await
            .meetings
            .iter()
            .filter(|m| m.operator_id == filter.operator_id)
            .filter(|m| filter.status.map_or(true, |s| m.status == s))
            .filter(|m| filter.from.map_or(true, |from| m.start_at >= from))
            .filter(|m| filter.to.map_or(true, |to| m.start_at < to))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.start_at.cmp(&a.start_at));

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(usize::try_from(filter.offset()).unwrap_or(0))
            .take(usize::try_from(filter.per_page).unwrap_or(0))
            .collect();

        Ok(Page {
            items,
            total,
            page: filter.page.max(1),
            per_page: filter.per_page,
        })
    }

    async fn reschedule_guarded(&self, write: RescheduleWrite) -> Result<WriteOutcome, DbError> {
        let mut state = self.state.lock().await;
        let (lo, hi) = write.buffers.conflict_bounds(write.new_start, write.new_end);

        let fresh = state.meetings.iter().any(|m| {
            m.id == write.meeting_id
                && m.status.is_active()
                && m.reschedule_count == write.expected_count
        });
        if !fresh {
            return Ok(WriteOutcome::Stale);
        }
        if state.collides(&write.operator_id, Some(&write.meeting_id), lo, hi) {
            return Ok(WriteOutcome::Conflict);
        }

        let Some(meeting) = state.meeting_mut(&write.meeting_id) else {
            return Ok(WriteOutcome::Stale);
        };
        meeting.start_at = write.new_start;
        meeting.end_at = write.new_end;
        meeting.status = MeetingStatus::Rescheduled;
        meeting.reschedule_count += 1;
        meeting.original_start_at.get_or_insert(write.original_start);
        meeting.rescheduled_at = Some(write.at);
        meeting.rescheduled_by = Some(write.by);
        meeting.reschedule_reason = write.reason;
        meeting.tokens = write.tokens;
        meeting.reminder_24h_sent = false;
        meeting.reminder_1h_sent = false;
        meeting.updated_at = write.at;
        Ok(WriteOutcome::Written)
    }

    async fn transition_status(&self, change: StatusChange) -> Result<WriteOutcome, DbError> {
        let mut state = self.state.lock().await;
        let Some(meeting) = state.meeting_mut(&change.meeting_id) else {
            return Ok(WriteOutcome::Stale);
        };
        if !change.from.contains(&meeting.status) {
            return Ok(WriteOutcome::Stale);
        }
        meeting.status = change.to;
        meeting.updated_at = change.at;
        if change.to == MeetingStatus::Cancelled {
            meeting.cancelled_at = Some(change.at);
            meeting.cancelled_by = Some(change.by);
            meeting.cancellation_reason = change.reason;
        }
        Ok(WriteOutcome::Written)
    }

    async fn set_calendar_event_id(
        &self,
        meeting_id: &str,
        event_id: Option<String>,
    ) -> Result<(), DbError> {
        if let Some(meeting) = self.state.lock().await.meeting_mut(meeting_id) {
            meeting.calendar_event_id = event_id;
        }
        Ok(())
    }

    async fn due_for_reminder(
        &self,
        kind: ReminderKind,
        now: DateTime<Utc>,
    ) -> Result<Vec<Meeting>, DbError> {
        let horizon = now + kind.lead_time();
        let mut due: Vec<Meeting> = self
            .state
            .lock()
            .await
            .meetings
            .iter()
            .filter(|m| {
                let sent = match kind {
                    ReminderKind::DayBefore => m.reminder_24h_sent,
                    ReminderKind::HourBefore => m.reminder_1h_sent,
                };
                m.status.is_active() && !sent && m.start_at > now && m.start_at <= horizon
            })
            .cloned()
            .collect();
        due.sort_by_key(|m| m.start_at);
        Ok(due)
    }

    async fn mark_reminder_sent(
        &self,
        meeting_id: &str,
        kind: ReminderKind,
    ) -> Result<bool, DbError> {
        let mut state = self.state.lock().await;
        let Some(meeting) = state.meeting_mut(meeting_id) else {
            return Ok(false);
        };
        let flag = match kind {
            ReminderKind::DayBefore => &mut meeting.reminder_24h_sent,
            ReminderKind::HourBefore => &mut meeting.reminder_1h_sent,
        };
        if *flag {
            return Ok(false);
        }
        *flag = true;
        Ok(true)
    }
}

impl AuditRepository for MemoryStore {
    async fn append_audit(&self, entry: AuditEntry) -> Result<(), DbError> {
        self.state.lock().await.audit.push(entry);
        Ok(())
    }

    async fn list_audit(&self, meeting_id: &str) -> Result<Vec<AuditEntry>, DbError> {
        Ok(self
            .state
            .lock()
            .await
            .audit
            .iter()
            .filter(|e| e.meeting_id == meeting_id)
            .cloned()
            .collect())
    }
}

impl CalendarAccountRepository for MemoryStore {
    async fn get_calendar_account(
        &self,
        operator_id: &str,
    ) -> Result<Option<CalendarAccount>, DbError> {
        Ok(self
            .state
            .lock()
            .await
            .calendar_accounts
            .get(operator_id)
            .cloned())
    }

    async fn upsert_calendar_account(&self, account: CalendarAccount) -> Result<(), DbError> {
        self.state
            .lock()
            .await
            .calendar_accounts
            .insert(account.operator_id.clone(), account);
        Ok(())
    }

    async fn delete_calendar_account(&self, operator_id: &str) -> Result<bool, DbError> {
        Ok(self
            .state
            .lock()
            .await
            .calendar_accounts
            .remove(operator_id)
            .is_some())
    }

    async fn record_sync_result(
        &self,
        operator_id: &str,
        error: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        if let Some(account) = self.state.lock().await.calendar_accounts.get_mut(operator_id) {
            match error {
                None => {
                    account.sync_error = None;
                    account.last_synced_at = Some(at);
                }
                Some(message) => account.sync_error = Some(message),
            }
        }
        Ok(())
    }
}

impl RateLimitRepository for MemoryStore {
    async fn purge_expired_windows(&self, now: DateTime<Utc>) -> Result<u64, DbError> {
        let mut state = self.state.lock().await;
        let before = state.rate_limits.len();
        state.rate_limits.retain(|_, w| w.window_end > now);
        Ok((before - state.rate_limits.len()) as u64)
    }

    async fn find_live_window(
        &self,
        ip: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RateLimitWindow>, DbError> {
        Ok(self
            .state
            .lock()
            .await
            .rate_limits
            .get(ip)
            .filter(|w| w.window_end > now)
            .cloned())
    }

    async fn increment_live_window(
        &self,
        ip: &str,
        now: DateTime<Utc>,
        cap: i64,
    ) -> Result<bool, DbError> {
        let mut state = self.state.lock().await;
        match state.rate_limits.get_mut(ip) {
            Some(window) if window.window_end > now && window.request_count < cap => {
                window.request_count += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn open_window(
        &self,
        ip: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state.rate_limits.get(ip) {
            if existing.window_end > window_start {
                return Ok(false);
            }
        }
        state.rate_limits.insert(
            ip.to_string(),
            RateLimitWindow {
                ip: ip.to_string(),
                request_count: 1,
                window_start,
                window_end,
            },
        );
        Ok(true)
    }
}
