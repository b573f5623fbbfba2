use crate::error::DbError;
use chrono::{DateTime, Duration, Utc};
use opsdesk_common::models::{
    ActorKind, Meeting, MeetingFilter, MeetingStatus, MeetingTokens, Page, ReminderKind,
};
use std::future::Future;

/// Result of a write that is guarded by the conflict check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// Another active meeting (buffers included) occupies the range.
    Conflict,
    /// The row no longer matches the expected status or counter.
    Stale,
}

/// Buffers applied by guarded writes, in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Buffers {
    pub before_minutes: i64,
    pub after_minutes: i64,
}

impl Buffers {
    /// `(lo, hi)` such that an existing meeting collides with `[start, end)`
    /// iff `existing.start < hi && existing.end > lo`.
    pub fn conflict_bounds(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            start - Duration::minutes(self.after_minutes),
            end + Duration::minutes(self.before_minutes),
        )
    }
}

/// Everything a reschedule writes in one statement.
#[derive(Debug, Clone)]
pub struct RescheduleWrite {
    pub meeting_id: String,
    pub operator_id: String,
    /// Optimistic check against concurrent reschedules.
    pub expected_count: i64,
    pub new_start: DateTime<Utc>,
    pub new_end: DateTime<Utc>,
    /// Stored only if the meeting has never moved before.
    pub original_start: DateTime<Utc>,
    pub at: DateTime<Utc>,
    pub by: ActorKind,
    pub reason: Option<String>,
    pub tokens: MeetingTokens,
    pub buffers: Buffers,
}

/// A status transition applied only while the meeting is in one of `from`.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub meeting_id: String,
    pub from: Vec<MeetingStatus>,
    pub to: MeetingStatus,
    pub at: DateTime<Utc>,
    pub by: ActorKind,
    pub reason: Option<String>,
}

pub trait MeetingRepository {
    /// Inserts the meeting unless an active meeting of the same operator
    /// collides with it. Check and insert are a single statement.
    fn insert_meeting_guarded(
        &self,
        meeting: Meeting,
        buffers: Buffers,
    ) -> impl Future<Output = Result<WriteOutcome, DbError>> + Send;

    fn find_meeting(
        &self,
        meeting_id: &str,
    ) -> impl Future<Output = Result<Option<Meeting>, DbError>> + Send;

    /// Most recent active meeting with this key created at or after `since`.
    /// Cancelled or finished meetings never absorb a new submission.
    fn find_by_dedupe_key(
        &self,
        operator_id: &str,
        dedupe_key: &str,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<Meeting>, DbError>> + Send;

    /// Active meetings overlapping `[from, to)`, ordered by start.
    fn list_active_between(
        &self,
        operator_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Meeting>, DbError>> + Send;

    /// Active meetings starting in `[from, to)`.
    fn count_active_starting_between(
        &self,
        operator_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> impl Future<Output = Result<i64, DbError>> + Send;

    fn list_meetings(
        &self,
        filter: MeetingFilter,
    ) -> impl Future<Output = Result<Page<Meeting>, DbError>> + Send;

    fn reschedule_guarded(
        &self,
        write: RescheduleWrite,
    ) -> impl Future<Output = Result<WriteOutcome, DbError>> + Send;

    /// `Written` when the row moved, `Stale` when it was not in `from`.
    fn transition_status(
        &self,
        change: StatusChange,
    ) -> impl Future<Output = Result<WriteOutcome, DbError>> + Send;

    fn set_calendar_event_id(
        &self,
        meeting_id: &str,
        event_id: Option<String>,
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Active meetings starting in `(now, now + lead]` whose flag for `kind` is unset.
    fn due_for_reminder(
        &self,
        kind: ReminderKind,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Meeting>, DbError>> + Send;

    /// Sets the flag; `false` if it was already set.
    fn mark_reminder_sent(
        &self,
        meeting_id: &str,
        kind: ReminderKind,
    ) -> impl Future<Output = Result<bool, DbError>> + Send;
}
