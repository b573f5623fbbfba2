// --- File: crates/opsdesk_common/src/models.rs ---

// Domain records shared by the storage layer, the scheduling engine and the
// calendar adapter. Timestamps are UTC; local interpretation always goes through
// the operator's configured timezone.

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Slot lengths a client may book, in minutes.
pub const ALLOWED_DURATIONS: [i64; 3] = [15, 30, 60];

/// Hard cap on reschedules per meeting.
pub const MAX_RESCHEDULES: i64 = 2;

// --- Meeting ---

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    Confirmed,
    Rescheduled,
    Cancelled,
    Completed,
    NoShow,
}

impl MeetingStatus {
    /// Statuses that occupy the operator's calendar.
    pub const ACTIVE: [MeetingStatus; 2] = [MeetingStatus::Confirmed, MeetingStatus::Rescheduled];

    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingStatus::Confirmed => "confirmed",
            MeetingStatus::Rescheduled => "rescheduled",
            MeetingStatus::Cancelled => "cancelled",
            MeetingStatus::Completed => "completed",
            MeetingStatus::NoShow => "no_show",
        }
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

impl fmt::Display for MeetingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeetingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(MeetingStatus::Confirmed),
            "rescheduled" => Ok(MeetingStatus::Rescheduled),
            "cancelled" => Ok(MeetingStatus::Cancelled),
            "completed" => Ok(MeetingStatus::Completed),
            "no_show" => Ok(MeetingStatus::NoShow),
            other => Err(format!("unknown meeting status: {other}")),
        }
    }
}

/// Who performed an action on a meeting.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorKind {
    Client,
    Operator,
    System,
}

impl ActorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorKind::Client => "client",
            ActorKind::Operator => "operator",
            ActorKind::System => "system",
        }
    }
}

impl FromStr for ActorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "client" => Ok(ActorKind::Client),
            "operator" => Ok(ActorKind::Operator),
            "system" => Ok(ActorKind::System),
            other => Err(format!("unknown actor: {other}")),
        }
    }
}

/// A signed capability token as stored on the meeting, with its own expiry.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// The three capability tokens minted for every meeting.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingTokens {
    pub view: IssuedToken,
    pub cancel: IssuedToken,
    pub reschedule: IssuedToken,
}

/// One booked or formerly booked appointment between an operator and a client.
///
/// `end_at` is always `start_at + duration_minutes`; use [`Meeting::move_to`] to
/// change the time so the two never drift.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: String,
    pub operator_id: String,
    pub meeting_type_id: Option<String>,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub client_company: Option<String>,
    pub subject: String,
    pub notes: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub timezone: String,
    pub status: MeetingStatus,
    pub tokens: MeetingTokens,
    pub reschedule_count: i64,
    pub original_start_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<ActorKind>,
    pub cancellation_reason: Option<String>,
    pub rescheduled_at: Option<DateTime<Utc>>,
    pub rescheduled_by: Option<ActorKind>,
    pub reschedule_reason: Option<String>,
    pub reminder_24h_sent: bool,
    pub reminder_1h_sent: bool,
    pub source: String,
    pub request_ip: Option<String>,
    pub user_agent: Option<String>,
    pub dedupe_key: Option<String>,
    pub calendar_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Meeting {
    /// Moves the meeting to a new start, keeping the duration.
    pub fn move_to(&mut self, start_at: DateTime<Utc>) {
        self.start_at = start_at;
        self.end_at = start_at + Duration::minutes(self.duration_minutes);
    }

    /// Timestamp of the most recent cancel/reschedule transition, if any.
    pub fn last_transition_at(&self) -> Option<DateTime<Utc>> {
        match self.status {
            MeetingStatus::Cancelled => self.cancelled_at,
            MeetingStatus::Rescheduled => self.rescheduled_at,
            _ => None,
        }
    }
}

/// Whether `[start, end)` collides with an existing `[existing_start, existing_end)`
/// once the existing one is padded by `before` on its start and `after` on its end.
pub fn buffered_overlap(
    existing_start: DateTime<Utc>,
    existing_end: DateTime<Utc>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    before: Duration,
    after: Duration,
) -> bool {
    start < existing_end + after && end > existing_start - before
}

// --- Operator settings ---

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeUnit {
    Minutes,
    Hours,
    Days,
}

impl NoticeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeUnit::Minutes => "minutes",
            NoticeUnit::Hours => "hours",
            NoticeUnit::Days => "days",
        }
    }
}

impl FromStr for NoticeUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minutes" => Ok(NoticeUnit::Minutes),
            "hours" => Ok(NoticeUnit::Hours),
            "days" => Ok(NoticeUnit::Days),
            other => Err(format!("unknown notice unit: {other}")),
        }
    }
}

/// Per-operator booking rules.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorMeetingSettings {
    pub operator_id: String,
    pub booking_slug: String,
    pub slot_duration_minutes: i64,
    pub buffer_before_minutes: i64,
    pub buffer_after_minutes: i64,
    pub max_days_in_advance: i64,
    pub min_notice_value: i64,
    pub min_notice_unit: NoticeUnit,
    pub max_meetings_per_day: i64,
    pub accepting_meetings: bool,
    pub timezone: String,
    pub welcome_message: Option<String>,
    pub meeting_title: Option<String>,
}

impl OperatorMeetingSettings {
    /// The payload written when an operator's settings are first touched.
    pub fn defaults(operator_id: &str, timezone: &str) -> Self {
        Self {
            operator_id: operator_id.to_string(),
            booking_slug: operator_id.to_lowercase(),
            slot_duration_minutes: 30,
            buffer_before_minutes: 0,
            buffer_after_minutes: 0,
            max_days_in_advance: 30,
            min_notice_value: 4,
            min_notice_unit: NoticeUnit::Hours,
            max_meetings_per_day: 8,
            accepting_meetings: true,
            timezone: timezone.to_string(),
            welcome_message: None,
            meeting_title: None,
        }
    }

    pub fn min_notice(&self) -> Duration {
        match self.min_notice_unit {
            NoticeUnit::Minutes => Duration::minutes(self.min_notice_value),
            NoticeUnit::Hours => Duration::hours(self.min_notice_value),
            NoticeUnit::Days => Duration::days(self.min_notice_value),
        }
    }

    pub fn buffer_before(&self) -> Duration {
        Duration::minutes(self.buffer_before_minutes)
    }

    pub fn buffer_after(&self) -> Duration {
        Duration::minutes(self.buffer_after_minutes)
    }

    /// Parsed timezone, falling back to UTC for unknown names.
    pub fn tz(&self) -> Tz {
        Tz::from_str(&self.timezone).unwrap_or(Tz::UTC)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !ALLOWED_DURATIONS.contains(&self.slot_duration_minutes) {
            return Err(format!(
                "slot_duration_minutes must be one of {:?}",
                ALLOWED_DURATIONS
            ));
        }
        if self.buffer_before_minutes < 0 || self.buffer_after_minutes < 0 {
            return Err("buffers must not be negative".to_string());
        }
        if self.max_days_in_advance < 1 {
            return Err("max_days_in_advance must be at least 1".to_string());
        }
        if self.min_notice_value < 0 {
            return Err("min_notice_value must not be negative".to_string());
        }
        if self.max_meetings_per_day < 1 {
            return Err("max_meetings_per_day must be at least 1".to_string());
        }
        if Tz::from_str(&self.timezone).is_err() {
            return Err(format!("unknown timezone: {}", self.timezone));
        }
        if self.booking_slug.trim().is_empty() {
            return Err("booking_slug must not be empty".to_string());
        }
        Ok(())
    }
}

// --- Weekly availability ---

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, "%H:%M").map_err(serde::de::Error::custom)
    }
}

/// A time-of-day window, serialized as `{"start": "09:00", "end": "17:00"}`.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(with = "hhmm")]
    #[cfg_attr(feature = "openapi", schema(value_type = String, example = "09:00"))]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    #[cfg_attr(feature = "openapi", schema(value_type = String, example = "17:00"))]
    pub end: NaiveTime,
}

impl TimeRange {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    pub fn hours(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start: NaiveTime::from_hms_opt(start_hour, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(end_hour, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

/// One row per (operator, day of week). Day 0 is Sunday.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityDay {
    pub operator_id: String,
    pub day_of_week: u8,
    pub enabled: bool,
    pub intervals: Vec<TimeRange>,
}

impl AvailabilityDay {
    /// Sunday through Thursday, 09:00 to 17:00.
    pub fn default_week(operator_id: &str) -> Vec<Self> {
        (0..7u8)
            .map(|day| Self {
                operator_id: operator_id.to_string(),
                day_of_week: day,
                enabled: day <= 4,
                intervals: vec![TimeRange::hours(9, 17)],
            })
            .collect()
    }

    /// Intervals must be non-empty (`end > start`) and must not overlap.
    pub fn validate(&self) -> Result<(), String> {
        if self.day_of_week > 6 {
            return Err(format!("day_of_week out of range: {}", self.day_of_week));
        }
        if self.enabled && self.intervals.is_empty() {
            return Err(format!("day {} is enabled without intervals", self.day_of_week));
        }
        let mut sorted = self.intervals.clone();
        sorted.sort_by_key(|range| range.start);
        for range in &sorted {
            if range.end <= range.start {
                return Err(format!(
                    "interval {}-{} must end after it starts",
                    range.start.format("%H:%M"),
                    range.end.format("%H:%M")
                ));
            }
        }
        for pair in sorted.windows(2) {
            if pair[1].start < pair[0].end {
                return Err(format!(
                    "intervals overlap on day {}: {}-{} and {}-{}",
                    self.day_of_week,
                    pair[0].start.format("%H:%M"),
                    pair[0].end.format("%H:%M"),
                    pair[1].start.format("%H:%M"),
                    pair[1].end.format("%H:%M")
                ));
            }
        }
        Ok(())
    }
}

// --- Time off ---

/// A blackout interval. Recurring entries repeat every year on the same dates.
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeOff {
    pub id: String,
    pub operator_id: String,
    pub title: String,
    pub reason: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub recurring: bool,
}

impl TimeOff {
    /// Whether `[start, end)` intersects this blackout (or one of its yearly repeats).
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        if !self.recurring {
            return start < self.end_at && end > self.start_at;
        }
        // Repeats only from the year it was created in onwards.
        let base_year = self.start_at.year();
        (start.year() - 1..=end.year())
            .filter(|year| *year >= base_year)
            .filter_map(|year| {
                let shift = year - base_year;
                let from = shift_years(self.start_at, shift)?;
                let to = shift_years(self.end_at, shift)?;
                Some((from, to))
            })
            .any(|(from, to)| start < to && end > from)
    }
}

fn shift_years(at: DateTime<Utc>, years: i32) -> Option<DateTime<Utc>> {
    let naive = at.naive_utc();
    let shifted = naive.with_year(naive.year() + years)?;
    Some(Utc.from_utc_datetime(&shifted))
}

// --- Calendar account ---

/// Connection to the operator's external calendar. The refresh credential is
/// stored encrypted; access credentials are never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarAccount {
    pub operator_id: String,
    pub provider_email: Option<String>,
    pub encrypted_refresh_token: String,
    pub calendar_id: String,
    pub sync_enabled: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub sync_error: Option<String>,
}

// --- Audit log ---

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub meeting_id: String,
    pub action: String,
    pub performed_by: ActorKind,
    pub actor_id: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

// --- Rate limiting ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitWindow {
    pub ip: String,
    pub request_count: i64,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}

// --- Operator directory ---

#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorProfile {
    pub id: String,
    pub display_name: String,
    pub email: String,
    pub active: bool,
}

// --- Listing ---

/// Filter for the operator's meeting list. Pages are 1-based.
#[derive(Debug, Clone, Default)]
pub struct MeetingFilter {
    pub operator_id: String,
    pub status: Option<MeetingStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: i64,
    pub per_page: i64,
}

impl MeetingFilter {
    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1) * self.per_page
    }
}

/// One page of results plus the total row count.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

/// Which reminder flag a reminder pass is working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderKind {
    DayBefore,
    HourBefore,
}

impl ReminderKind {
    /// How long before the meeting start the reminder is due.
    pub fn lead_time(&self) -> Duration {
        match self {
            ReminderKind::DayBefore => Duration::hours(24),
            ReminderKind::HourBefore => Duration::hours(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_week_is_sunday_to_thursday() {
        let week = AvailabilityDay::default_week("op-1");
        assert_eq!(week.len(), 7);
        let enabled: Vec<u8> = week.iter().filter(|d| d.enabled).map(|d| d.day_of_week).collect();
        assert_eq!(enabled, vec![0, 1, 2, 3, 4]);
        assert!(week.iter().all(|d| d.validate().is_ok()));
    }

    #[test]
    fn test_overlapping_intervals_are_rejected() {
        let day = AvailabilityDay {
            operator_id: "op-1".into(),
            day_of_week: 1,
            enabled: true,
            intervals: vec![TimeRange::hours(9, 12), TimeRange::hours(11, 15)],
        };
        assert!(day.validate().is_err());

        let split = AvailabilityDay {
            intervals: vec![TimeRange::hours(13, 17), TimeRange::hours(9, 12)],
            ..day
        };
        assert!(split.validate().is_ok());
    }

    #[test]
    fn test_recurring_time_off_repeats_yearly() {
        let time_off = TimeOff {
            id: "t".into(),
            operator_id: "op-1".into(),
            title: "National day".into(),
            reason: None,
            start_at: Utc.with_ymd_and_hms(2024, 9, 23, 0, 0, 0).unwrap(),
            end_at: Utc.with_ymd_and_hms(2024, 9, 24, 0, 0, 0).unwrap(),
            recurring: true,
        };
        let start = Utc.with_ymd_and_hms(2026, 9, 23, 10, 0, 0).unwrap();
        assert!(time_off.overlaps(start, start + Duration::minutes(30)));

        let other_day = Utc.with_ymd_and_hms(2026, 9, 25, 10, 0, 0).unwrap();
        assert!(!time_off.overlaps(other_day, other_day + Duration::minutes(30)));
    }

    #[test]
    fn test_recurring_time_off_never_applies_before_its_first_year() {
        let time_off = TimeOff {
            id: "t".into(),
            operator_id: "op-1".into(),
            title: "Year-end closure".into(),
            reason: None,
            start_at: Utc.with_ymd_and_hms(2027, 12, 24, 0, 0, 0).unwrap(),
            end_at: Utc.with_ymd_and_hms(2028, 1, 2, 0, 0, 0).unwrap(),
            recurring: true,
        };
        let blocked = |y, m, d| {
            let start = Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap();
            time_off.overlaps(start, start + Duration::minutes(30))
        };

        assert!(!blocked(2025, 12, 25));
        assert!(!blocked(2026, 12, 25));
        assert!(!blocked(2027, 1, 1));
        assert!(blocked(2027, 12, 25));
        assert!(blocked(2028, 1, 1));
        assert!(blocked(2028, 12, 25));
        // The 2028 repeat runs into the next January.
        assert!(blocked(2029, 1, 1));
        assert!(!blocked(2029, 1, 3));
    }

    #[test]
    fn test_status_round_trips_through_strings() {
        for status in [
            MeetingStatus::Confirmed,
            MeetingStatus::Rescheduled,
            MeetingStatus::Cancelled,
            MeetingStatus::Completed,
            MeetingStatus::NoShow,
        ] {
            assert_eq!(status.as_str().parse::<MeetingStatus>().unwrap(), status);
        }
        assert!(MeetingStatus::Rescheduled.is_active());
        assert!(MeetingStatus::NoShow.is_terminal());
    }
}
