// --- File: crates/opsdesk_meetings/src/models.rs ---
// Request and response bodies of the public and operator surfaces.

use chrono::{DateTime, Utc};
use opsdesk_common::models::{
    AuditEntry, AvailabilityDay, Meeting, MeetingStatus, NoticeUnit, OperatorMeetingSettings,
    OperatorProfile, TimeOff, TimeRange,
};
use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::{IntoParams, ToSchema};

// --- Slots ---

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(IntoParams, ToSchema))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct SlotsQuery {
    /// First day, YYYY-MM-DD, in the operator's timezone
    #[cfg_attr(feature = "openapi", schema(format = "date", example = "2025-06-01"))]
    pub start_date: String,
    /// Last day (inclusive), YYYY-MM-DD
    #[cfg_attr(feature = "openapi", schema(format = "date", example = "2025-06-05"))]
    pub end_date: String,
    /// Slot length in minutes; defaults to the operator's setting
    #[cfg_attr(feature = "openapi", schema(example = 30))]
    pub duration: Option<i64>,
}

/// One bookable window.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Slot {
    pub datetime: DateTime<Utc>,
    pub duration: i64,
    #[cfg_attr(feature = "openapi", schema(example = "Sunday, June 1, 2025"))]
    pub formatted_date: String,
    #[cfg_attr(feature = "openapi", schema(example = "09:00"))]
    pub formatted_time: String,
}

impl Slot {
    pub fn end(&self) -> DateTime<Utc> {
        self.datetime + chrono::Duration::minutes(self.duration)
    }
}

#[derive(Serialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct OperatorInfo {
    pub id: String,
    pub display_name: String,
}

impl From<&OperatorProfile> for OperatorInfo {
    fn from(profile: &OperatorProfile) -> Self {
        Self {
            id: profile.id.clone(),
            display_name: profile.display_name.clone(),
        }
    }
}

/// The subset of operator settings the booking page needs.
#[derive(Serialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct SettingsEcho {
    pub slot_duration_minutes: i64,
    pub timezone: String,
    pub buffer_before_minutes: i64,
    pub buffer_after_minutes: i64,
    pub max_days_in_advance: i64,
    pub min_notice_value: i64,
    pub min_notice_unit: NoticeUnit,
    pub accepting_meetings: bool,
    pub welcome_message: Option<String>,
    pub meeting_title: Option<String>,
}

impl From<&OperatorMeetingSettings> for SettingsEcho {
    fn from(settings: &OperatorMeetingSettings) -> Self {
        Self {
            slot_duration_minutes: settings.slot_duration_minutes,
            timezone: settings.timezone.clone(),
            buffer_before_minutes: settings.buffer_before_minutes,
            buffer_after_minutes: settings.buffer_after_minutes,
            max_days_in_advance: settings.max_days_in_advance,
            min_notice_value: settings.min_notice_value,
            min_notice_unit: settings.min_notice_unit,
            accepting_meetings: settings.accepting_meetings,
            welcome_message: settings.welcome_message.clone(),
            meeting_title: settings.meeting_title.clone(),
        }
    }
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct SlotsResponse {
    pub success: bool,
    pub operator: OperatorInfo,
    pub settings: SettingsEcho,
    pub slots: Vec<Slot>,
}

// --- Booking ---

#[derive(Deserialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct BookMeetingRequest {
    #[cfg_attr(feature = "openapi", schema(example = "2025-06-01T09:00:00+03:00"))]
    pub datetime: DateTime<Utc>,
    #[cfg_attr(feature = "openapi", schema(example = 30))]
    pub duration: i64,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub client_company: Option<String>,
    pub subject: String,
    pub notes: Option<String>,
    pub meeting_type_id: Option<String>,
    /// Anti-automation token, checked when verification is configured
    pub turnstile_token: Option<String>,
    /// Collapses repeated submissions; derived from the request when absent
    pub idempotency_key: Option<String>,
    /// Channel the booking came from, e.g. "booking_page"
    pub source: Option<String>,
}

/// Client-safe view of a meeting.
#[derive(Serialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct MeetingSummary {
    pub id: String,
    pub operator_id: String,
    pub subject: String,
    pub client_name: String,
    pub client_email: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub duration_minutes: i64,
    pub timezone: String,
    pub status: MeetingStatus,
    pub reschedule_count: i64,
    pub original_start_at: Option<DateTime<Utc>>,
}

impl From<&Meeting> for MeetingSummary {
    fn from(meeting: &Meeting) -> Self {
        Self {
            id: meeting.id.clone(),
            operator_id: meeting.operator_id.clone(),
            subject: meeting.subject.clone(),
            client_name: meeting.client_name.clone(),
            client_email: meeting.client_email.clone(),
            start_at: meeting.start_at,
            end_at: meeting.end_at,
            duration_minutes: meeting.duration_minutes,
            timezone: meeting.timezone.clone(),
            status: meeting.status,
            reschedule_count: meeting.reschedule_count,
            original_start_at: meeting.original_start_at,
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ActionLinks {
    pub view_url: String,
    pub cancel_url: String,
    pub reschedule_url: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct CalendarLinks {
    pub google: String,
    pub outlook: String,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct BookingResponse {
    pub success: bool,
    /// `true` when an earlier submission with the same idempotency key was returned
    pub duplicate: bool,
    pub meeting: MeetingSummary,
    pub links: ActionLinks,
    pub calendar_links: CalendarLinks,
}

/// What `book` produced: the stored meeting and whether it already existed.
#[derive(Debug, Clone)]
pub struct BookingOutcome {
    pub meeting: Meeting,
    pub duplicate: bool,
}

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct CancelRequest {
    pub token: String,
    pub reason: Option<String>,
}

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct RescheduleRequest {
    pub token: String,
    pub new_datetime: DateTime<Utc>,
    pub reason: Option<String>,
}

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct TokenQuery {
    pub token: String,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct MeetingActionResponse {
    pub success: bool,
    pub meeting: MeetingSummary,
    /// Fresh links after a reschedule; earlier links stop working
    #[serde(skip_serializing_if = "Option::is_none")]
    pub links: Option<ActionLinks>,
}

// --- Operator surface ---

#[derive(Deserialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct SettingsUpdate {
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

impl SettingsUpdate {
    pub fn into_settings(self, operator_id: &str) -> OperatorMeetingSettings {
        OperatorMeetingSettings {
            operator_id: operator_id.to_string(),
            booking_slug: self.booking_slug.trim().to_lowercase(),
            slot_duration_minutes: self.slot_duration_minutes,
            buffer_before_minutes: self.buffer_before_minutes,
            buffer_after_minutes: self.buffer_after_minutes,
            max_days_in_advance: self.max_days_in_advance,
            min_notice_value: self.min_notice_value,
            min_notice_unit: self.min_notice_unit,
            max_meetings_per_day: self.max_meetings_per_day,
            accepting_meetings: self.accepting_meetings,
            timezone: self.timezone,
            welcome_message: self.welcome_message,
            meeting_title: self.meeting_title,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct DayInput {
    /// 0 = Sunday
    pub day_of_week: u8,
    pub enabled: bool,
    #[serde(default)]
    pub intervals: Vec<TimeRange>,
}

#[derive(Deserialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct AvailabilityUpdate {
    pub days: Vec<DayInput>,
}

#[derive(Deserialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct TimeOffRequest {
    pub title: String,
    pub reason: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    #[serde(default)]
    pub recurring: bool,
}

#[derive(Deserialize, Debug, Default)]
#[cfg_attr(feature = "openapi", derive(IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
pub struct MeetingListQuery {
    pub status: Option<MeetingStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Deserialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct StatusUpdateRequest {
    pub status: MeetingStatus,
    pub reason: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct OperatorCancelRequest {
    pub reason: Option<String>,
}

/// Operator view of a meeting: everything except the capability tokens.
#[derive(Serialize, Debug, Clone)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct MeetingView {
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
    pub reschedule_count: i64,
    pub original_start_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub rescheduled_at: Option<DateTime<Utc>>,
    pub reschedule_reason: Option<String>,
    pub source: String,
    pub calendar_event_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Meeting> for MeetingView {
    fn from(m: Meeting) -> Self {
        Self {
            id: m.id,
            operator_id: m.operator_id,
            meeting_type_id: m.meeting_type_id,
            client_name: m.client_name,
            client_email: m.client_email,
            client_phone: m.client_phone,
            client_company: m.client_company,
            subject: m.subject,
            notes: m.notes,
            start_at: m.start_at,
            end_at: m.end_at,
            duration_minutes: m.duration_minutes,
            timezone: m.timezone,
            status: m.status,
            reschedule_count: m.reschedule_count,
            original_start_at: m.original_start_at,
            cancelled_at: m.cancelled_at,
            cancellation_reason: m.cancellation_reason,
            rescheduled_at: m.rescheduled_at,
            reschedule_reason: m.reschedule_reason,
            source: m.source,
            calendar_event_id: m.calendar_event_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct MeetingListResponse {
    pub success: bool,
    pub items: Vec<MeetingView>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct MeetingDetailResponse {
    pub success: bool,
    pub meeting: MeetingView,
    pub audit: Vec<AuditEntry>,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct MeetingUpdatedResponse {
    pub success: bool,
    pub meeting: MeetingView,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct SettingsResponse {
    pub success: bool,
    pub settings: OperatorMeetingSettings,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct AvailabilityResponse {
    pub success: bool,
    /// All seven days, Sunday first
    pub days: Vec<AvailabilityDay>,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct TimeOffListResponse {
    pub success: bool,
    pub items: Vec<TimeOff>,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct TimeOffResponse {
    pub success: bool,
    pub time_off: TimeOff,
}

#[derive(Serialize, Debug)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct DeletedResponse {
    pub success: bool,
}
