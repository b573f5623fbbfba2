// --- File: crates/opsdesk_meetings/src/error.rs ---
//! Typed failures of the scheduling engine.
//!
//! Every core operation returns `Result<_, MeetingError>`. Each variant maps
//! to a stable machine code and an HTTP status, and renders as
//! `{"success": false, "code": ..., "message": ...}`.

use axum::http::{header::RETRY_AFTER, HeaderValue};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use opsdesk_codec::CodecError;
use opsdesk_common::models::MeetingStatus;
use opsdesk_common::{error_response, HttpStatusCode};
use opsdesk_db::DbError;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum MeetingError {
    // --- validation ---
    #[error("{0}")]
    Validation(String),
    #[error("Duration must be 15, 30 or 60 minutes (got {0})")]
    InvalidDuration(i64),
    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),
    #[error("Date range may span at most {max_days} days")]
    RangeTooLarge { max_days: i64 },

    // --- not found ---
    #[error("Operator not found")]
    OperatorNotFound,
    #[error("No meeting settings exist for this operator")]
    SettingsNotFound,
    #[error("Meeting not found")]
    MeetingNotFound,
    #[error("Time off entry not found")]
    TimeOffNotFound,
    #[error("No calendar is connected")]
    CalendarNotConnected,

    // --- preconditions ---
    #[error("This operator is not accepting meetings")]
    NotAcceptingMeetings,
    #[error("The daily limit of {limit} meetings has been reached")]
    DailyLimitReached { limit: i64 },
    #[error("The requested time slot is not available")]
    SlotUnavailable,
    #[error("Meetings must be booked at least {0} in advance")]
    NoticePeriodViolation(String),
    #[error("Meetings can be booked at most {max_days} days in advance")]
    BeyondBookingWindow { max_days: i64 },
    #[error("Meeting is already cancelled")]
    AlreadyCancelled,
    #[error("Meeting is already completed")]
    AlreadyCompleted,
    #[error("Cannot move a meeting from {from} to {to}")]
    InvalidStatusTransition { from: MeetingStatus, to: MeetingStatus },
    #[error("This meeting has already been rescheduled the maximum number of times")]
    MaxReschedulesReached,
    #[error("Meetings cannot be rescheduled less than 24 hours before they start")]
    TooLateToReschedule,

    // --- tokens ---
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token has expired")]
    TokenExpired,
    #[error("Token is not valid for this action")]
    TokenActionMismatch,

    #[error("Too many requests")]
    RateLimited { reset_at: DateTime<Utc> },

    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MeetingError {
    pub fn code(&self) -> &'static str {
        match self {
            MeetingError::Validation(_) => "VALIDATION_ERROR",
            MeetingError::InvalidDuration(_) => "INVALID_DURATION",
            MeetingError::InvalidDateRange(_) => "INVALID_DATE_RANGE",
            MeetingError::RangeTooLarge { .. } => "RANGE_TOO_LARGE",
            MeetingError::OperatorNotFound => "OPERATOR_NOT_FOUND",
            MeetingError::SettingsNotFound => "SETTINGS_NOT_FOUND",
            MeetingError::MeetingNotFound => "MEETING_NOT_FOUND",
            MeetingError::TimeOffNotFound => "TIME_OFF_NOT_FOUND",
            MeetingError::CalendarNotConnected => "CALENDAR_NOT_CONNECTED",
            MeetingError::NotAcceptingMeetings => "NOT_ACCEPTING_MEETINGS",
            MeetingError::DailyLimitReached { .. } => "DAILY_LIMIT_REACHED",
            MeetingError::SlotUnavailable => "SLOT_UNAVAILABLE",
            MeetingError::NoticePeriodViolation(_) => "NOTICE_PERIOD_VIOLATION",
            MeetingError::BeyondBookingWindow { .. } => "BEYOND_BOOKING_WINDOW",
            MeetingError::AlreadyCancelled => "MEETING_ALREADY_CANCELLED",
            MeetingError::AlreadyCompleted => "MEETING_ALREADY_COMPLETED",
            MeetingError::InvalidStatusTransition { .. } => "INVALID_STATUS_TRANSITION",
            MeetingError::MaxReschedulesReached => "MAX_RESCHEDULES_REACHED",
            MeetingError::TooLateToReschedule => "TOO_LATE_TO_RESCHEDULE",
            MeetingError::InvalidToken => "INVALID_TOKEN",
            MeetingError::TokenExpired => "TOKEN_EXPIRED",
            MeetingError::TokenActionMismatch => "TOKEN_ACTION_MISMATCH",
            MeetingError::RateLimited { .. } => "RATE_LIMITED",
            MeetingError::Storage(_) | MeetingError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// The error a meeting in `status` gets when asked to leave it.
    pub fn for_terminal(status: MeetingStatus, to: MeetingStatus) -> Self {
        match status {
            MeetingStatus::Cancelled => MeetingError::AlreadyCancelled,
            MeetingStatus::Completed => MeetingError::AlreadyCompleted,
            from => MeetingError::InvalidStatusTransition { from, to },
        }
    }
}

impl From<CodecError> for MeetingError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Expired => MeetingError::TokenExpired,
            CodecError::WrongAction { .. } => MeetingError::TokenActionMismatch,
            CodecError::Malformed | CodecError::BadSignature => MeetingError::InvalidToken,
            other => MeetingError::Internal(other.to_string()),
        }
    }
}

impl HttpStatusCode for MeetingError {
    fn status_code(&self) -> u16 {
        match self {
            MeetingError::Validation(_)
            | MeetingError::InvalidDuration(_)
            | MeetingError::InvalidDateRange(_)
            | MeetingError::RangeTooLarge { .. } => 400,
            MeetingError::InvalidToken
            | MeetingError::TokenExpired
            | MeetingError::TokenActionMismatch => 401,
            MeetingError::OperatorNotFound
            | MeetingError::SettingsNotFound
            | MeetingError::MeetingNotFound
            | MeetingError::TimeOffNotFound
            | MeetingError::CalendarNotConnected => 404,
            MeetingError::NotAcceptingMeetings
            | MeetingError::DailyLimitReached { .. }
            | MeetingError::SlotUnavailable
            | MeetingError::NoticePeriodViolation(_)
            | MeetingError::BeyondBookingWindow { .. }
            | MeetingError::AlreadyCancelled
            | MeetingError::AlreadyCompleted
            | MeetingError::InvalidStatusTransition { .. }
            | MeetingError::MaxReschedulesReached
            | MeetingError::TooLateToReschedule => 409,
            MeetingError::RateLimited { .. } => 429,
            MeetingError::Storage(_) | MeetingError::Internal(_) => 500,
        }
    }
}

impl IntoResponse for MeetingError {
    fn into_response(self) -> Response {
        let message = match &self {
            MeetingError::Storage(_) | MeetingError::Internal(_) => {
                error!("Meeting request failed: {}", self);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        let mut response = error_response(self.status_code(), self.code(), &message);

        if let MeetingError::RateLimited { reset_at } = &self {
            let seconds = (*reset_at - Utc::now()).num_seconds().max(1);
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }
        response
    }
}
