// Row decoding helpers shared by the SQL repositories.

use crate::error::DbError;
use chrono::{DateTime, TimeZone, Utc};
use opsdesk_common::models::{
    ActorKind, IssuedToken, Meeting, MeetingStatus, MeetingTokens,
};
use sqlx::any::AnyRow;
use sqlx::{Any, Decode, Row, Type, ValueRef};
use std::str::FromStr;

pub(super) const ACTIVE_STATUSES_SQL: &str = "('confirmed', 'rescheduled')";

pub(super) const MEETING_COLUMNS: &str = "id, operator_id, meeting_type_id, client_name, \
    client_email, client_phone, client_company, subject, notes, start_at, end_at, \
    duration_minutes, timezone, status, view_token, view_token_expires_at, cancel_token, \
    cancel_token_expires_at, reschedule_token, reschedule_token_expires_at, reschedule_count, \
    original_start_at, cancelled_at, cancelled_by, cancellation_reason, rescheduled_at, \
    rescheduled_by, reschedule_reason, reminder_24h_sent, reminder_1h_sent, source, request_ip, \
    user_agent, dedupe_key, calendar_event_id, created_at, updated_at";

pub(super) fn from_secs(secs: i64, column: &str) -> Result<DateTime<Utc>, DbError> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| DbError::DecodeError(format!("{column}: invalid timestamp {secs}")))
}

pub(super) fn ts(row: &AnyRow, column: &str) -> Result<DateTime<Utc>, DbError> {
    let secs: i64 = row.try_get(column)?;
    from_secs(secs, column)
}

/// Nullable column. The `Any` driver refuses to decode NULL into `Option<T>`,
/// so NULL is checked on the raw value first.
pub(super) fn opt<'r, T>(row: &'r AnyRow, column: &str) -> Result<Option<T>, DbError>
where
    T: Decode<'r, Any> + Type<Any>,
{
    if row.try_get_raw(column)?.is_null() {
        return Ok(None);
    }
    Ok(Some(row.try_get(column)?))
}

pub(super) fn opt_ts(row: &AnyRow, column: &str) -> Result<Option<DateTime<Utc>>, DbError> {
    let secs: Option<i64> = opt(row, column)?;
    secs.map(|s| from_secs(s, column)).transpose()
}

pub(super) fn flag(row: &AnyRow, column: &str) -> Result<bool, DbError> {
    let value: i64 = row.try_get(column)?;
    Ok(value != 0)
}

pub(super) fn parsed<T: FromStr<Err = String>>(row: &AnyRow, column: &str) -> Result<T, DbError> {
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(DbError::DecodeError)
}

pub(super) fn opt_parsed<T: FromStr<Err = String>>(
    row: &AnyRow,
    column: &str,
) -> Result<Option<T>, DbError> {
    let raw: Option<String> = opt(row, column)?;
    raw.map(|r| r.parse().map_err(DbError::DecodeError)).transpose()
}

pub(super) fn bool_int(value: bool) -> i64 {
    i64::from(value)
}

pub(super) fn meeting_from_row(row: &AnyRow) -> Result<Meeting, DbError> {
    let status: MeetingStatus = parsed(row, "status")?;
    let cancelled_by: Option<ActorKind> = opt_parsed(row, "cancelled_by")?;
    let rescheduled_by: Option<ActorKind> = opt_parsed(row, "rescheduled_by")?;

    Ok(Meeting {
        id: row.try_get("id")?,
        operator_id: row.try_get("operator_id")?,
        meeting_type_id: opt(row, "meeting_type_id")?,
        client_name: row.try_get("client_name")?,
        client_email: row.try_get("client_email")?,
        client_phone: opt(row, "client_phone")?,
        client_company: opt(row, "client_company")?,
        subject: row.try_get("subject")?,
        notes: opt(row, "notes")?,
        start_at: ts(row, "start_at")?,
        end_at: ts(row, "end_at")?,
        duration_minutes: row.try_get("duration_minutes")?,
        timezone: row.try_get("timezone")?,
        status,
        tokens: MeetingTokens {
            view: IssuedToken {
                token: row.try_get("view_token")?,
                expires_at: ts(row, "view_token_expires_at")?,
            },
            cancel: IssuedToken {
                token: row.try_get("cancel_token")?,
                expires_at: ts(row, "cancel_token_expires_at")?,
            },
            reschedule: IssuedToken {
                token: row.try_get("reschedule_token")?,
                expires_at: ts(row, "reschedule_token_expires_at")?,
            },
        },
        reschedule_count: row.try_get("reschedule_count")?,
        original_start_at: opt_ts(row, "original_start_at")?,
        cancelled_at: opt_ts(row, "cancelled_at")?,
        cancelled_by,
        cancellation_reason: opt(row, "cancellation_reason")?,
        rescheduled_at: opt_ts(row, "rescheduled_at")?,
        rescheduled_by,
        reschedule_reason: opt(row, "reschedule_reason")?,
        reminder_24h_sent: flag(row, "reminder_24h_sent")?,
        reminder_1h_sent: flag(row, "reminder_1h_sent")?,
        source: row.try_get("source")?,
        request_ip: opt(row, "request_ip")?,
        user_agent: opt(row, "user_agent")?,
        dedupe_key: opt(row, "dedupe_key")?,
        calendar_event_id: opt(row, "calendar_event_id")?,
        created_at: ts(row, "created_at")?,
        updated_at: ts(row, "updated_at")?,
    })
}
