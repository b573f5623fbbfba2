use crate::error::DbError;
use chrono::{DateTime, Utc};
use opsdesk_common::models::CalendarAccount;
use std::future::Future;

pub trait CalendarAccountRepository {
    fn get_calendar_account(
        &self,
        operator_id: &str,
    ) -> impl Future<Output = Result<Option<CalendarAccount>, DbError>> + Send;

    fn upsert_calendar_account(
        &self,
        account: CalendarAccount,
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    fn delete_calendar_account(
        &self,
        operator_id: &str,
    ) -> impl Future<Output = Result<bool, DbError>> + Send;

    /// Records the outcome of a sync call. `None` clears the last error and
    /// bumps `last_synced_at`; `Some` stores the error and leaves the timestamp.
    fn record_sync_result(
        &self,
        operator_id: &str,
        error: Option<String>,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), DbError>> + Send;
}
