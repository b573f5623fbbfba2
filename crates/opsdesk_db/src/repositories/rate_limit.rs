use crate::error::DbError;
use chrono::{DateTime, Utc};
use opsdesk_common::models::RateLimitWindow;
use std::future::Future;

/// Fixed-window counters keyed by client IP. A window is live while `now < window_end`.
pub trait RateLimitRepository {
    /// Removes windows whose end has passed. Returns how many were removed.
    fn purge_expired_windows(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, DbError>> + Send;

    fn find_live_window(
        &self,
        ip: &str,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Option<RateLimitWindow>, DbError>> + Send;

    /// Increments the live window only while its count is below `cap`.
    /// Returns `false` when there is no live window or it is already full.
    fn increment_live_window(
        &self,
        ip: &str,
        now: DateTime<Utc>,
        cap: i64,
    ) -> impl Future<Output = Result<bool, DbError>> + Send;

    /// Opens a window with a count of 1. Returns `false` if another live
    /// window for the IP won the race.
    fn open_window(
        &self,
        ip: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, DbError>> + Send;
}
