use super::rows::ts;
use super::SqlStore;
use crate::error::DbError;
use crate::repositories::rate_limit::RateLimitRepository;
use chrono::{DateTime, Utc};
use opsdesk_common::models::RateLimitWindow;
use sqlx::Row;
use tracing::debug;

impl RateLimitRepository for SqlStore {
    async fn purge_expired_windows(&self, now: DateTime<Utc>) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM rate_limit_windows WHERE window_end <= $1")
            .bind(now.timestamp())
            .execute(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;
        if result.rows_affected() > 0 {
            debug!("Purged {} expired rate limit windows", result.rows_affected());
        }
        Ok(result.rows_affected())
    }

    async fn find_live_window(
        &self,
        ip: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<RateLimitWindow>, DbError> {
        let row = sqlx::query(
            "SELECT ip, request_count, window_start, window_end FROM rate_limit_windows \
             WHERE ip = $1 AND window_end > $2",
        )
        .bind(ip)
        .bind(now.timestamp())
        .fetch_optional(self.db_client.pool())
        .await
        .map_err(|e| DbError::QueryError(e.to_string()))?;

        match row {
            Some(row) => Ok(Some(RateLimitWindow {
                ip: row.try_get("ip")?,
                request_count: row.try_get("request_count")?,
                window_start: ts(&row, "window_start")?,
                window_end: ts(&row, "window_end")?,
            })),
            None => Ok(None),
        }
    }

    async fn increment_live_window(
        &self,
        ip: &str,
        now: DateTime<Utc>,
        cap: i64,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            "UPDATE rate_limit_windows SET request_count = request_count + 1 \
             WHERE ip = $1 AND window_end > $2 AND request_count < $3",
        )
        .bind(ip)
        .bind(now.timestamp())
        .bind(cap)
        .execute(self.db_client.pool())
        .await
        .map_err(|e| DbError::QueryError(e.to_string()))?;
        Ok(result.rows_affected() == 1)
    }

    async fn open_window(
        &self,
        ip: &str,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Result<bool, DbError> {
        // A leftover expired row for this IP is replaced; a live one wins.
        let result = sqlx::query(
            "INSERT INTO rate_limit_windows (ip, request_count, window_start, window_end) \
             VALUES ($1, 1, $2, $3) \
             ON CONFLICT (ip) DO UPDATE SET request_count = 1, \
             window_start = excluded.window_start, window_end = excluded.window_end \
             WHERE rate_limit_windows.window_end <= excluded.window_start",
        )
        .bind(ip)
        .bind(window_start.timestamp())
        .bind(window_end.timestamp())
        .execute(self.db_client.pool())
        .await
        .map_err(|e| DbError::QueryError(e.to_string()))?;
        Ok(result.rows_affected() == 1)
    }
}
