use super::rows::{bool_int, flag, opt, opt_ts};
use super::SqlStore;
use crate::error::DbError;
use crate::repositories::calendar_account::CalendarAccountRepository;
use chrono::{DateTime, Utc};
use opsdesk_common::models::CalendarAccount;
use sqlx::Row;
use tracing::{error, info};

impl CalendarAccountRepository for SqlStore {
    async fn get_calendar_account(
        &self,
        operator_id: &str,
    ) -> Result<Option<CalendarAccount>, DbError> {
        let row = sqlx::query(
            "SELECT operator_id, provider_email, encrypted_refresh_token, calendar_id, \
             sync_enabled, last_synced_at, sync_error FROM calendar_accounts WHERE operator_id = $1",
        )
        .bind(operator_id)
        .fetch_optional(self.db_client.pool())
        .await
        .map_err(|e| DbError::QueryError(e.to_string()))?;

        match row {
            Some(row) => Ok(Some(CalendarAccount {
                operator_id: row.try_get("operator_id")?,
                provider_email: opt(&row, "provider_email")?,
                encrypted_refresh_token: row.try_get("encrypted_refresh_token")?,
                calendar_id: row.try_get("calendar_id")?,
                sync_enabled: flag(&row, "sync_enabled")?,
                last_synced_at: opt_ts(&row, "last_synced_at")?,
                sync_error: opt(&row, "sync_error")?,
            })),
            None => Ok(None),
        }
    }

    async fn upsert_calendar_account(&self, account: CalendarAccount) -> Result<(), DbError> {
        sqlx::query(
            "INSERT INTO calendar_accounts (operator_id, provider_email, encrypted_refresh_token, \
             calendar_id, sync_enabled, last_synced_at, sync_error) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (operator_id) DO UPDATE SET provider_email = excluded.provider_email, \
             encrypted_refresh_token = excluded.encrypted_refresh_token, \
             calendar_id = excluded.calendar_id, sync_enabled = excluded.sync_enabled, \
             last_synced_at = excluded.last_synced_at, sync_error = excluded.sync_error",
        )
        .bind(account.operator_id.as_str())
        .bind(account.provider_email.as_deref())
        .bind(account.encrypted_refresh_token.as_str())
        .bind(account.calendar_id.as_str())
        .bind(bool_int(account.sync_enabled))
        .bind(account.last_synced_at.map(|t| t.timestamp()))
        .bind(account.sync_error.as_deref())
        .execute(self.db_client.pool())
        .await
        .map_err(|e| {
            error!("Failed to store calendar account: {}", e);
            DbError::QueryError(e.to_string())
        })?;
        info!("Calendar account stored for operator {}", account.operator_id);
        Ok(())
    }

    async fn delete_calendar_account(&self, operator_id: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM calendar_accounts WHERE operator_id = $1")
            .bind(operator_id)
            .execute(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;
        Ok(result.rows_affected() == 1)
    }

    async fn record_sync_result(
        &self,
        operator_id: &str,
        error: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let query = match error {
            None => sqlx::query(
                "UPDATE calendar_accounts SET sync_error = NULL, last_synced_at = $1 \
                 WHERE operator_id = $2",
            )
            .bind(at.timestamp())
            .bind(operator_id),
            Some(message) => {
                sqlx::query("UPDATE calendar_accounts SET sync_error = $1 WHERE operator_id = $2")
                    .bind(message)
                    .bind(operator_id)
            }
        };
        query
            .execute(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;
        Ok(())
    }
}
