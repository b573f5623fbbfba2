use super::rows::{bool_int, flag, opt, ts};
use super::SqlStore;
use crate::error::DbError;
use crate::repositories::time_off::TimeOffRepository;
use opsdesk_common::models::TimeOff;
use sqlx::any::AnyRow;
use sqlx::Row;
use tracing::{error, info};

fn time_off_from_row(row: &AnyRow) -> Result<TimeOff, DbError> {
    Ok(TimeOff {
        id: row.try_get("id")?,
        operator_id: row.try_get("operator_id")?,
        title: row.try_get("title")?,
        reason: opt(row, "reason")?,
        start_at: ts(row, "start_at")?,
        end_at: ts(row, "end_at")?,
        recurring: flag(row, "recurring")?,
    })
}

impl TimeOffRepository for SqlStore {
    async fn list_time_off(&self, operator_id: &str) -> Result<Vec<TimeOff>, DbError> {
        let rows = sqlx::query(
            "SELECT id, operator_id, title, reason, start_at, end_at, recurring \
             FROM operator_time_off WHERE operator_id = $1 ORDER BY start_at",
        )
        .bind(operator_id)
        .fetch_all(self.db_client.pool())
        .await
        .map_err(|e| {
            error!("Failed to load time off: {}", e);
            DbError::QueryError(e.to_string())
        })?;
        rows.iter().map(time_off_from_row).collect()
    }

    async fn create_time_off(&self, time_off: TimeOff) -> Result<TimeOff, DbError> {
        sqlx::query(
            "INSERT INTO operator_time_off (id, operator_id, title, reason, start_at, end_at, recurring) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(time_off.id.as_str())
        .bind(time_off.operator_id.as_str())
        .bind(time_off.title.as_str())
        .bind(time_off.reason.as_deref())
        .bind(time_off.start_at.timestamp())
        .bind(time_off.end_at.timestamp())
        .bind(bool_int(time_off.recurring))
        .execute(self.db_client.pool())
        .await
        .map_err(|e| {
            error!("Failed to create time off: {}", e);
            DbError::QueryError(e.to_string())
        })?;
        info!("Time off {} created for operator {}", time_off.id, time_off.operator_id);
        Ok(time_off)
    }

    async fn delete_time_off(&self, operator_id: &str, id: &str) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM operator_time_off WHERE id = $1 AND operator_id = $2")
            .bind(id)
            .bind(operator_id)
            .execute(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;
        Ok(result.rows_affected() == 1)
    }
}
