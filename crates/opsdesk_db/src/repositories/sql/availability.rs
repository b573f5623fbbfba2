use super::rows::{bool_int, flag};
use super::SqlStore;
use crate::error::DbError;
use crate::repositories::availability::AvailabilityRepository;
use opsdesk_common::models::{AvailabilityDay, TimeRange};
use sqlx::any::AnyRow;
use sqlx::Row;
use tracing::{error, info};

fn day_from_row(row: &AnyRow) -> Result<AvailabilityDay, DbError> {
    let day: i64 = row.try_get("day_of_week")?;
    let raw_intervals: String = row.try_get("intervals")?;
    let intervals: Vec<TimeRange> = serde_json::from_str(&raw_intervals)?;
    Ok(AvailabilityDay {
        operator_id: row.try_get("operator_id")?,
        day_of_week: u8::try_from(day)
            .map_err(|_| DbError::DecodeError(format!("day_of_week out of range: {day}")))?,
        enabled: flag(row, "enabled")?,
        intervals,
    })
}

const INSERT_DAY: &str = "INSERT INTO operator_availability \
    (operator_id, day_of_week, enabled, intervals) VALUES ($1, $2, $3, $4)";

impl AvailabilityRepository for SqlStore {
    async fn get_availability(&self, operator_id: &str) -> Result<Vec<AvailabilityDay>, DbError> {
        let rows = sqlx::query(
            "SELECT operator_id, day_of_week, enabled, intervals FROM operator_availability \
             WHERE operator_id = $1 ORDER BY day_of_week",
        )
        .bind(operator_id)
        .fetch_all(self.db_client.pool())
        .await
        .map_err(|e| {
            error!("Failed to load availability: {}", e);
            DbError::QueryError(e.to_string())
        })?;
        rows.iter().map(day_from_row).collect()
    }

    async fn get_or_init_availability(
        &self,
        operator_id: &str,
        defaults: Vec<AvailabilityDay>,
    ) -> Result<Vec<AvailabilityDay>, DbError> {
        let existing = self.get_availability(operator_id).await?;
        if !existing.is_empty() {
            return Ok(existing);
        }

        let mut seeded = 0;
        for day in &defaults {
            let intervals = serde_json::to_string(&day.intervals)?;
            seeded += sqlx::query(&format!("{INSERT_DAY} ON CONFLICT DO NOTHING"))
                .bind(operator_id)
                .bind(i64::from(day.day_of_week))
                .bind(bool_int(day.enabled))
                .bind(intervals)
                .execute(self.db_client.pool())
                .await
                .map_err(|e| DbError::QueryError(e.to_string()))?
                .rows_affected();
        }
        if seeded > 0 {
            info!("Seeded default weekly availability for operator {}", operator_id);
        }
        self.get_availability(operator_id).await
    }

    async fn replace_availability(
        &self,
        operator_id: &str,
        days: Vec<AvailabilityDay>,
    ) -> Result<Vec<AvailabilityDay>, DbError> {
        let mut tx = self
            .db_client
            .pool()
            .begin()
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;

        sqlx::query("DELETE FROM operator_availability WHERE operator_id = $1")
            .bind(operator_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;

        for day in &days {
            let intervals = serde_json::to_string(&day.intervals)?;
            sqlx::query(INSERT_DAY)
                .bind(operator_id)
                .bind(i64::from(day.day_of_week))
                .bind(bool_int(day.enabled))
                .bind(intervals)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    error!("Failed to store availability day: {}", e);
                    DbError::QueryError(e.to_string())
                })?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;
        info!("Replaced weekly availability for operator {}", operator_id);
        self.get_availability(operator_id).await
    }
}
