use super::rows::{bool_int, flag};
use super::SqlStore;
use crate::error::DbError;
use crate::repositories::operator::OperatorRepository;
use opsdesk_common::models::OperatorProfile;
use sqlx::Row;
use tracing::debug;

impl OperatorRepository for SqlStore {
    async fn upsert_operator(&self, profile: OperatorProfile) -> Result<(), DbError> {
        debug!("Upserting operator {}", profile.id);
        sqlx::query(
            "INSERT INTO operators (id, display_name, email, active) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (id) DO UPDATE SET display_name = excluded.display_name, \
             email = excluded.email, active = excluded.active",
        )
        .bind(profile.id.as_str())
        .bind(profile.display_name.as_str())
        .bind(profile.email.as_str())
        .bind(bool_int(profile.active))
        .execute(self.db_client.pool())
        .await
        .map_err(|e| DbError::QueryError(e.to_string()))?;
        Ok(())
    }

    async fn find_operator(&self, operator_id: &str) -> Result<Option<OperatorProfile>, DbError> {
        let row = sqlx::query("SELECT id, display_name, email, active FROM operators WHERE id = $1")
            .bind(operator_id)
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;

        match row {
            Some(row) => Ok(Some(OperatorProfile {
                id: row.try_get("id")?,
                display_name: row.try_get("display_name")?,
                email: row.try_get("email")?,
                active: flag(&row, "active")?,
            })),
            None => Ok(None),
        }
    }
}
