use super::rows::{opt, parsed, ts};
use super::SqlStore;
use crate::error::DbError;
use crate::repositories::audit::AuditRepository;
use opsdesk_common::models::AuditEntry;
use sqlx::Row;
use tracing::error;

impl AuditRepository for SqlStore {
    async fn append_audit(&self, entry: AuditEntry) -> Result<(), DbError> {
        let metadata = serde_json::to_string(&entry.metadata)?;
        sqlx::query(
            "INSERT INTO meeting_audit_log \
             (id, meeting_id, action, performed_by, actor_id, ip, user_agent, metadata, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(entry.id.as_str())
        .bind(entry.meeting_id.as_str())
        .bind(entry.action.as_str())
        .bind(entry.performed_by.as_str())
        .bind(entry.actor_id.as_deref())
        .bind(entry.ip.as_deref())
        .bind(entry.user_agent.as_deref())
        .bind(metadata)
        .bind(entry.created_at.timestamp())
        .execute(self.db_client.pool())
        .await
        .map_err(|e| {
            error!("Failed to append audit entry: {}", e);
            DbError::QueryError(e.to_string())
        })?;
        Ok(())
    }

    async fn list_audit(&self, meeting_id: &str) -> Result<Vec<AuditEntry>, DbError> {
        let rows = sqlx::query(
            "SELECT id, meeting_id, action, performed_by, actor_id, ip, user_agent, metadata, created_at \
             FROM meeting_audit_log WHERE meeting_id = $1 ORDER BY created_at, rowid",
        )
        .bind(meeting_id)
        .fetch_all(self.db_client.pool())
        .await
        .map_err(|e| DbError::QueryError(e.to_string()))?;

        rows.iter()
            .map(|row| -> Result<AuditEntry, DbError> {
                let metadata: String = row.try_get("metadata")?;
                Ok(AuditEntry {
                    id: row.try_get("id")?,
                    meeting_id: row.try_get("meeting_id")?,
                    action: row.try_get("action")?,
                    performed_by: parsed(row, "performed_by")?,
                    actor_id: opt(row, "actor_id")?,
                    ip: opt(row, "ip")?,
                    user_agent: opt(row, "user_agent")?,
                    metadata: serde_json::from_str(&metadata)?,
                    created_at: ts(row, "created_at")?,
                })
            })
            .collect()
    }
}
