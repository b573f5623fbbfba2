use crate::error::DbError;
use opsdesk_common::models::AuditEntry;
use std::future::Future;

/// Append-only meeting audit log.
pub trait AuditRepository {
    fn append_audit(&self, entry: AuditEntry) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Entries for one meeting, oldest first.
    fn list_audit(
        &self,
        meeting_id: &str,
    ) -> impl Future<Output = Result<Vec<AuditEntry>, DbError>> + Send;
}
