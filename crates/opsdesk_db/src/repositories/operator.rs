use crate::error::DbError;
use opsdesk_common::models::OperatorProfile;
use std::future::Future;

/// The operator directory. User management lives elsewhere; this table only
/// answers "does this operator exist" and carries display info.
pub trait OperatorRepository {
    fn upsert_operator(
        &self,
        profile: OperatorProfile,
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    fn find_operator(
        &self,
        operator_id: &str,
    ) -> impl Future<Output = Result<Option<OperatorProfile>, DbError>> + Send;
}
