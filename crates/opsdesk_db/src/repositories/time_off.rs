use crate::error::DbError;
use opsdesk_common::models::TimeOff;
use std::future::Future;

pub trait TimeOffRepository {
    /// All entries for the operator, recurring ones included, ordered by start.
    fn list_time_off(
        &self,
        operator_id: &str,
    ) -> impl Future<Output = Result<Vec<TimeOff>, DbError>> + Send;

    fn create_time_off(
        &self,
        time_off: TimeOff,
    ) -> impl Future<Output = Result<TimeOff, DbError>> + Send;

    /// `false` when no entry with that id belongs to the operator.
    fn delete_time_off(
        &self,
        operator_id: &str,
        id: &str,
    ) -> impl Future<Output = Result<bool, DbError>> + Send;
}
