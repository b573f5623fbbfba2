use crate::error::DbError;
use opsdesk_common::models::AvailabilityDay;
use std::future::Future;

pub trait AvailabilityRepository {
    /// Rows ordered by day of week.
    fn get_availability(
        &self,
        operator_id: &str,
    ) -> impl Future<Output = Result<Vec<AvailabilityDay>, DbError>> + Send;

    /// Seeds any missing days from `defaults` and returns the full week.
    fn get_or_init_availability(
        &self,
        operator_id: &str,
        defaults: Vec<AvailabilityDay>,
    ) -> impl Future<Output = Result<Vec<AvailabilityDay>, DbError>> + Send;

    /// Replaces the operator's whole week.
    fn replace_availability(
        &self,
        operator_id: &str,
        days: Vec<AvailabilityDay>,
    ) -> impl Future<Output = Result<Vec<AvailabilityDay>, DbError>> + Send;
}
