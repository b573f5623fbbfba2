use crate::error::DbError;
use opsdesk_common::models::OperatorMeetingSettings;
use std::future::Future;

pub trait SettingsRepository {
    fn get_settings(
        &self,
        operator_id: &str,
    ) -> impl Future<Output = Result<Option<OperatorMeetingSettings>, DbError>> + Send;

    /// Inserts `defaults` unless a row exists, then returns whatever is stored.
    /// Concurrent first accesses converge on a single row.
    fn get_or_init_settings(
        &self,
        defaults: OperatorMeetingSettings,
    ) -> impl Future<Output = Result<OperatorMeetingSettings, DbError>> + Send;

    fn update_settings(
        &self,
        settings: OperatorMeetingSettings,
    ) -> impl Future<Output = Result<OperatorMeetingSettings, DbError>> + Send;
}
