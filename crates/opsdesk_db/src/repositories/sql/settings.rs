use super::rows::{bool_int, flag, opt, parsed};
use super::SqlStore;
use crate::error::DbError;
use crate::repositories::settings::SettingsRepository;
use opsdesk_common::models::OperatorMeetingSettings;
use sqlx::any::AnyRow;
use sqlx::Row;
use tracing::{debug, error, info};

const SETTINGS_COLUMNS: &str = "operator_id, booking_slug, slot_duration_minutes, \
    buffer_before_minutes, buffer_after_minutes, max_days_in_advance, min_notice_value, \
    min_notice_unit, max_meetings_per_day, accepting_meetings, timezone, welcome_message, \
    meeting_title";

fn settings_from_row(row: &AnyRow) -> Result<OperatorMeetingSettings, DbError> {
    Ok(OperatorMeetingSettings {
        operator_id: row.try_get("operator_id")?,
        booking_slug: row.try_get("booking_slug")?,
        slot_duration_minutes: row.try_get("slot_duration_minutes")?,
        buffer_before_minutes: row.try_get("buffer_before_minutes")?,
        buffer_after_minutes: row.try_get("buffer_after_minutes")?,
        max_days_in_advance: row.try_get("max_days_in_advance")?,
        min_notice_value: row.try_get("min_notice_value")?,
        min_notice_unit: parsed(row, "min_notice_unit")?,
        max_meetings_per_day: row.try_get("max_meetings_per_day")?,
        accepting_meetings: flag(row, "accepting_meetings")?,
        timezone: row.try_get("timezone")?,
        welcome_message: opt(row, "welcome_message")?,
        meeting_title: opt(row, "meeting_title")?,
    })
}

impl SettingsRepository for SqlStore {
    async fn get_settings(
        &self,
        operator_id: &str,
    ) -> Result<Option<OperatorMeetingSettings>, DbError> {
        let sql =
            format!("SELECT {SETTINGS_COLUMNS} FROM operator_meeting_settings WHERE operator_id = $1");
        let row = sqlx::query(&sql)
            .bind(operator_id)
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to load settings: {}", e);
                DbError::QueryError(e.to_string())
            })?;
        row.as_ref().map(settings_from_row).transpose()
    }

    async fn get_or_init_settings(
        &self,
        defaults: OperatorMeetingSettings,
    ) -> Result<OperatorMeetingSettings, DbError> {
        let sql = format!(
            "INSERT INTO operator_meeting_settings ({SETTINGS_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             ON CONFLICT (operator_id) DO NOTHING"
        );
        let inserted = sqlx::query(&sql)
            .bind(defaults.operator_id.as_str())
            .bind(defaults.booking_slug.as_str())
            .bind(defaults.slot_duration_minutes)
            .bind(defaults.buffer_before_minutes)
            .bind(defaults.buffer_after_minutes)
            .bind(defaults.max_days_in_advance)
            .bind(defaults.min_notice_value)
            .bind(defaults.min_notice_unit.as_str())
            .bind(defaults.max_meetings_per_day)
            .bind(bool_int(defaults.accepting_meetings))
            .bind(defaults.timezone.as_str())
            .bind(defaults.welcome_message.as_deref())
            .bind(defaults.meeting_title.as_deref())
            .execute(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?
            .rows_affected();

        if inserted == 1 {
            info!("Seeded default meeting settings for operator {}", defaults.operator_id);
        }

        self.get_settings(&defaults.operator_id)
            .await?
            .ok_or_else(|| DbError::Other("settings row vanished after insert".to_string()))
    }

    async fn update_settings(
        &self,
        settings: OperatorMeetingSettings,
    ) -> Result<OperatorMeetingSettings, DbError> {
        debug!("Updating meeting settings for operator {}", settings.operator_id);
        let sql = format!(
            "INSERT INTO operator_meeting_settings ({SETTINGS_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             ON CONFLICT (operator_id) DO UPDATE SET \
             booking_slug = excluded.booking_slug, \
             slot_duration_minutes = excluded.slot_duration_minutes, \
             buffer_before_minutes = excluded.buffer_before_minutes, \
             buffer_after_minutes = excluded.buffer_after_minutes, \
             max_days_in_advance = excluded.max_days_in_advance, \
             min_notice_value = excluded.min_notice_value, \
             min_notice_unit = excluded.min_notice_unit, \
             max_meetings_per_day = excluded.max_meetings_per_day, \
             accepting_meetings = excluded.accepting_meetings, \
             timezone = excluded.timezone, \
             welcome_message = excluded.welcome_message, \
             meeting_title = excluded.meeting_title"
        );
        sqlx::query(&sql)
            .bind(settings.operator_id.as_str())
            .bind(settings.booking_slug.as_str())
            .bind(settings.slot_duration_minutes)
            .bind(settings.buffer_before_minutes)
            .bind(settings.buffer_after_minutes)
            .bind(settings.max_days_in_advance)
            .bind(settings.min_notice_value)
            .bind(settings.min_notice_unit.as_str())
            .bind(settings.max_meetings_per_day)
            .bind(bool_int(settings.accepting_meetings))
            .bind(settings.timezone.as_str())
            .bind(settings.welcome_message.as_deref())
            .bind(settings.meeting_title.as_deref())
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to update settings: {}", e);
                DbError::QueryError(e.to_string())
            })?;
        Ok(settings)
    }
}
