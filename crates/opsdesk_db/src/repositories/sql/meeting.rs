use super::rows::{bool_int, meeting_from_row, ACTIVE_STATUSES_SQL, MEETING_COLUMNS};
use super::SqlStore;
use crate::error::DbError;
use crate::repositories::meeting::{
    Buffers, MeetingRepository, RescheduleWrite, StatusChange, WriteOutcome,
};
use chrono::{DateTime, Utc};
use opsdesk_common::models::{Meeting, MeetingFilter, MeetingStatus, Page, ReminderKind};
use sqlx::any::AnyArguments;
use sqlx::query::Query;
use sqlx::{Any, Row};
use tracing::{debug, error, info};

type AnyQuery<'q> = Query<'q, Any, AnyArguments<'q>>;

/// Binds every meeting column in `MEETING_COLUMNS` order ($1..$37).
fn bind_meeting<'q>(query: AnyQuery<'q>, m: &'q Meeting) -> AnyQuery<'q> {
    query
        .bind(m.id.as_str())
        .bind(m.operator_id.as_str())
        .bind(m.meeting_type_id.as_deref())
        .bind(m.client_name.as_str())
        .bind(m.client_email.as_str())
        .bind(m.client_phone.as_deref())
        .bind(m.client_company.as_deref())
        .bind(m.subject.as_str())
        .bind(m.notes.as_deref())
        .bind(m.start_at.timestamp())
        .bind(m.end_at.timestamp())
        .bind(m.duration_minutes)
        .bind(m.timezone.as_str())
        .bind(m.status.as_str())
        .bind(m.tokens.view.token.as_str())
        .bind(m.tokens.view.expires_at.timestamp())
        .bind(m.tokens.cancel.token.as_str())
        .bind(m.tokens.cancel.expires_at.timestamp())
        .bind(m.tokens.reschedule.token.as_str())
        .bind(m.tokens.reschedule.expires_at.timestamp())
        .bind(m.reschedule_count)
        .bind(m.original_start_at.map(|t| t.timestamp()))
        .bind(m.cancelled_at.map(|t| t.timestamp()))
        .bind(m.cancelled_by.map(|a| a.as_str()))
        .bind(m.cancellation_reason.as_deref())
        .bind(m.rescheduled_at.map(|t| t.timestamp()))
        .bind(m.rescheduled_by.map(|a| a.as_str()))
        .bind(m.reschedule_reason.as_deref())
        .bind(bool_int(m.reminder_24h_sent))
        .bind(bool_int(m.reminder_1h_sent))
        .bind(m.source.as_str())
        .bind(m.request_ip.as_deref())
        .bind(m.user_agent.as_deref())
        .bind(m.dedupe_key.as_deref())
        .bind(m.calendar_event_id.as_deref())
        .bind(m.created_at.timestamp())
        .bind(m.updated_at.timestamp())
}

fn reminder_column(kind: ReminderKind) -> &'static str {
    match kind {
        ReminderKind::DayBefore => "reminder_24h_sent",
        ReminderKind::HourBefore => "reminder_1h_sent",
    }
}

fn status_list(statuses: &[MeetingStatus]) -> String {
    let quoted: Vec<String> = statuses.iter().map(|s| format!("'{}'", s.as_str())).collect();
    format!("({})", quoted.join(", "))
}

fn bind_filters<'q>(mut query: AnyQuery<'q>, filter: &MeetingFilter) -> AnyQuery<'q> {
    query = query.bind(filter.operator_id.clone());
    if let Some(status) = filter.status {
        query = query.bind(status.as_str());
    }
    if let Some(from) = filter.from {
        query = query.bind(from.timestamp());
    }
    if let Some(to) = filter.to {
        query = query.bind(to.timestamp());
    }
    query
}

impl SqlStore {
    async fn fetch_meetings(&self, query: AnyQuery<'_>) -> Result<Vec<Meeting>, DbError> {
        let rows = query.fetch_all(self.db_client.pool()).await.map_err(|e| {
            error!("Failed to query meetings: {}", e);
            DbError::QueryError(e.to_string())
        })?;
        rows.iter().map(meeting_from_row).collect()
    }
}

impl MeetingRepository for SqlStore {
    async fn insert_meeting_guarded(
        &self,
        meeting: Meeting,
        buffers: Buffers,
    ) -> Result<WriteOutcome, DbError> {
        debug!(
            "Inserting meeting {} for operator {} at {}",
            meeting.id, meeting.operator_id, meeting.start_at
        );
        let (lo, hi) = buffers.conflict_bounds(meeting.start_at, meeting.end_at);

        let placeholders: Vec<String> = (1..=37).map(|i| format!("${i}")).collect();
        let sql = format!(
            "INSERT INTO meetings ({MEETING_COLUMNS}) SELECT {} \
             WHERE NOT EXISTS (SELECT 1 FROM meetings WHERE operator_id = $2 \
             AND status IN {ACTIVE_STATUSES_SQL} AND start_at < $38 AND end_at > $39)",
            placeholders.join(", ")
        );

        let result = bind_meeting(sqlx::query(&sql), &meeting)
            .bind(hi.timestamp())
            .bind(lo.timestamp())
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to insert meeting: {}", e);
                DbError::QueryError(e.to_string())
            })?;

        if result.rows_affected() == 1 {
            info!("Meeting {} stored", meeting.id);
            Ok(WriteOutcome::Written)
        } else {
            debug!("Meeting {} rejected by conflict guard", meeting.id);
            Ok(WriteOutcome::Conflict)
        }
    }

    async fn find_meeting(&self, meeting_id: &str) -> Result<Option<Meeting>, DbError> {
        let sql = format!("SELECT {MEETING_COLUMNS} FROM meetings WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(meeting_id)
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to find meeting: {}", e);
                DbError::QueryError(e.to_string())
            })?;
        row.as_ref().map(meeting_from_row).transpose()
    }

    async fn find_by_dedupe_key(
        &self,
        operator_id: &str,
        dedupe_key: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<Meeting>, DbError> {
        let sql = format!(
            "SELECT {MEETING_COLUMNS} FROM meetings \
             WHERE operator_id = $1 AND dedupe_key = $2 AND created_at >= $3 \
             AND status IN {ACTIVE_STATUSES_SQL} \
             ORDER BY created_at DESC LIMIT 1"
        );
        let row = sqlx::query(&sql)
            .bind(operator_id)
            .bind(dedupe_key)
            .bind(since.timestamp())
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;
        row.as_ref().map(meeting_from_row).transpose()
    }

    async fn list_active_between(
        &self,
        operator_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Meeting>, DbError> {
        let sql = format!(
            "SELECT {MEETING_COLUMNS} FROM meetings \
             WHERE operator_id = $1 AND status IN {ACTIVE_STATUSES_SQL} \
             AND start_at < $2 AND end_at > $3 ORDER BY start_at"
        );
        self.fetch_meetings(
            sqlx::query(&sql)
                .bind(operator_id)
                .bind(to.timestamp())
                .bind(from.timestamp()),
        )
        .await
    }

    async fn count_active_starting_between(
        &self,
        operator_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64, DbError> {
        let sql = format!(
            "SELECT COUNT(*) AS n FROM meetings \
             WHERE operator_id = $1 AND status IN {ACTIVE_STATUSES_SQL} \
             AND start_at >= $2 AND start_at < $3"
        );
        let row = sqlx::query(&sql)
            .bind(operator_id)
            .bind(from.timestamp())
            .bind(to.timestamp())
            .fetch_one(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;
        Ok(row.try_get("n")?)
    }

    async fn list_meetings(&self, filter: MeetingFilter) -> Result<Page<Meeting>, DbError> {
        let mut conditions = vec!["operator_id = $1".to_string()];
        let mut next = 2;
        if filter.status.is_some() {
            conditions.push(format!("status = ${next}"));
            next += 1;
        }
        if filter.from.is_some() {
            conditions.push(format!("start_at >= ${next}"));
            next += 1;
        }
        if filter.to.is_some() {
            conditions.push(format!("start_at < ${next}"));
            next += 1;
        }
        let where_clause = conditions.join(" AND ");

        let count_sql = format!("SELECT COUNT(*) AS n FROM meetings WHERE {where_clause}");
        let list_sql = format!(
            "SELECT {MEETING_COLUMNS} FROM meetings WHERE {where_clause} \
             ORDER BY start_at DESC LIMIT ${} OFFSET ${}",
            next,
            next + 1
        );

        let total: i64 = bind_filters(sqlx::query(&count_sql), &filter)
            .fetch_one(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?
            .try_get("n")?;

        let items = self
            .fetch_meetings(
                bind_filters(sqlx::query(&list_sql), &filter)
                    .bind(filter.per_page)
                    .bind(filter.offset()),
            )
            .await?;

        Ok(Page {
            items,
            total,
            page: filter.page.max(1),
            per_page: filter.per_page,
        })
    }

    async fn reschedule_guarded(&self, write: RescheduleWrite) -> Result<WriteOutcome, DbError> {
        let (lo, hi) = write.buffers.conflict_bounds(write.new_start, write.new_end);
        let sql = format!(
            "UPDATE meetings SET start_at = $1, end_at = $2, status = 'rescheduled', \
             reschedule_count = reschedule_count + 1, \
             original_start_at = COALESCE(original_start_at, $3), \
             rescheduled_at = $4, rescheduled_by = $5, reschedule_reason = $6, \
             view_token = $7, view_token_expires_at = $8, \
             cancel_token = $9, cancel_token_expires_at = $10, \
             reschedule_token = $11, reschedule_token_expires_at = $12, \
             reminder_24h_sent = 0, reminder_1h_sent = 0, updated_at = $4 \
             WHERE id = $13 AND status IN {ACTIVE_STATUSES_SQL} AND reschedule_count = $14 \
             AND NOT EXISTS (SELECT 1 FROM meetings other WHERE other.operator_id = $15 \
             AND other.id <> $13 AND other.status IN {ACTIVE_STATUSES_SQL} \
             AND other.start_at < $16 AND other.end_at > $17)"
        );

        let result = sqlx::query(&sql)
            .bind(write.new_start.timestamp())
            .bind(write.new_end.timestamp())
            .bind(write.original_start.timestamp())
            .bind(write.at.timestamp())
            .bind(write.by.as_str())
            .bind(write.reason.as_deref())
            .bind(write.tokens.view.token.as_str())
            .bind(write.tokens.view.expires_at.timestamp())
            .bind(write.tokens.cancel.token.as_str())
            .bind(write.tokens.cancel.expires_at.timestamp())
            .bind(write.tokens.reschedule.token.as_str())
            .bind(write.tokens.reschedule.expires_at.timestamp())
            .bind(write.meeting_id.as_str())
            .bind(write.expected_count)
            .bind(write.operator_id.as_str())
            .bind(hi.timestamp())
            .bind(lo.timestamp())
            .execute(self.db_client.pool())
            .await
            .map_err(|e| {
                error!("Failed to reschedule meeting: {}", e);
                DbError::QueryError(e.to_string())
            })?;

        if result.rows_affected() == 1 {
            info!("Meeting {} moved to {}", write.meeting_id, write.new_start);
            return Ok(WriteOutcome::Written);
        }

        // Tell a lost race on the row apart from a slot conflict.
        match self.find_meeting(&write.meeting_id).await? {
            Some(current)
                if current.status.is_active() && current.reschedule_count == write.expected_count =>
            {
                Ok(WriteOutcome::Conflict)
            }
            _ => Ok(WriteOutcome::Stale),
        }
    }

    async fn transition_status(&self, change: StatusChange) -> Result<WriteOutcome, DbError> {
        let from = status_list(&change.from);
        let result = if change.to == MeetingStatus::Cancelled {
            let sql = format!(
                "UPDATE meetings SET status = $1, cancelled_at = $2, cancelled_by = $3, \
                 cancellation_reason = $4, updated_at = $2 WHERE id = $5 AND status IN {from}"
            );
            sqlx::query(&sql)
                .bind(change.to.as_str())
                .bind(change.at.timestamp())
                .bind(change.by.as_str())
                .bind(change.reason.as_deref())
                .bind(change.meeting_id.as_str())
                .execute(self.db_client.pool())
                .await
        } else {
            let sql = format!(
                "UPDATE meetings SET status = $1, updated_at = $2 WHERE id = $3 AND status IN {from}"
            );
            sqlx::query(&sql)
                .bind(change.to.as_str())
                .bind(change.at.timestamp())
                .bind(change.meeting_id.as_str())
                .execute(self.db_client.pool())
                .await
        }
        .map_err(|e| {
            error!("Failed to change meeting status: {}", e);
            DbError::QueryError(e.to_string())
        })?;

        if result.rows_affected() == 1 {
            info!("Meeting {} is now {}", change.meeting_id, change.to);
            Ok(WriteOutcome::Written)
        } else {
            Ok(WriteOutcome::Stale)
        }
    }

    async fn set_calendar_event_id(
        &self,
        meeting_id: &str,
        event_id: Option<String>,
    ) -> Result<(), DbError> {
        sqlx::query("UPDATE meetings SET calendar_event_id = $1 WHERE id = $2")
            .bind(event_id)
            .bind(meeting_id)
            .execute(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;
        Ok(())
    }

    async fn due_for_reminder(
        &self,
        kind: ReminderKind,
        now: DateTime<Utc>,
    ) -> Result<Vec<Meeting>, DbError> {
        let column = reminder_column(kind);
        let sql = format!(
            "SELECT {MEETING_COLUMNS} FROM meetings \
             WHERE status IN {ACTIVE_STATUSES_SQL} AND {column} = 0 \
             AND start_at > $1 AND start_at <= $2 ORDER BY start_at"
        );
        self.fetch_meetings(
            sqlx::query(&sql)
                .bind(now.timestamp())
                .bind((now + kind.lead_time()).timestamp()),
        )
        .await
    }

    async fn mark_reminder_sent(
        &self,
        meeting_id: &str,
        kind: ReminderKind,
    ) -> Result<bool, DbError> {
        let column = reminder_column(kind);
        let sql = format!("UPDATE meetings SET {column} = 1 WHERE id = $1 AND {column} = 0");
        let result = sqlx::query(&sql)
            .bind(meeting_id)
            .execute(self.db_client.pool())
            .await
            .map_err(|e| DbError::QueryError(e.to_string()))?;
        Ok(result.rows_affected() == 1)
    }
}
