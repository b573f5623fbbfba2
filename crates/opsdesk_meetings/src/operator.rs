// --- File: crates/opsdesk_meetings/src/operator.rs ---
// Operator-side configuration and meeting queries: settings, weekly hours,
// time off, the meeting list and meeting detail with its audit trail.

use opsdesk_common::models::{
    AuditEntry, AvailabilityDay, Meeting, MeetingFilter, OperatorMeetingSettings, Page, TimeOff,
};
use opsdesk_config::MeetingsConfig;
use opsdesk_db::SchedulingStore;
use std::collections::BTreeSet;
use tracing::info;
use uuid::Uuid;

use crate::error::MeetingError;
use crate::models::{AvailabilityUpdate, MeetingListQuery, SettingsUpdate, TimeOffRequest};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Clone)]
pub struct OperatorService<S> {
    store: S,
    config: MeetingsConfig,
}

impl<S: SchedulingStore> OperatorService<S> {
    pub fn new(store: S, config: MeetingsConfig) -> Self {
        Self { store, config }
    }

    // --- Settings ---

    pub async fn settings(&self, operator_id: &str) -> Result<OperatorMeetingSettings, MeetingError> {
        let defaults = OperatorMeetingSettings::defaults(operator_id, &self.config.default_timezone);
        Ok(self.store.get_or_init_settings(defaults).await?)
    }

    pub async fn update_settings(
        &self,
        operator_id: &str,
        update: SettingsUpdate,
    ) -> Result<OperatorMeetingSettings, MeetingError> {
        let settings = update.into_settings(operator_id);
        settings.validate().map_err(MeetingError::Validation)?;
        // The row must exist before it can be updated.
        self.settings(operator_id).await?;
        let saved = self.store.update_settings(settings).await?;
        info!(operator_id, accepting = saved.accepting_meetings, "Meeting settings updated");
        Ok(saved)
    }

    // --- Weekly hours ---

    pub async fn availability(&self, operator_id: &str) -> Result<Vec<AvailabilityDay>, MeetingError> {
        Ok(self
            .store
            .get_or_init_availability(operator_id, AvailabilityDay::default_week(operator_id))
            .await?)
    }

    /// Replaces the whole week. Days left out of the update are disabled.
    pub async fn replace_availability(
        &self,
        operator_id: &str,
        update: AvailabilityUpdate,
    ) -> Result<Vec<AvailabilityDay>, MeetingError> {
        let mut seen = BTreeSet::new();
        for day in &update.days {
            if !seen.insert(day.day_of_week) {
                return Err(MeetingError::Validation(format!(
                    "day_of_week {} appears more than once",
                    day.day_of_week
                )));
            }
        }

        let mut week: Vec<AvailabilityDay> = (0..7u8)
            .map(|day_of_week| AvailabilityDay {
                operator_id: operator_id.to_string(),
                day_of_week,
                enabled: false,
                intervals: Vec::new(),
            })
            .collect();
        for input in update.days {
            let day = AvailabilityDay {
                operator_id: operator_id.to_string(),
                day_of_week: input.day_of_week,
                enabled: input.enabled,
                intervals: input.intervals,
            };
            day.validate().map_err(MeetingError::Validation)?;
            let idx = usize::from(day.day_of_week);
            week[idx] = day;
        }
        for day in &mut week {
            day.intervals.sort_by_key(|range| range.start);
        }

        let saved = self.store.replace_availability(operator_id, week).await?;
        info!(
            operator_id,
            enabled_days = saved.iter().filter(|d| d.enabled).count(),
            "Weekly availability replaced"
        );
        Ok(saved)
    }

    // --- Time off ---

    pub async fn time_off(&self, operator_id: &str) -> Result<Vec<TimeOff>, MeetingError> {
        Ok(self.store.list_time_off(operator_id).await?)
    }

    pub async fn create_time_off(
        &self,
        operator_id: &str,
        request: TimeOffRequest,
    ) -> Result<TimeOff, MeetingError> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(MeetingError::Validation("title is required".to_string()));
        }
        if request.end_at <= request.start_at {
            return Err(MeetingError::Validation(
                "end_at must be after start_at".to_string(),
            ));
        }
        let entry = TimeOff {
            id: Uuid::new_v4().to_string(),
            operator_id: operator_id.to_string(),
            title: title.to_string(),
            reason: request
                .reason
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty()),
            start_at: request.start_at,
            end_at: request.end_at,
            recurring: request.recurring,
        };
        let saved = self.store.create_time_off(entry).await?;
        info!(operator_id, time_off_id = %saved.id, recurring = saved.recurring, "Time off added");
        Ok(saved)
    }

    pub async fn delete_time_off(&self, operator_id: &str, id: &str) -> Result<(), MeetingError> {
        if !self.store.delete_time_off(operator_id, id).await? {
            return Err(MeetingError::TimeOffNotFound);
        }
        info!(operator_id, time_off_id = id, "Time off removed");
        Ok(())
    }

    // --- Meetings ---

    pub async fn list_meetings(
        &self,
        operator_id: &str,
        query: MeetingListQuery,
    ) -> Result<Page<Meeting>, MeetingError> {
        if let (Some(from), Some(to)) = (query.from, query.to) {
            if from > to {
                return Err(MeetingError::InvalidDateRange(
                    "from is after to".to_string(),
                ));
            }
        }
        let filter = MeetingFilter {
            operator_id: operator_id.to_string(),
            status: query.status,
            from: query.from,
            to: query.to,
            page: query.page.unwrap_or(1).max(1),
            per_page: query
                .per_page
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        };
        Ok(self.store.list_meetings(filter).await?)
    }

    /// A meeting and its audit trail, if it belongs to the operator.
    pub async fn meeting_detail(
        &self,
        operator_id: &str,
        meeting_id: &str,
    ) -> Result<(Meeting, Vec<AuditEntry>), MeetingError> {
        let meeting = match self.store.find_meeting(meeting_id).await? {
            Some(meeting) if meeting.operator_id == operator_id => meeting,
            _ => return Err(MeetingError::MeetingNotFound),
        };
        let audit = self.store.list_audit(meeting_id).await?;
        Ok((meeting, audit))
    }
}
