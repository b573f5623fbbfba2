// --- File: crates/opsdesk_meetings/src/reminders.rs ---
// Periodic reminder pass. Finds active meetings whose 24h or 1h reminder is
// due, flips the flag and emits a reminder event. The flag is set before the
// event goes out, so overlapping passes never remind twice.

use chrono::{DateTime, Utc};
use opsdesk_common::models::{Meeting, ReminderKind};
use opsdesk_db::SchedulingStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::dispatch::{EventSink, MeetingEvent};
use crate::error::MeetingError;

pub struct ReminderScheduler<S> {
    store: S,
    events: Arc<dyn EventSink>,
}

impl<S: SchedulingStore> ReminderScheduler<S> {
    pub fn new(store: S, events: Arc<dyn EventSink>) -> Self {
        Self { store, events }
    }

    /// One pass at `now`. Returns how many reminder events were emitted.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<usize, MeetingError> {
        let mut sent = 0;

        for meeting in self.store.due_for_reminder(ReminderKind::DayBefore, now).await? {
            // Inside the last hour only the 1h reminder is worth sending.
            let silent = meeting.start_at - now <= ReminderKind::HourBefore.lead_time();
            if self.claim(&meeting, ReminderKind::DayBefore).await? && !silent {
                self.emit(meeting, ReminderKind::DayBefore);
                sent += 1;
            }
        }

        for meeting in self.store.due_for_reminder(ReminderKind::HourBefore, now).await? {
            if self.claim(&meeting, ReminderKind::HourBefore).await? {
                self.emit(meeting, ReminderKind::HourBefore);
                sent += 1;
            }
        }

        if sent > 0 {
            info!(sent, "Reminder pass finished");
        }
        Ok(sent)
    }

    async fn claim(&self, meeting: &Meeting, kind: ReminderKind) -> Result<bool, MeetingError> {
        let claimed = self.store.mark_reminder_sent(&meeting.id, kind).await?;
        if !claimed {
            debug!(meeting_id = %meeting.id, ?kind, "Reminder already claimed");
        }
        Ok(claimed)
    }

    fn emit(&self, meeting: Meeting, kind: ReminderKind) {
        self.events.emit(MeetingEvent::Reminder { meeting, kind });
    }

    /// Runs a pass every `every` until the task is dropped.
    pub async fn run(self, every: Duration) {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!("Reminder scheduler started, every {:?}", every);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_once(Utc::now()).await {
                error!("Reminder pass failed: {}", e);
            }
        }
    }
}
