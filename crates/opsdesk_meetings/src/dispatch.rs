// --- File: crates/opsdesk_meetings/src/dispatch.rs ---
//! Outbound side effects of meeting state changes.
//!
//! The booking service emits a [`MeetingEvent`] after each committed write.
//! An [`EventWorker`] consumes them off a channel and performs calendar sync
//! and notifications, each bounded by a timeout. Failures are logged and
//! swallowed: the meeting record is already committed and stays as it is.

use chrono::{DateTime, Utc};
use opsdesk_common::models::{Meeting, MeetingStatus, ReminderKind};
use opsdesk_common::services::{
    BoxedError, CalendarEvent, CalendarService, NotificationService,
};
use opsdesk_db::SchedulingStore;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::links::LinkBuilder;

#[derive(Debug, Clone)]
pub enum MeetingEvent {
    Created(Meeting),
    Cancelled(Meeting),
    Rescheduled {
        meeting: Meeting,
        previous_start: DateTime<Utc>,
    },
    StatusChanged {
        meeting: Meeting,
        from: MeetingStatus,
    },
    Reminder {
        meeting: Meeting,
        kind: ReminderKind,
    },
}

impl MeetingEvent {
    pub fn meeting(&self) -> &Meeting {
        match self {
            MeetingEvent::Created(meeting) | MeetingEvent::Cancelled(meeting) => meeting,
            MeetingEvent::Rescheduled { meeting, .. }
            | MeetingEvent::StatusChanged { meeting, .. }
            | MeetingEvent::Reminder { meeting, .. } => meeting,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MeetingEvent::Created(_) => "created",
            MeetingEvent::Cancelled(_) => "cancelled",
            MeetingEvent::Rescheduled { .. } => "rescheduled",
            MeetingEvent::StatusChanged { .. } => "status_changed",
            MeetingEvent::Reminder { .. } => "reminder",
        }
    }
}

/// Fire-and-forget destination for meeting events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: MeetingEvent);
}

/// Sends events to an [`EventWorker`] over an unbounded channel.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<MeetingEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MeetingEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: MeetingEvent) {
        let name = event.name();
        let meeting_id = event.meeting().id.clone();
        if self.tx.send(event).is_err() {
            warn!(meeting_id = %meeting_id, event = name, "Event worker is gone; dropping event");
        }
    }
}

type Calendar = Arc<dyn CalendarService<Error = BoxedError>>;
type Notifier = Arc<dyn NotificationService<Error = BoxedError>>;

async fn bounded<T, F>(limit: Duration, what: &str, fut: F) -> Option<T>
where
    F: Future<Output = Result<T, BoxedError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            warn!("{} failed: {}", what, e);
            None
        }
        Err(_) => {
            warn!("{} timed out after {:?}", what, limit);
            None
        }
    }
}

pub struct EventWorker<S> {
    store: S,
    calendar: Option<Calendar>,
    notifier: Option<Notifier>,
    links: LinkBuilder,
    timeout: Duration,
}

impl<S: SchedulingStore> EventWorker<S> {
    pub fn new(
        store: S,
        calendar: Option<Calendar>,
        notifier: Option<Notifier>,
        links: LinkBuilder,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            calendar,
            notifier,
            links,
            timeout,
        }
    }

    /// Processes events until every sender is dropped.
    pub async fn run(self, mut rx: mpsc::UnboundedReceiver<MeetingEvent>) {
        info!("Meeting event worker started");
        while let Some(event) = rx.recv().await {
            self.handle(event).await;
        }
        info!("Meeting event worker stopped");
    }

    pub async fn handle(&self, event: MeetingEvent) {
        debug!(meeting_id = %event.meeting().id, event = event.name(), "Dispatching meeting event");
        self.sync_calendar(&event).await;
        self.notify(&event).await;
    }

    /// The stored calendar event id; the event snapshot may predate the sync
    /// of an earlier event for the same meeting.
    async fn current_event_id(&self, meeting: &Meeting) -> Option<String> {
        match self.store.find_meeting(&meeting.id).await {
            Ok(Some(current)) => current.calendar_event_id,
            Ok(None) => None,
            Err(e) => {
                warn!(meeting_id = %meeting.id, "Could not reload meeting: {}", e);
                meeting.calendar_event_id.clone()
            }
        }
    }

    async fn store_event_id(&self, meeting_id: &str, event_id: Option<String>) {
        if let Err(e) = self.store.set_calendar_event_id(meeting_id, event_id).await {
            warn!(meeting_id, "Could not store calendar event id: {}", e);
        }
    }

    async fn create_calendar_event(&self, calendar: &Calendar, meeting: &Meeting) {
        let created = bounded(
            self.timeout,
            "Calendar create",
            calendar.create_event(&meeting.operator_id, self.calendar_event(meeting)),
        )
        .await;
        if let Some(event_id) = created.and_then(|result| result.event_id) {
            self.store_event_id(&meeting.id, Some(event_id)).await;
        }
    }

    async fn sync_calendar(&self, event: &MeetingEvent) {
        let Some(calendar) = &self.calendar else {
            return;
        };

        match event {
            MeetingEvent::Created(meeting) => self.create_calendar_event(calendar, meeting).await,
            MeetingEvent::Rescheduled { meeting, .. } => {
                match self.current_event_id(meeting).await {
                    Some(event_id) => {
                        bounded(
                            self.timeout,
                            "Calendar update",
                            calendar.update_event(
                                &meeting.operator_id,
                                &event_id,
                                self.calendar_event(meeting),
                            ),
                        )
                        .await;
                    }
                    None => self.create_calendar_event(calendar, meeting).await,
                }
            }
            MeetingEvent::Cancelled(meeting) => {
                if let Some(event_id) = self.current_event_id(meeting).await {
                    let deleted = bounded(
                        self.timeout,
                        "Calendar delete",
                        calendar.delete_event(&meeting.operator_id, &event_id),
                    )
                    .await;
                    if deleted.is_some() {
                        self.store_event_id(&meeting.id, None).await;
                    }
                }
            }
            MeetingEvent::StatusChanged { .. } | MeetingEvent::Reminder { .. } => {}
        }
    }

    fn calendar_event(&self, meeting: &Meeting) -> CalendarEvent {
        let mut description = format!(
            "Client: {} <{}>",
            meeting.client_name, meeting.client_email
        );
        if let Some(company) = &meeting.client_company {
            description.push_str(&format!("\nCompany: {company}"));
        }
        if let Some(phone) = &meeting.client_phone {
            description.push_str(&format!("\nPhone: {phone}"));
        }
        if let Some(notes) = &meeting.notes {
            description.push_str(&format!("\n\n{notes}"));
        }

        CalendarEvent {
            start_time: meeting.start_at,
            end_time: meeting.end_at,
            time_zone: meeting.timezone.clone(),
            summary: format!("{} ({})", meeting.subject, meeting.client_name),
            description: Some(description),
            attendees: vec![meeting.client_email.clone()],
        }
    }

    async fn notify(&self, event: &MeetingEvent) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        let meeting = event.meeting();

        let (subject, body) = self.client_message(event);
        bounded(
            self.timeout,
            "Client email",
            notifier.send_email(&meeting.client_email, &subject, &body, false),
        )
        .await;

        if let Some(text) = operator_message(event) {
            bounded(
                self.timeout,
                "Operator chat",
                notifier.send_chat(&meeting.operator_id, &text),
            )
            .await;
        }
    }

    fn client_message(&self, event: &MeetingEvent) -> (String, String) {
        let meeting = event.meeting();
        let when = local_time(meeting, meeting.start_at);
        let links = self.links.action_links(&meeting.tokens);

        match event {
            MeetingEvent::Created(_) => (
                format!("Meeting confirmed: {}", meeting.subject),
                format!(
                    "Hi {},\n\nYour meeting \"{}\" is confirmed for {} ({} minutes).\n\n\
                     View: {}\nCancel: {}\nReschedule: {}\n",
                    meeting.client_name,
                    meeting.subject,
                    when,
                    meeting.duration_minutes,
                    links.view_url,
                    links.cancel_url,
                    links.reschedule_url
                ),
            ),
            MeetingEvent::Rescheduled { previous_start, .. } => (
                format!("Meeting rescheduled: {}", meeting.subject),
                format!(
                    "Hi {},\n\nYour meeting \"{}\" has moved from {} to {}.\n\n\
                     View: {}\nCancel: {}\nReschedule: {}\n",
                    meeting.client_name,
                    meeting.subject,
                    local_time(meeting, *previous_start),
                    when,
                    links.view_url,
                    links.cancel_url,
                    links.reschedule_url
                ),
            ),
            MeetingEvent::Cancelled(_) => (
                format!("Meeting cancelled: {}", meeting.subject),
                format!(
                    "Hi {},\n\nYour meeting \"{}\" on {} has been cancelled.{}\n",
                    meeting.client_name,
                    meeting.subject,
                    when,
                    meeting
                        .cancellation_reason
                        .as_deref()
                        .map(|reason| format!("\nReason: {reason}"))
                        .unwrap_or_default()
                ),
            ),
            MeetingEvent::StatusChanged { .. } => (
                format!("Meeting update: {}", meeting.subject),
                format!(
                    "Hi {},\n\nYour meeting \"{}\" on {} is now marked as {}.\n",
                    meeting.client_name,
                    meeting.subject,
                    when,
                    meeting.status.as_str().replace('_', " ")
                ),
            ),
            MeetingEvent::Reminder { kind, .. } => (
                format!(
                    "Reminder: {} {}",
                    meeting.subject,
                    match kind {
                        ReminderKind::DayBefore => "tomorrow",
                        ReminderKind::HourBefore => "in one hour",
                    }
                ),
                format!(
                    "Hi {},\n\nThis is a reminder of your meeting \"{}\" at {}.\n\nView: {}\n",
                    meeting.client_name, meeting.subject, when, links.view_url
                ),
            ),
        }
    }
}

fn operator_message(event: &MeetingEvent) -> Option<String> {
    let meeting = event.meeting();
    let when = local_time(meeting, meeting.start_at);
    match event {
        MeetingEvent::Created(_) => Some(format!(
            "New meeting: {} with {} at {}",
            meeting.subject, meeting.client_name, when
        )),
        MeetingEvent::Cancelled(_) => Some(format!(
            "Cancelled: {} with {} at {}",
            meeting.subject, meeting.client_name, when
        )),
        MeetingEvent::Rescheduled { .. } => Some(format!(
            "Rescheduled: {} with {} now at {}",
            meeting.subject, meeting.client_name, when
        )),
        MeetingEvent::StatusChanged { from, .. } => Some(format!(
            "{} with {}: {} -> {}",
            meeting.subject, meeting.client_name, from, meeting.status
        )),
        MeetingEvent::Reminder { .. } => None,
    }
}

fn local_time(meeting: &Meeting, at: DateTime<Utc>) -> String {
    match meeting.timezone.parse::<chrono_tz::Tz>() {
        Ok(tz) => at
            .with_timezone(&tz)
            .format("%A, %B %-d, %Y %H:%M %Z")
            .to_string(),
        Err(_) => at.format("%A, %B %-d, %Y %H:%M UTC").to_string(),
    }
}
