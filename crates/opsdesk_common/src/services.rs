// --- File: crates/opsdesk_common/src/services.rs ---
//! Service abstractions for external collaborators.
//!
//! The scheduling engine only talks to calendars and notification channels
//! through these traits, so a provider can be swapped (or faked in tests)
//! without touching the booking logic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Type alias for a boxed future that returns a Result
pub type BoxFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// A wrapper error type that implements std::error::Error for Box<dyn std::error::Error + Send + Sync>
#[derive(Debug)]
pub struct BoxedError(pub Box<dyn StdError + Send + Sync>);

impl fmt::Display for BoxedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StdError for BoxedError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

impl From<Box<dyn StdError + Send + Sync>> for BoxedError {
    fn from(err: Box<dyn StdError + Send + Sync>) -> Self {
        BoxedError(err)
    }
}

impl BoxedError {
    pub fn msg(message: impl Into<String>) -> Self {
        BoxedError(message.into().into())
    }
}

/// Calendar operations, always scoped to one operator's connected account.
///
/// Implementations resolve the operator's credentials per call; an operator
/// without a connected calendar yields no busy time and skipped writes.
pub trait CalendarService: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Busy intervals in `[start_time, end_time)` from the operator's calendar.
    fn get_busy_times(
        &self,
        operator_id: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> BoxFuture<'_, Vec<BusyInterval>, Self::Error>;

    fn create_event(
        &self,
        operator_id: &str,
        event: CalendarEvent,
    ) -> BoxFuture<'_, CalendarEventResult, Self::Error>;

    fn update_event(
        &self,
        operator_id: &str,
        event_id: &str,
        event: CalendarEvent,
    ) -> BoxFuture<'_, CalendarEventResult, Self::Error>;

    fn delete_event(&self, operator_id: &str, event_id: &str) -> BoxFuture<'_, (), Self::Error>;
}

/// Outbound messages to clients and operators.
pub trait NotificationService: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn send_email(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        is_html: bool,
    ) -> BoxFuture<'_, NotificationResult, Self::Error>;

    /// Short message to an operator-facing chat channel.
    fn send_chat(&self, channel: &str, text: &str) -> BoxFuture<'_, NotificationResult, Self::Error>;
}

/// Provides the collaborators the application was configured with.
pub trait ServiceFactory: Send + Sync {
    fn calendar_service(&self) -> Option<Arc<dyn CalendarService<Error = BoxedError>>>;

    fn notification_service(&self) -> Option<Arc<dyn NotificationService<Error = BoxedError>>>;
}

/// An interval during which the operator is busy elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// The fields of a single calendar event we write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub time_zone: String,
    pub summary: String,
    pub description: Option<String>,
    pub attendees: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEventResult {
    /// Provider event id; `None` when the write was skipped.
    pub event_id: Option<String>,
    pub status: String,
}

impl CalendarEventResult {
    pub fn skipped() -> Self {
        Self {
            event_id: None,
            status: "skipped".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationResult {
    pub id: String,
    pub status: String,
}

// --- Boxing adapters ---

/// Erases a concrete calendar error type so the service can live behind
/// `Arc<dyn CalendarService<Error = BoxedError>>`.
pub struct BoxedCalendar<S>(pub S);

impl<S> CalendarService for BoxedCalendar<S>
where
    S: CalendarService,
{
    type Error = BoxedError;

    fn get_busy_times(
        &self,
        operator_id: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> BoxFuture<'_, Vec<BusyInterval>, Self::Error> {
        let fut = self.0.get_busy_times(operator_id, start_time, end_time);
        Box::pin(async move { fut.await.map_err(|e| BoxedError(Box::new(e))) })
    }

    fn create_event(
        &self,
        operator_id: &str,
        event: CalendarEvent,
    ) -> BoxFuture<'_, CalendarEventResult, Self::Error> {
        let fut = self.0.create_event(operator_id, event);
        Box::pin(async move { fut.await.map_err(|e| BoxedError(Box::new(e))) })
    }

    fn update_event(
        &self,
        operator_id: &str,
        event_id: &str,
        event: CalendarEvent,
    ) -> BoxFuture<'_, CalendarEventResult, Self::Error> {
        let fut = self.0.update_event(operator_id, event_id, event);
        Box::pin(async move { fut.await.map_err(|e| BoxedError(Box::new(e))) })
    }

    fn delete_event(&self, operator_id: &str, event_id: &str) -> BoxFuture<'_, (), Self::Error> {
        let fut = self.0.delete_event(operator_id, event_id);
        Box::pin(async move { fut.await.map_err(|e| BoxedError(Box::new(e))) })
    }
}

/// Notification counterpart of [`BoxedCalendar`].
pub struct BoxedNotifier<S>(pub S);

impl<S> NotificationService for BoxedNotifier<S>
where
    S: NotificationService,
{
    type Error = BoxedError;

    fn send_email(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        is_html: bool,
    ) -> BoxFuture<'_, NotificationResult, Self::Error> {
        let fut = self.0.send_email(to, subject, body, is_html);
        Box::pin(async move { fut.await.map_err(|e| BoxedError(Box::new(e))) })
    }

    fn send_chat(&self, channel: &str, text: &str) -> BoxFuture<'_, NotificationResult, Self::Error> {
        let fut = self.0.send_chat(channel, text);
        Box::pin(async move { fut.await.map_err(|e| BoxedError(Box::new(e))) })
    }
}
