// --- File: crates/opsdesk_meetings/src/lib.rs ---
//! The Opsdesk scheduling engine.
//!
//! - [`availability`] computes bookable slots and checks single slots.
//! - [`booking`] owns the meeting state machine (book, cancel, reschedule,
//!   status changes) and its audit trail.
//! - [`dispatch`] carries committed changes out to calendars and
//!   notification channels; [`reminders`] feeds it reminder events.
//! - [`routes`] exposes the public booking surface and the operator surface.

pub mod availability;
pub mod booking;
pub mod dispatch;
pub mod doc;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod links;
pub mod models;
pub mod operator;
pub mod rate_limit;
pub mod reminders;
pub mod routes;
pub mod tokens;
pub mod turnstile;

#[cfg(test)]
mod availability_proptest;
#[cfg(test)]
mod links_test;
#[cfg(test)]
mod operator_test;
#[cfg(test)]
mod reminders_test;
#[cfg(test)]
mod test_support;

pub use booking::BookingService;
pub use dispatch::{ChannelSink, EventSink, EventWorker, MeetingEvent};
pub use error::MeetingError;
pub use extract::{ClientIpPolicy, ClientMeta};
pub use handlers::MeetingsState;
pub use links::LinkBuilder;
pub use operator::OperatorService;
pub use rate_limit::RateLimiter;
pub use reminders::ReminderScheduler;
pub use tokens::TokenPolicy;
pub use turnstile::TurnstileVerifier;
