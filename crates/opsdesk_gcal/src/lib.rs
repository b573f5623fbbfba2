// --- File: crates/opsdesk_gcal/src/lib.rs ---
//! Google Calendar sync for Opsdesk operators.
//!
//! - [`service::GoogleCalendarService`] implements the shared
//!   `CalendarService` trait on top of each operator's connected account.
//! - [`oauth`] and [`routes`] provide the connect/callback/disconnect flow.

pub mod auth;
pub mod doc;
pub mod error;
pub mod handlers;
pub mod oauth;
pub mod routes;
pub mod service;

#[cfg(test)]
mod handlers_test;
#[cfg(test)]
mod service_test;

pub use error::GcalError;
pub use handlers::GcalState;
pub use service::GoogleCalendarService;
