//! Storage for the Opsdesk scheduling engine
//!
//! The scheduling services talk to storage through the per-entity repository
//! traits in [`repositories`], bundled as [`SchedulingStore`]. Two backends
//! implement them:
//!
//! - [`SqlStore`]: `sqlx` over the `Any` driver, SQLite by default.
//! - [`MemoryStore`]: a mutex-guarded in-process store for tests and demos.
//!
//! Double-booking is prevented at the storage layer: the conflict check and
//! the write happen in one statement (SQL) or under one lock (memory).
//!
//! # Example
//!
//! ```rust,no_run
//! use opsdesk_config::DatabaseConfig;
//! use opsdesk_db::SqlStore;
//!
//! async fn setup() -> Result<SqlStore, opsdesk_db::DbError> {
//!     SqlStore::connect(&DatabaseConfig { url: "sqlite:data/opsdesk.db".into() }).await
//! }
//! ```

pub mod client;
pub mod error;
pub mod repositories;

pub use client::DbClient;
pub use error::DbError;
pub use repositories::{
    AuditRepository, AvailabilityRepository, Buffers, CalendarAccountRepository, MeetingRepository,
    MemoryStore, OperatorRepository, RateLimitRepository, RescheduleWrite, SchedulingStore,
    SettingsRepository, SqlStore, StatusChange, TimeOffRepository, WriteOutcome,
};
