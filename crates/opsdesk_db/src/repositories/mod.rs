//! Repository traits per stored entity, plus the SQL and in-memory backends.
//!
//! Every trait method returns `impl Future + Send` so the scheduling services
//! can stay generic over the backend and still be spawned onto tokio.

pub mod audit;
pub mod availability;
pub mod calendar_account;
pub mod meeting;
pub mod memory;
pub mod operator;
pub mod rate_limit;
pub mod settings;
pub mod sql;
pub mod time_off;

pub use audit::AuditRepository;
pub use availability::AvailabilityRepository;
pub use calendar_account::CalendarAccountRepository;
pub use meeting::{Buffers, MeetingRepository, RescheduleWrite, StatusChange, WriteOutcome};
pub use memory::MemoryStore;
pub use operator::OperatorRepository;
pub use rate_limit::RateLimitRepository;
pub use settings::SettingsRepository;
pub use sql::SqlStore;
pub use time_off::TimeOffRepository;

/// Everything the scheduling engine needs from storage.
pub trait SchedulingStore:
    OperatorRepository
    + SettingsRepository
    + AvailabilityRepository
    + TimeOffRepository
    + MeetingRepository
    + AuditRepository
    + CalendarAccountRepository
    + RateLimitRepository
    + Clone
    + Send
    + Sync
    + 'static
{
}

impl<T> SchedulingStore for T where
    T: OperatorRepository
        + SettingsRepository
        + AvailabilityRepository
        + TimeOffRepository
        + MeetingRepository
        + AuditRepository
        + CalendarAccountRepository
        + RateLimitRepository
        + Clone
        + Send
        + Sync
        + 'static
{
}
