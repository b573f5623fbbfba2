// --- File: crates/opsdesk_meetings/src/rate_limit.rs ---
// Fixed-window request throttling per client IP, backed by the store so it
// holds across workers.

use chrono::{DateTime, Duration, Utc};
use opsdesk_config::RateLimitConfig;
use opsdesk_db::RateLimitRepository;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::MeetingError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: i64,
    pub reset_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct RateLimiter<S> {
    store: S,
    max_requests: i64,
    window: Duration,
}

impl<S> RateLimiter<S>
where
    S: RateLimitRepository + Send + Sync,
{
    pub fn new(store: S, max_requests: i64, window_minutes: i64) -> Self {
        Self {
            store,
            max_requests,
            window: Duration::minutes(window_minutes),
        }
    }

    pub fn from_config(store: S, config: &RateLimitConfig) -> Self {
        Self::new(store, config.requests_per_window, config.window_minutes)
    }

    /// Counts one request from `ip` and says whether it may proceed.
    ///
    /// Once the window is at its cap every further request is refused until
    /// the window ends; refused requests are not counted.
    pub async fn check(&self, ip: &str, now: DateTime<Utc>) -> Result<RateLimitDecision, MeetingError> {
        self.store.purge_expired_windows(now).await?;

        // Two rounds: if another request opens the window between our lookup
        // and our insert, the second round counts against that window.
        for _ in 0..2 {
            if let Some(window) = self.store.find_live_window(ip, now).await? {
                if self
                    .store
                    .increment_live_window(ip, now, self.max_requests)
                    .await?
                {
                    return Ok(RateLimitDecision {
                        allowed: true,
                        remaining: (self.max_requests - window.request_count - 1).max(0),
                        reset_at: window.window_end,
                    });
                }
                debug!(ip, count = window.request_count, "Rate limit reached");
                return Ok(RateLimitDecision {
                    allowed: false,
                    remaining: 0,
                    reset_at: window.window_end,
                });
            }

            let window_end = now + self.window;
            if self.store.open_window(ip, now, window_end).await? {
                return Ok(RateLimitDecision {
                    allowed: true,
                    remaining: (self.max_requests - 1).max(0),
                    reset_at: window_end,
                });
            }
        }

        warn!(ip, "Could not settle a rate limit window; refusing request");
        Ok(RateLimitDecision {
            allowed: false,
            remaining: 0,
            reset_at: now + self.window,
        })
    }

    /// [`Self::check`], with a refusal turned into [`MeetingError::RateLimited`].
    pub async fn enforce(&self, ip: &str, now: DateTime<Utc>) -> Result<RateLimitDecision, MeetingError> {
        let decision = self.check(ip, now).await?;
        if !decision.allowed {
            return Err(MeetingError::RateLimited {
                reset_at: decision.reset_at,
            });
        }
        Ok(decision)
    }
}
