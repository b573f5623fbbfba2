// --- File: crates/opsdesk_meetings/src/turnstile.rs ---
// Anti-automation check for public bookings (Cloudflare Turnstile siteverify).
// Any failure to get a positive answer rejects the booking.

use opsdesk_common::http::client::post_form;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::MeetingError;

pub const SITEVERIFY_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/siteverify";

#[derive(Serialize)]
struct SiteverifyForm<'a> {
    secret: &'a str,
    response: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    remoteip: Option<&'a str>,
}

#[derive(Deserialize, Debug)]
struct SiteverifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

#[derive(Clone)]
pub struct TurnstileVerifier {
    secret: String,
    endpoint: String,
    timeout: Duration,
}

fn rejected() -> MeetingError {
    MeetingError::Validation("Anti-automation check failed".to_string())
}

impl TurnstileVerifier {
    pub fn new(secret: impl Into<String>, timeout: Duration) -> Self {
        Self {
            secret: secret.into(),
            endpoint: SITEVERIFY_URL.to_string(),
            timeout,
        }
    }

    pub async fn verify(&self, token: Option<&str>, remote_ip: Option<&str>) -> Result<(), MeetingError> {
        let token = token.map(str::trim).filter(|t| !t.is_empty()).ok_or_else(|| {
            MeetingError::Validation("turnstile_token is required".to_string())
        })?;

        let form = SiteverifyForm {
            secret: &self.secret,
            response: token,
            remoteip: remote_ip,
        };
        let response = match tokio::time::timeout(self.timeout, post_form(&self.endpoint, &form)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!("Turnstile request failed: {}", e);
                return Err(rejected());
            }
            Err(_) => {
                warn!("Turnstile request timed out after {:?}", self.timeout);
                return Err(rejected());
            }
        };

        let outcome = match tokio::time::timeout(self.timeout, response.json::<SiteverifyResponse>()).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                warn!("Unreadable Turnstile response: {}", e);
                return Err(rejected());
            }
            Err(_) => return Err(rejected()),
        };

        if !outcome.success {
            debug!(errors = ?outcome.error_codes, "Turnstile rejected the token");
            return Err(rejected());
        }
        Ok(())
    }
}
