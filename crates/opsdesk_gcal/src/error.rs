// --- File: crates/opsdesk_gcal/src/error.rs ---
use axum::response::{IntoResponse, Response};
use opsdesk_codec::CodecError;
use opsdesk_common::{error_response, HttpStatusCode};
use opsdesk_db::DbError;
use thiserror::Error;
use tracing::error;

/// Errors that can occur when syncing with Google Calendar.
#[derive(Error, Debug)]
pub enum GcalError {
    #[error("Google API Error: {0}")]
    ApiError(#[from] google_calendar3::Error),
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),
    #[error("Authorization was not granted: {0}")]
    AuthorizationDenied(String),
    #[error("Invalid or expired OAuth state")]
    InvalidState,
    #[error("No calendar connected for operator {0}")]
    NotConnected(String),
    #[error("Calendar integration is not configured")]
    NotConfigured,
    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
    #[error("Secret codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("Connector error: {0}")]
    Connector(String),
}

impl GcalError {
    pub fn code(&self) -> &'static str {
        match self {
            GcalError::ApiError(_) | GcalError::TokenExchange(_) | GcalError::Connector(_) => {
                "CALENDAR_SYNC_FAILED"
            }
            GcalError::AuthorizationDenied(_) => "CALENDAR_AUTH_DENIED",
            GcalError::InvalidState => "INVALID_TOKEN",
            GcalError::NotConnected(_) => "CALENDAR_NOT_CONNECTED",
            GcalError::NotConfigured => "CALENDAR_NOT_CONFIGURED",
            GcalError::Storage(_) | GcalError::Codec(_) => "INTERNAL_ERROR",
        }
    }
}

impl HttpStatusCode for GcalError {
    fn status_code(&self) -> u16 {
        match self {
            GcalError::AuthorizationDenied(_) | GcalError::InvalidState => 400,
            GcalError::NotConnected(_) => 404,
            GcalError::NotConfigured => 503,
            GcalError::ApiError(_) | GcalError::TokenExchange(_) | GcalError::Connector(_) => 502,
            GcalError::Storage(_) | GcalError::Codec(_) => 500,
        }
    }
}

impl IntoResponse for GcalError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status >= 500 {
            error!("Calendar request failed: {}", self);
        }
        let message = match &self {
            GcalError::Storage(_) | GcalError::Codec(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        error_response(status, self.code(), &message)
    }
}
