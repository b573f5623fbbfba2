// --- File: crates/opsdesk_common/src/error.rs ---
use std::fmt;
use thiserror::Error;

/// The base error type shared by all Opsdesk crates.
///
/// Feature crates keep their own error enums and convert into this one where
/// they cross a generic boundary (HTTP client calls, config, background tasks).
#[derive(Error, Debug)]
pub enum OpsdeskError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Failed to parse data: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("External service error: {service_name} - {message}")]
    ExternalServiceError {
        service_name: String,
        message: String,
    },

    #[error("Conflict: {0}")]
    ConflictError(String),

    #[error("Not found: {0}")]
    NotFoundError(String),

    #[error("Timeout: {0}")]
    TimeoutError(String),

    #[error("Rate limited: {0}")]
    RateLimitError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl OpsdeskError {
    /// Stable machine-readable code rendered in JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            OpsdeskError::HttpError(_) => "HTTP_ERROR",
            OpsdeskError::ParseError(_) => "VALIDATION_ERROR",
            OpsdeskError::ConfigError(_) => "INTERNAL_ERROR",
            OpsdeskError::AuthError(_) => "UNAUTHORIZED",
            OpsdeskError::ValidationError(_) => "VALIDATION_ERROR",
            OpsdeskError::DatabaseError(_) => "INTERNAL_ERROR",
            OpsdeskError::ExternalServiceError { .. } => "EXTERNAL_SERVICE_ERROR",
            OpsdeskError::ConflictError(_) => "CONFLICT",
            OpsdeskError::NotFoundError(_) => "NOT_FOUND",
            OpsdeskError::TimeoutError(_) => "TIMEOUT",
            OpsdeskError::RateLimitError(_) => "RATE_LIMITED",
            OpsdeskError::InternalError(_) => "INTERNAL_ERROR",
        }
    }
}

/// Maps an error onto the HTTP status it should be rendered with.
pub trait HttpStatusCode {
    fn status_code(&self) -> u16;
}

impl HttpStatusCode for OpsdeskError {
    fn status_code(&self) -> u16 {
        match self {
            OpsdeskError::HttpError(_) => 500,
            OpsdeskError::ParseError(_) => 400,
            OpsdeskError::ConfigError(_) => 500,
            OpsdeskError::AuthError(_) => 401,
            OpsdeskError::ValidationError(_) => 400,
            OpsdeskError::DatabaseError(_) => 500,
            OpsdeskError::ExternalServiceError { .. } => 502,
            OpsdeskError::ConflictError(_) => 409,
            OpsdeskError::NotFoundError(_) => 404,
            OpsdeskError::TimeoutError(_) => 504,
            OpsdeskError::RateLimitError(_) => 429,
            OpsdeskError::InternalError(_) => 500,
        }
    }
}

/// Adds context to foreign errors while converting them into [`OpsdeskError`].
pub trait Context<T, E> {
    fn context<C>(self, context: C) -> Result<T, OpsdeskError>
    where
        C: fmt::Display + Send + Sync + 'static;

    fn with_context<C, F>(self, f: F) -> Result<T, OpsdeskError>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E: std::error::Error + Send + Sync + 'static> Context<T, E> for Result<T, E> {
    fn context<C>(self, context: C) -> Result<T, OpsdeskError>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|error| OpsdeskError::InternalError(format!("{}: {}", context, error)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T, OpsdeskError>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|error| OpsdeskError::InternalError(format!("{}: {}", f(), error)))
    }
}

impl From<reqwest::Error> for OpsdeskError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            OpsdeskError::TimeoutError(err.to_string())
        } else {
            OpsdeskError::HttpError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for OpsdeskError {
    fn from(err: serde_json::Error) -> Self {
        OpsdeskError::ParseError(err.to_string())
    }
}

impl From<std::io::Error> for OpsdeskError {
    fn from(err: std::io::Error) -> Self {
        OpsdeskError::InternalError(err.to_string())
    }
}

pub fn config_error<T: fmt::Display>(message: T) -> OpsdeskError {
    OpsdeskError::ConfigError(message.to_string())
}

pub fn validation_error<T: fmt::Display>(message: T) -> OpsdeskError {
    OpsdeskError::ValidationError(message.to_string())
}

pub fn not_found<T: fmt::Display>(message: T) -> OpsdeskError {
    OpsdeskError::NotFoundError(message.to_string())
}

pub fn conflict<T: fmt::Display>(message: T) -> OpsdeskError {
    OpsdeskError::ConflictError(message.to_string())
}

pub fn external_service_error<T: fmt::Display>(service_name: &str, message: T) -> OpsdeskError {
    OpsdeskError::ExternalServiceError {
        service_name: service_name.to_string(),
        message: message.to_string(),
    }
}

pub fn internal_error<T: fmt::Display>(message: T) -> OpsdeskError {
    OpsdeskError::InternalError(message.to_string())
}
