//! Error types for the storage layer

use opsdesk_common::OpsdeskError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Database configuration error: {0}")]
    ConfigError(String),

    #[error("Database URL error: {0}")]
    UrlError(String),

    #[error("Database pool error: {0}")]
    PoolError(String),

    #[error("Database query error: {0}")]
    QueryError(String),

    /// A stored value could not be turned back into a domain value.
    #[error("Database decode error: {0}")]
    DecodeError(String),

    #[error("Other database error: {0}")]
    Other(String),
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::DecodeError(err.to_string())
    }
}

impl From<DbError> for OpsdeskError {
    fn from(err: DbError) -> Self {
        OpsdeskError::DatabaseError(err.to_string())
    }
}
