// --- File: crates/opsdesk_codec/src/error.rs ---
use thiserror::Error;

use crate::token::TokenAction;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    /// Not three dot-separated base64url parts, or a payload that does not parse.
    #[error("Malformed token")]
    Malformed,

    #[error("Token signature mismatch")]
    BadSignature,

    #[error("Token was issued for '{actual}', not '{expected}'")]
    WrongAction {
        expected: TokenAction,
        actual: TokenAction,
    },

    #[error("Token expired")]
    Expired,

    #[error("Encryption failed: {0}")]
    Encryption(String),

    /// Wrong key, tampered ciphertext or a value not in `iv:tag:ciphertext` form.
    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        CodecError::Serialization(err.to_string())
    }
}
