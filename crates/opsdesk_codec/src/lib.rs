// --- File: crates/opsdesk_codec/src/lib.rs ---

pub mod cipher; // At-rest AES-256-GCM
pub mod error;
pub mod token; // HMAC-signed capability and OAuth state tokens

#[cfg(test)]
mod cipher_test;
#[cfg(test)]
mod token_test;

pub use cipher::SecretCipher;
pub use error::CodecError;
pub use token::{CapabilityClaims, OAuthStateClaims, TokenAction, TokenSigner};
