// --- File: crates/opsdesk_codec/src/token.rs ---

// Compact signed tokens: base64url(header) "." base64url(payload) "." base64url(hmac).
// Verification is stateless; callers still look up the referenced record.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use tracing::debug;

use crate::error::CodecError;

type HmacSha256 = Hmac<Sha256>;

const HEADER_JSON: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// What a capability token allows its bearer to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenAction {
    View,
    Cancel,
    Reschedule,
}

impl fmt::Display for TokenAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TokenAction::View => "view",
            TokenAction::Cancel => "cancel",
            TokenAction::Reschedule => "reschedule",
        })
    }
}

/// Claims carried by a meeting capability token. Times are Unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityClaims {
    pub meeting_id: String,
    pub client_email: String,
    pub action: TokenAction,
    pub iat: i64,
    pub exp: i64,
}

/// Claims carried by the OAuth `state` parameter during calendar connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthStateClaims {
    pub operator_id: String,
    pub nonce: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenSigner {
    key: Vec<u8>,
}

impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

impl TokenSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
        }
    }

    fn mac(&self) -> Result<HmacSha256, CodecError> {
        HmacSha256::new_from_slice(&self.key)
            .map_err(|e| CodecError::Serialization(format!("hmac key: {e}")))
    }

    /// Signs arbitrary claims.
    pub fn sign<T: Serialize>(&self, claims: &T) -> Result<String, CodecError> {
        let header = URL_SAFE_NO_PAD.encode(HEADER_JSON);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
        let signing_input = format!("{header}.{payload}");

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature}"))
    }

    /// Checks the signature and decodes the payload. Expiry is the caller's concern.
    pub fn decode<T: DeserializeOwned>(&self, token: &str) -> Result<T, CodecError> {
        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CodecError::Malformed);
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| CodecError::Malformed)?;

        let mut mac = self.mac()?;
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| CodecError::BadSignature)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| CodecError::Malformed)?;
        serde_json::from_slice(&payload).map_err(|_| CodecError::Malformed)
    }

    pub fn mint_capability(
        &self,
        meeting_id: &str,
        client_email: &str,
        action: TokenAction,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<String, CodecError> {
        self.sign(&CapabilityClaims {
            meeting_id: meeting_id.to_string(),
            client_email: client_email.to_string(),
            action,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        })
    }

    pub fn verify_capability(
        &self,
        token: &str,
        expected: TokenAction,
    ) -> Result<CapabilityClaims, CodecError> {
        self.verify_capability_at(token, expected, Utc::now())
    }

    /// Signature, then action, then expiry (`now >= exp` is expired).
    pub fn verify_capability_at(
        &self,
        token: &str,
        expected: TokenAction,
        now: DateTime<Utc>,
    ) -> Result<CapabilityClaims, CodecError> {
        let claims: CapabilityClaims = self.decode(token)?;
        if claims.action != expected {
            debug!(meeting_id = %claims.meeting_id, %expected, actual = %claims.action, "Capability action mismatch");
            return Err(CodecError::WrongAction {
                expected,
                actual: claims.action,
            });
        }
        if now.timestamp() >= claims.exp {
            return Err(CodecError::Expired);
        }
        Ok(claims)
    }

    pub fn sign_oauth_state(
        &self,
        operator_id: &str,
        nonce: &str,
        now: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Result<String, CodecError> {
        self.sign(&OAuthStateClaims {
            operator_id: operator_id.to_string(),
            nonce: nonce.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        })
    }

    pub fn verify_oauth_state(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<OAuthStateClaims, CodecError> {
        let claims: OAuthStateClaims = self.decode(token)?;
        if now.timestamp() >= claims.exp {
            return Err(CodecError::Expired);
        }
        Ok(claims)
    }
}
