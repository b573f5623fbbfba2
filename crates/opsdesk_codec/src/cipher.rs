// --- File: crates/opsdesk_codec/src/cipher.rs ---

// At-rest encryption of stored credentials (calendar refresh tokens).
//
// Format: hex(iv) ":" hex(tag) ":" hex(ciphertext), AES-256-GCM with a fresh
// 96-bit random nonce per value. The key is SHA-256 of the configured secret.

use ring::aead::{self, Aad, LessSafeKey, Nonce, UnboundKey, NONCE_LEN};
use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::CodecError;

const TAG_LEN: usize = 16;

pub struct SecretCipher {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher").finish_non_exhaustive()
    }
}

impl SecretCipher {
    /// Derives the AES-256 key by hashing `secret`; the raw secret is never used as key material.
    pub fn new(secret: &str) -> Result<Self, CodecError> {
        let hashed = digest::digest(&digest::SHA256, secret.as_bytes());
        let unbound = UnboundKey::new(&aead::AES_256_GCM, hashed.as_ref())
            .map_err(|_| CodecError::Encryption("invalid key length".to_string()))?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CodecError> {
        let mut iv = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut iv)
            .map_err(|_| CodecError::Encryption("failed to generate nonce".to_string()))?;

        let mut in_out = plaintext.as_bytes().to_vec();
        let tag = self
            .key
            .seal_in_place_separate_tag(Nonce::assume_unique_for_key(iv), Aad::empty(), &mut in_out)
            .map_err(|_| CodecError::Encryption("seal failed".to_string()))?;

        Ok(format!(
            "{}:{}:{}",
            hex::encode(iv),
            hex::encode(tag.as_ref()),
            hex::encode(&in_out)
        ))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String, CodecError> {
        let mut parts = encoded.split(':');
        let (Some(iv_hex), Some(tag_hex), Some(ct_hex), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CodecError::Decryption("expected iv:tag:ciphertext".to_string()));
        };

        let iv = hex::decode(iv_hex).map_err(|e| CodecError::Decryption(e.to_string()))?;
        let tag = hex::decode(tag_hex).map_err(|e| CodecError::Decryption(e.to_string()))?;
        let mut in_out = hex::decode(ct_hex).map_err(|e| CodecError::Decryption(e.to_string()))?;

        if tag.len() != TAG_LEN {
            return Err(CodecError::Decryption("bad tag length".to_string()));
        }
        let nonce = Nonce::try_assume_unique_for_key(&iv)
            .map_err(|_| CodecError::Decryption("bad iv length".to_string()))?;

        in_out.extend_from_slice(&tag);
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| CodecError::Decryption("authentication failed".to_string()))?;

        String::from_utf8(plaintext.to_vec()).map_err(|e| CodecError::Decryption(e.to_string()))
    }
}
