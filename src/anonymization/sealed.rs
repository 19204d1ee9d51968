//! Reversible sealing with AES-256-GCM
//!
//! Sealed values have the form `v1:<base64(nonce || ciphertext)>`. Each seal
//! uses a fresh random 96-bit nonce, and the field label is bound as
//! associated data so a sealed contact cannot be opened as a name.

use super::pseudonym::key_id;
use super::{MaskedValue, MaskingStrategy, SensitiveField};
use crate::domain::{AnonymizationError, Result};
use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use zeroize::Zeroizing;

const VERSION_PREFIX: &str = "v1:";
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Authenticated, reversible encryption of field values
#[derive(Clone)]
pub struct SealedStrategy {
    cipher: Aes256Gcm,
    key_id: String,
}

impl SealedStrategy {
    /// Creates the strategy from a base64-encoded 32-byte key
    ///
    /// # Errors
    ///
    /// Returns [`AnonymizationError::InvalidKey`] if the key is not valid
    /// base64 or does not decode to 32 bytes.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let key = Zeroizing::new(
            STANDARD
                .decode(encoded.trim())
                .map_err(|e| AnonymizationError::InvalidKey(format!("encryption key: {e}")))?,
        );
        Self::new(&key)
    }

    /// Creates the strategy from raw key bytes
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.len() != KEY_LEN {
            return Err(AnonymizationError::InvalidKey(format!(
                "encryption key must be {KEY_LEN} bytes, got {}",
                key.len()
            ))
            .into());
        }
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| AnonymizationError::InvalidKey(e.to_string()))?;
        Ok(Self {
            cipher,
            key_id: key_id("sealed", key),
        })
    }

    /// Generates a fresh random key, base64-encoded, for `vigil init`
    pub fn generate_key() -> String {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        rand::thread_rng().fill_bytes(&mut key[..]);
        STANDARD.encode(&key[..])
    }

    /// Encrypts `value` bound to `field`
    pub fn seal(&self, field: SensitiveField, value: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(
                nonce,
                Payload {
                    msg: value.as_bytes(),
                    aad: field.label().as_bytes(),
                },
            )
            .map_err(|e| AnonymizationError::Encryption(e.to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(format!("{VERSION_PREFIX}{}", STANDARD.encode(sealed)))
    }

    /// Decrypts a value produced by [`seal`](Self::seal) for the same field
    ///
    /// # Errors
    ///
    /// Returns [`AnonymizationError::UnmaskFailed`] for malformed input, a
    /// different key, a different field label or any tampering.
    pub fn open(&self, field: SensitiveField, sealed: &str) -> Result<String> {
        let encoded = sealed
            .strip_prefix(VERSION_PREFIX)
            .ok_or_else(|| AnonymizationError::UnmaskFailed("unknown format".to_string()))?;
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|_| AnonymizationError::UnmaskFailed("invalid encoding".to_string()))?;
        if bytes.len() <= NONCE_LEN {
            return Err(AnonymizationError::UnmaskFailed("truncated value".to_string()).into());
        }

        let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_LEN);
        let plaintext = Zeroizing::new(
            self.cipher
                .decrypt(
                    Nonce::from_slice(nonce_bytes),
                    Payload {
                        msg: ciphertext,
                        aad: field.label().as_bytes(),
                    },
                )
                .map_err(|_| {
                    AnonymizationError::UnmaskFailed(
                        "authentication failed: value tampered or sealed under another key"
                            .to_string(),
                    )
                })?,
        );

        String::from_utf8(plaintext.to_vec())
            .map_err(|_| AnonymizationError::UnmaskFailed("plaintext is not UTF-8".to_string()).into())
    }

    /// Identifier of the key, safe to store and compare
    pub fn key_id(&self) -> &str {
        &self.key_id
    }
}

impl MaskingStrategy for SealedStrategy {
    fn mask(&self, field: SensitiveField, value: &str) -> Result<MaskedValue> {
        self.seal(field, value).map(MaskedValue::Sealed)
    }

    fn label(&self) -> &'static str {
        "sealed"
    }
}
