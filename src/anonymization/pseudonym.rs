//! Keyed pseudonym strategy
//!
//! Replaces a value with `ANON_<16 hex>` taken from HMAC-SHA256 over the
//! field label and value. The same input under the same key always yields the
//! same pseudonym, and nothing about the value can be recovered from it.

use super::{MaskedValue, MaskingStrategy, SensitiveField};
use crate::domain::{AnonymizationError, Result};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const PREFIX: &str = "ANON_";
const HEX_CHARS: usize = 16;

/// Deterministic, irreversible pseudonyms
#[derive(Clone)]
pub struct PseudonymStrategy {
    mac: HmacSha256,
    key_id: String,
}

impl PseudonymStrategy {
    /// Creates the strategy from raw key bytes
    ///
    /// # Errors
    ///
    /// Returns [`AnonymizationError::InvalidKey`] for an empty key.
    pub fn new(key: &[u8]) -> Result<Self> {
        if key.is_empty() {
            return Err(AnonymizationError::InvalidKey("pseudonym key is empty".to_string()).into());
        }
        let mac = <HmacSha256 as Mac>::new_from_slice(key)
            .map_err(|e| AnonymizationError::InvalidKey(e.to_string()))?;
        Ok(Self {
            mac,
            key_id: key_id("pseudonym", key),
        })
    }

    /// Computes the pseudonym for `value`
    pub fn pseudonym(&self, field: SensitiveField, value: &str) -> String {
        if value.is_empty() {
            return String::new();
        }
        let mut mac = self.mac.clone();
        mac.update(field.label().as_bytes());
        mac.update(&[0]);
        mac.update(value.as_bytes());
        let digest = format!("{:x}", mac.finalize().into_bytes());
        format!("{PREFIX}{}", &digest[..HEX_CHARS])
    }

    /// Identifier of the key, safe to store and compare
    pub fn key_id(&self) -> &str {
        &self.key_id
    }
}

impl MaskingStrategy for PseudonymStrategy {
    fn mask(&self, field: SensitiveField, value: &str) -> Result<MaskedValue> {
        Ok(MaskedValue::Pseudonym(self.pseudonym(field, value)))
    }

    fn label(&self) -> &'static str {
        "pseudonym"
    }
}

/// Short SHA-256 identifier of key material, scoped by purpose
pub(crate) fn key_id(purpose: &str, key: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(purpose.as_bytes());
    hasher.update([0u8]);
    hasher.update(key);
    let digest = format!("{:x}", hasher.finalize());
    digest[..HEX_CHARS].to_string()
}
