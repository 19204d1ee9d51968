//! Anonymization of sensitive patient fields
//!
//! Three strategies are available:
//! - **Pseudonym** ([`pseudonym`]): keyed HMAC, deterministic and irreversible
//! - **Sealed** ([`sealed`]): AES-256-GCM, reversible with an unmask grant
//! - **Display mask** ([`redaction`]): contact numbers with only the trailing digits visible
//!
//! [`Anonymizer`] combines them to derive the anonymized projection of a record.
//!
//! # Usage
//!
//! ```rust,ignore
//! use vigil::anonymization::Anonymizer;
//!
//! let anonymizer = Anonymizer::from_config(&config.anonymization)?;
//! let derived = anonymizer.derive(&raw)?;
//! assert_eq!(derived.contact, "XXX-XXX-4592");
//! ```

pub mod anonymizer;
pub mod pseudonym;
pub mod redaction;
pub mod sealed;

pub use anonymizer::Anonymizer;
pub use pseudonym::PseudonymStrategy;
pub use redaction::mask_contact;
pub use sealed::SealedStrategy;

use crate::domain::Result;
use serde::{Deserialize, Serialize};

/// Field a masked value belongs to; bound into pseudonyms and seals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensitiveField {
    Name,
    Contact,
}

impl SensitiveField {
    pub const fn label(&self) -> &'static str {
        match self {
            SensitiveField::Name => "name",
            SensitiveField::Contact => "contact",
        }
    }
}

/// Whether a mask can later be reversed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskStrategy {
    Irreversible,
    Reversible,
}

/// Output of a masking strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum MaskedValue {
    Pseudonym(String),
    Sealed(String),
}

impl MaskedValue {
    pub fn as_str(&self) -> &str {
        match self {
            MaskedValue::Pseudonym(value) | MaskedValue::Sealed(value) => value,
        }
    }

    pub fn into_string(self) -> String {
        match self {
            MaskedValue::Pseudonym(value) | MaskedValue::Sealed(value) => value,
        }
    }
}

/// A masking strategy implementation
pub trait MaskingStrategy: Send + Sync {
    /// Masks `value` as belonging to `field`
    fn mask(&self, field: SensitiveField, value: &str) -> Result<MaskedValue>;

    /// Short label used in logs and fingerprints
    fn label(&self) -> &'static str;
}
