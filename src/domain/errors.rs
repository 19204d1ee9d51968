//! Domain error types
//!
//! This module defines the error hierarchy for Vigil. Every public operation
//! returns [`VigilError`]; the sub-enums group failures by the component that
//! raises them and convert into the top-level type with `?`.
//! No third-party error types leak through this interface.

use crate::domain::ids::RecordId;
use crate::domain::role::Capability;
use std::time::Duration;
use thiserror::Error;

/// Main Vigil error type
#[derive(Debug, Error)]
pub enum VigilError {
    /// Authentication failures
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// The caller's role lacks the capability an operation requires
    #[error("Permission error: {0}")]
    Permission(#[from] PermissionError),

    /// Unknown patient record
    #[error("Record not found: {record_id}")]
    NotFound { record_id: RecordId },

    /// Unknown user account (only surfaced to administrators)
    #[error("User not found: {username}")]
    UserNotFound { username: String },

    /// Conflicting writes such as a duplicate username
    #[error("Conflict: {0}")]
    Conflict(#[from] ConflictError),

    /// Persistence layer failures
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Stored state disagrees with the active configuration
    #[error("Consistency error: {0}")]
    Consistency(#[from] ConsistencyError),

    /// Masking and unmasking failures
    #[error("Anonymization error: {0}")]
    Anonymization(#[from] AnonymizationError),

    /// Rejected input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invariant violations inside Vigil itself
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Authentication errors
///
/// Unknown usernames and wrong secrets share [`AuthError::InvalidCredentials`]
/// so callers cannot probe for account existence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// Unknown username or wrong secret
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Correct secret for an account that has been deactivated
    #[error("Account is deactivated")]
    AccountDeactivated,

    /// Session not issued by this engine, or already closed
    #[error("Session is not open")]
    SessionClosed,
}

/// Authorization errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionError {
    /// The role table denied the capability
    #[error("Access denied: capability '{0}' is not granted to this role")]
    Denied(Capability),
}

/// Write conflicts
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictError {
    /// A user with this username already exists
    #[error("Username already exists: {0}")]
    DuplicateUsername(String),
}

/// Persistence errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    /// The backing store could not be reached or rejected the operation
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// The operation did not complete within its time limit
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Consistency errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsistencyError {
    /// A record's anonymized fields were derived under a different strategy or key set
    #[error(
        "Anonymized fields of record {record_id} were derived with fingerprint {found}, active fingerprint is {expected}"
    )]
    AnonymizationMismatch {
        record_id: RecordId,
        expected: String,
        found: String,
    },
}

/// Anonymization errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnonymizationError {
    /// Pseudonyms cannot be reversed
    #[error("Value was masked irreversibly")]
    Irreversible,

    /// Decryption or decoding of a sealed value failed
    #[error("Failed to unmask value: {0}")]
    UnmaskFailed(String),

    /// Key material is missing or malformed
    #[error("Invalid anonymization key: {0}")]
    InvalidKey(String),

    /// Encryption failed
    #[error("Failed to seal value: {0}")]
    Encryption(String),
}

impl VigilError {
    /// Short, stable label for the error kind
    ///
    /// Used in audit details and logs where the full message could carry
    /// user input.
    pub fn kind(&self) -> &'static str {
        match self {
            VigilError::Auth(_) => "auth",
            VigilError::Permission(_) => "permission",
            VigilError::NotFound { .. } => "not_found",
            VigilError::UserNotFound { .. } => "user_not_found",
            VigilError::Conflict(_) => "conflict",
            VigilError::Persistence(PersistenceError::Unavailable(_)) => "unavailable",
            VigilError::Persistence(PersistenceError::Timeout(_)) => "timeout",
            VigilError::Consistency(_) => "consistency",
            VigilError::Anonymization(_) => "anonymization",
            VigilError::Validation(_) => "validation",
            VigilError::Configuration(_) => "configuration",
            VigilError::Io(_) => "io",
            VigilError::Serialization(_) => "serialization",
            VigilError::Internal(_) => "internal",
        }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for VigilError {
    fn from(err: std::io::Error) -> Self {
        VigilError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for VigilError {
    fn from(err: serde_json::Error) -> Self {
        VigilError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for VigilError {
    fn from(err: toml::de::Error) -> Self {
        VigilError::Configuration(format!("TOML parse error: {err}"))
    }
}
