//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - Console output with configurable log levels
//! - JSON-formatted local log files with rotation
//! - Event macros for access decisions, consistency violations and retries
//!
//! Raw patient fields and secrets are never passed to these macros.
//!
//! # Example
//!
//! ```no_run
//! use vigil::logging::init_logging;
//! use vigil::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Vigil started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Target used for consistency violations so they can be routed separately
pub const CONSISTENCY_TARGET: &str = "vigil::consistency";

/// Log a denied access decision
///
/// # Example
///
/// ```no_run
/// use vigil::log_access_denied;
/// use vigil::domain::{Capability, Role, UserId};
///
/// let user = UserId::new();
/// log_access_denied!(user, Role::Doctor, Capability::ReadRaw, "read_record");
/// ```
#[macro_export]
macro_rules! log_access_denied {
    ($user_id:expr, $role:expr, $capability:expr, $action:expr) => {
        tracing::warn!(
            user_id = %$user_id,
            role = %$role,
            capability = %$capability,
            action = %$action,
            "Access denied"
        );
    };
}

/// Log a record whose anonymized projection no longer matches the active anonymizer
///
/// # Example
///
/// ```no_run
/// use vigil::log_consistency_violation;
/// use vigil::domain::RecordId;
///
/// let record_id = RecordId::new();
/// log_consistency_violation!(record_id, "abc123", "def456");
/// ```
#[macro_export]
macro_rules! log_consistency_violation {
    ($record_id:expr, $expected:expr, $found:expr) => {
        tracing::error!(
            target: $crate::logging::CONSISTENCY_TARGET,
            record_id = %$record_id,
            expected_fingerprint = %$expected,
            found_fingerprint = %$found,
            "Anonymized projection is out of date"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use vigil::log_error_with_context;
/// use vigil::domain::VigilError;
///
/// let error = VigilError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use vigil::log_retry_attempt;
///
/// log_retry_attempt!(1, 2, "storage unavailable");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            reason = $reason,
            "Retrying operation"
        );
    };
}

#[cfg(test)]
mod tests {
    use crate::domain::{Capability, RecordId, Role, UserId, VigilError};

    #[test]
    fn test_macros_expand_without_subscriber() {
        log_access_denied!(UserId::new(), Role::Doctor, Capability::ReadRaw, "read_record");
        log_consistency_violation!(RecordId::new(), "expected", "found");
        log_error_with_context!(&VigilError::Internal("boom".to_string()), "unit test");
        log_retry_attempt!(1u32, 2u32, "unit test");
    }

    #[test]
    fn test_consistency_target_matches_macro() {
        assert_eq!(super::CONSISTENCY_TARGET, "vigil::consistency");
    }
}
