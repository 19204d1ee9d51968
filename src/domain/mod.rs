//! Domain models and types for Vigil.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`UserId`], [`RecordId`])
//! - **Closed permission model** ([`Role`], [`Capability`], [`Decision`])
//! - **Domain models** ([`PatientRecord`], [`RawFields`], [`User`])
//! - **Error types** ([`VigilError`] and its component enums)
//! - **Result type alias** ([`Result`])
//! - **Input validation** ([`validation`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, VigilError>`]:
//!
//! ```rust
//! use vigil::domain::{Result, Role};
//! use std::str::FromStr;
//!
//! fn parse_role(input: &str) -> Result<Role> {
//!     Role::from_str(input).map_err(vigil::domain::VigilError::Validation)
//! }
//!
//! assert_eq!(parse_role("Doctor").unwrap(), Role::Doctor);
//! ```

pub mod errors;
pub mod ids;
pub mod record;
pub mod result;
pub mod role;
pub mod user;
pub mod validation;

pub use errors::{
    AnonymizationError, AuthError, ConflictError, ConsistencyError, PermissionError,
    PersistenceError, VigilError,
};
pub use ids::{RecordId, UserId};
pub use record::{
    AnonymizedFields, AnonymizedRecordView, PatientRecord, RawDelta, RawFields, RawRecordView,
    RecordView, View,
};
pub use result::Result;
pub use role::{Capability, Decision, Role};
pub use user::{User, UserSummary};
