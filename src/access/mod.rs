//! Access control
//!
//! Roles map to capabilities through a closed, compile-time table
//! ([`authorize`]). The [`Engine`] applies it to every operation and records
//! each decision in the audit log.

pub mod engine;
pub mod grant;
pub mod operation;
pub mod session;
pub mod table;

pub use engine::Engine;
pub use grant::UnmaskGrant;
pub use operation::{Operation, Outcome};
pub use session::Session;
pub use table::{authorize, capabilities_for};

pub use crate::records::AnonymizeTarget;
