//! Patient record lifecycle
//!
//! [`RecordStore`] owns the canonical state of every record: raw fields plus
//! the anonymized projection derived from them. Access decisions are made by
//! the engine before any method here is called.

pub mod locks;
pub mod store;

pub use locks::RecordLocks;
pub use store::{AnonymizeTarget, RecordStore};
