//! Audit trail
//!
//! Every attempted operation, granted or denied, becomes one [`AuditEntry`].
//! Entries are append-only: the normal interface offers no way to edit or
//! remove them. Reading requires the `ViewAuditLog` capability, enforced by
//! the engine.

pub mod entry;
pub mod jsonl;
pub mod log;
pub mod query;

pub use entry::{AuditAction, AuditEntry, NewAuditEntry};
pub use jsonl::{read_json_lines, JsonLinesWriter};
pub use log::{write_export, AuditLog};
pub use query::AuditQuery;
