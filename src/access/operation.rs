//! Operations routed through the engine and their results

use crate::audit::{AuditAction, AuditEntry, AuditQuery};
use crate::config::SecretString;
use crate::domain::{
    Capability, RawDelta, RawFields, RecordId, RecordView, Role, UserId, UserSummary, View,
};
use crate::records::AnonymizeTarget;
use chrono::{DateTime, Utc};

/// A data operation requested by a session
#[derive(Debug)]
pub enum Operation {
    CreateRecord { raw: RawFields },
    UpdateRecord { id: RecordId, delta: RawDelta },
    /// Remove one record; its audit history is kept
    DeleteRecord { id: RecordId },
    ReadRecord { id: RecordId, view: View },
    ListRecords { view: View },
    UnmaskContact { id: RecordId },
    TriggerAnonymize { target: AnonymizeTarget },
    ViewAudit { query: AuditQuery },
    ProvisionUser {
        username: String,
        secret: SecretString,
        role: Role,
    },
    ReassignRole { username: String, role: Role },
    DeactivateUser { username: String },
    ListUsers,
    PurgeExpired { now: DateTime<Utc> },
}

impl Operation {
    /// Capability the caller's role must hold
    pub const fn required_capability(&self) -> Capability {
        match self {
            Operation::CreateRecord { .. } | Operation::UpdateRecord { .. } => Capability::WriteRaw,
            Operation::ReadRecord { view, .. } | Operation::ListRecords { view } => match view {
                View::Raw => Capability::ReadRaw,
                View::Anonymized => Capability::ReadAnonymized,
            },
            Operation::UnmaskContact { .. } => Capability::Unmask,
            Operation::TriggerAnonymize { .. } => Capability::TriggerAnonymize,
            Operation::ViewAudit { .. } => Capability::ViewAuditLog,
            Operation::ProvisionUser { .. }
            | Operation::ReassignRole { .. }
            | Operation::DeactivateUser { .. }
            | Operation::ListUsers
            | Operation::DeleteRecord { .. }
            | Operation::PurgeExpired { .. } => Capability::ManageUsers,
        }
    }

    pub const fn action(&self) -> AuditAction {
        match self {
            Operation::CreateRecord { .. } => AuditAction::CreateRecord,
            Operation::UpdateRecord { .. } => AuditAction::UpdateRecord,
            Operation::DeleteRecord { .. } => AuditAction::DeleteRecord,
            Operation::ReadRecord { .. } => AuditAction::ReadRecord,
            Operation::ListRecords { .. } => AuditAction::ListRecords,
            Operation::UnmaskContact { .. } => AuditAction::UnmaskContact,
            Operation::TriggerAnonymize { .. } => AuditAction::TriggerAnonymize,
            Operation::ViewAudit { .. } => AuditAction::ViewAudit,
            Operation::ProvisionUser { .. } => AuditAction::ProvisionUser,
            Operation::ReassignRole { .. } => AuditAction::ReassignRole,
            Operation::DeactivateUser { .. } => AuditAction::DeactivateUser,
            Operation::ListUsers => AuditAction::ListUsers,
            Operation::PurgeExpired { .. } => AuditAction::PurgeExpired,
        }
    }

    /// Record the operation targets, if any
    pub fn target(&self) -> Option<RecordId> {
        match self {
            Operation::UpdateRecord { id, .. }
            | Operation::DeleteRecord { id }
            | Operation::ReadRecord { id, .. }
            | Operation::UnmaskContact { id } => Some(*id),
            Operation::TriggerAnonymize { target } => target.record_id(),
            _ => None,
        }
    }

    /// Audit details; names fields and parameters, never raw values or secrets
    pub fn describe(&self) -> String {
        match self {
            Operation::CreateRecord { .. } => "fields=name,contact,diagnosis".to_string(),
            Operation::UpdateRecord { delta, .. } => {
                format!("fields={}", delta.changed_fields().join(","))
            }
            Operation::ReadRecord { view, .. } | Operation::ListRecords { view } => {
                format!("view={view}")
            }
            Operation::UnmaskContact { .. } => "field=contact".to_string(),
            Operation::DeleteRecord { .. } => String::new(),
            Operation::TriggerAnonymize { target } => format!("scope={target}"),
            Operation::ViewAudit { query } => query.describe(),
            Operation::ProvisionUser { username, role, .. } => {
                format!("username={username} role={role}")
            }
            Operation::ReassignRole { username, role } => {
                format!("username={username} role={role}")
            }
            Operation::DeactivateUser { username } => format!("username={username}"),
            Operation::ListUsers => String::new(),
            Operation::PurgeExpired { now } => format!("now={}", now.to_rfc3339()),
        }
    }
}

/// Result of a successful operation
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Created(RecordId),
    Updated(RecordId),
    Deleted(RecordId),
    Record(RecordView),
    Records(Vec<RecordView>),
    Contact(String),
    Anonymized(usize),
    Audit(Vec<AuditEntry>),
    UserProvisioned(UserId),
    RoleReassigned,
    UserDeactivated,
    Users(Vec<UserSummary>),
    Purged(usize),
}

impl Outcome {
    /// Variant name, free of any carried values
    pub(crate) const fn label(&self) -> &'static str {
        match self {
            Outcome::Created(_) => "created",
            Outcome::Updated(_) => "updated",
            Outcome::Deleted(_) => "deleted",
            Outcome::Record(_) => "record",
            Outcome::Records(_) => "records",
            Outcome::Contact(_) => "contact",
            Outcome::Anonymized(_) => "anonymized",
            Outcome::Audit(_) => "audit",
            Outcome::UserProvisioned(_) => "user_provisioned",
            Outcome::RoleReassigned => "role_reassigned",
            Outcome::UserDeactivated => "user_deactivated",
            Outcome::Users(_) => "users",
            Outcome::Purged(_) => "purged",
        }
    }

    /// Short summary for audit details
    pub(crate) fn describe(&self) -> String {
        match self {
            Outcome::Created(id) | Outcome::Updated(id) | Outcome::Deleted(id) => {
                format!("record={id}")
            }
            Outcome::Record(_) | Outcome::Contact(_) | Outcome::RoleReassigned
            | Outcome::UserDeactivated => String::new(),
            Outcome::Records(records) => format!("count={}", records.len()),
            Outcome::Anonymized(count) | Outcome::Purged(count) => format!("count={count}"),
            Outcome::Audit(entries) => format!("count={}", entries.len()),
            Outcome::UserProvisioned(id) => format!("user={id}"),
            Outcome::Users(users) => format!("count={}", users.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;

    #[test]
    fn test_required_capabilities() {
        let id = RecordId::new();
        let cases = [
            (
                Operation::CreateRecord {
                    raw: RawFields::new("John Doe", "555-111-4592", "Seasonal influenza"),
                },
                Capability::WriteRaw,
            ),
            (
                Operation::UpdateRecord {
                    id,
                    delta: RawDelta::new().with_name("Jane Doe"),
                },
                Capability::WriteRaw,
            ),
            (Operation::ReadRecord { id, view: View::Raw }, Capability::ReadRaw),
            (
                Operation::ReadRecord {
                    id,
                    view: View::Anonymized,
                },
                Capability::ReadAnonymized,
            ),
            (Operation::ListRecords { view: View::Raw }, Capability::ReadRaw),
            (Operation::UnmaskContact { id }, Capability::Unmask),
            (
                Operation::TriggerAnonymize {
                    target: AnonymizeTarget::All,
                },
                Capability::TriggerAnonymize,
            ),
            (
                Operation::ViewAudit {
                    query: AuditQuery::new(),
                },
                Capability::ViewAuditLog,
            ),
            (Operation::ListUsers, Capability::ManageUsers),
            (Operation::DeleteRecord { id }, Capability::ManageUsers),
            (Operation::PurgeExpired { now: Utc::now() }, Capability::ManageUsers),
        ];

        for (operation, capability) in cases {
            assert_eq!(operation.required_capability(), capability, "{operation:?}");
        }
    }

    #[test]
    fn test_describe_never_contains_values() {
        let create = Operation::CreateRecord {
            raw: RawFields::new("John Doe", "555-111-4592", "Seasonal influenza"),
        };
        let details = create.describe();
        assert!(!details.contains("John"));
        assert!(!details.contains("4592"));

        let update = Operation::UpdateRecord {
            id: RecordId::new(),
            delta: RawDelta::new().with_contact("555-999-0000"),
        };
        assert_eq!(update.describe(), "fields=contact");

        let provision = Operation::ProvisionUser {
            username: "dr.bob".to_string(),
            secret: secret_string("stethoscope".to_string()),
            role: Role::Doctor,
        };
        assert!(!provision.describe().contains("stethoscope"));
        assert!(!format!("{provision:?}").contains("stethoscope"));
    }

    #[test]
    fn test_targets() {
        let id = RecordId::new();
        assert_eq!(Operation::UnmaskContact { id }.target(), Some(id));
        assert_eq!(Operation::DeleteRecord { id }.target(), Some(id));
        assert_eq!(Operation::DeleteRecord { id }.action(), AuditAction::DeleteRecord);
        assert_eq!(Operation::ListUsers.target(), None);
        assert_eq!(
            Operation::TriggerAnonymize {
                target: AnonymizeTarget::All
            }
            .target(),
            None
        );
    }
}
