//! Audit entry types

use crate::domain::{Decision, RecordId, Role, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of action an audit entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Login,
    Logout,
    ChangeSecret,
    CreateRecord,
    UpdateRecord,
    DeleteRecord,
    ReadRecord,
    ListRecords,
    UnmaskContact,
    TriggerAnonymize,
    ViewAudit,
    ProvisionUser,
    ReassignRole,
    DeactivateUser,
    ListUsers,
    PurgeExpired,
}

impl AuditAction {
    pub const ALL: [AuditAction; 16] = [
        AuditAction::Login,
        AuditAction::Logout,
        AuditAction::ChangeSecret,
        AuditAction::CreateRecord,
        AuditAction::UpdateRecord,
        AuditAction::DeleteRecord,
        AuditAction::ReadRecord,
        AuditAction::ListRecords,
        AuditAction::UnmaskContact,
        AuditAction::TriggerAnonymize,
        AuditAction::ViewAudit,
        AuditAction::ProvisionUser,
        AuditAction::ReassignRole,
        AuditAction::DeactivateUser,
        AuditAction::ListUsers,
        AuditAction::PurgeExpired,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Login => "login",
            AuditAction::Logout => "logout",
            AuditAction::ChangeSecret => "change_secret",
            AuditAction::CreateRecord => "create_record",
            AuditAction::UpdateRecord => "update_record",
            AuditAction::DeleteRecord => "delete_record",
            AuditAction::ReadRecord => "read_record",
            AuditAction::ListRecords => "list_records",
            AuditAction::UnmaskContact => "unmask_contact",
            AuditAction::TriggerAnonymize => "trigger_anonymize",
            AuditAction::ViewAudit => "view_audit",
            AuditAction::ProvisionUser => "provision_user",
            AuditAction::ReassignRole => "reassign_role",
            AuditAction::DeactivateUser => "deactivate_user",
            AuditAction::ListUsers => "list_users",
            AuditAction::PurgeExpired => "purge_expired",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AuditAction::ALL
            .iter()
            .copied()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| format!("Invalid audit action '{s}'"))
    }
}

/// One immutable line of the audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the log, assigned at append
    pub seq: u64,

    /// Absent for a login attempt naming an unknown user
    pub actor_id: Option<UserId>,

    /// Role at the time of the action
    pub actor_role: Option<Role>,

    pub action: AuditAction,

    pub target_id: Option<RecordId>,

    pub outcome: Decision,

    pub timestamp: DateTime<Utc>,

    /// Free-form context; never carries raw field values or secrets
    pub details: String,
}

/// An entry waiting for its sequence number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEntry {
    pub actor_id: Option<UserId>,
    pub actor_role: Option<Role>,
    pub action: AuditAction,
    pub target_id: Option<RecordId>,
    pub outcome: Decision,
    pub timestamp: DateTime<Utc>,
    pub details: String,
}

impl NewAuditEntry {
    /// Entry attributed to a known principal
    pub fn new(actor_id: UserId, actor_role: Role, action: AuditAction, outcome: Decision) -> Self {
        Self {
            actor_id: Some(actor_id),
            actor_role: Some(actor_role),
            action,
            target_id: None,
            outcome,
            timestamp: Utc::now(),
            details: String::new(),
        }
    }

    /// Entry without an identified actor
    pub fn anonymous(action: AuditAction, outcome: Decision) -> Self {
        Self {
            actor_id: None,
            actor_role: None,
            action,
            target_id: None,
            outcome,
            timestamp: Utc::now(),
            details: String::new(),
        }
    }

    pub fn with_target(mut self, target: Option<RecordId>) -> Self {
        self.target_id = target;
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    /// Seals the entry at position `seq`
    pub fn into_entry(self, seq: u64) -> AuditEntry {
        AuditEntry {
            seq,
            actor_id: self.actor_id,
            actor_role: self.actor_role,
            action: self.action,
            target_id: self.target_id,
            outcome: self.outcome,
            timestamp: self.timestamp,
            details: self.details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names_roundtrip() {
        for action in AuditAction::ALL {
            assert_eq!(action.as_str().parse::<AuditAction>().unwrap(), action);
        }
        assert!("drop_table".parse::<AuditAction>().is_err());
    }

    #[test]
    fn test_action_serializes_snake_case() {
        let json = serde_json::to_string(&AuditAction::TriggerAnonymize).unwrap();
        assert_eq!(json, "\"trigger_anonymize\"");
    }

    #[test]
    fn test_into_entry_keeps_fields() {
        let user = UserId::new();
        let record = RecordId::new();
        let entry = NewAuditEntry::new(user, Role::Doctor, AuditAction::ReadRecord, Decision::Denied)
            .with_target(Some(record))
            .with_details("view=raw")
            .into_entry(7);

        assert_eq!(entry.seq, 7);
        assert_eq!(entry.actor_id, Some(user));
        assert_eq!(entry.actor_role, Some(Role::Doctor));
        assert_eq!(entry.target_id, Some(record));
        assert_eq!(entry.outcome, Decision::Denied);
        assert_eq!(entry.details, "view=raw");
    }

    #[test]
    fn test_anonymous_entry_has_no_actor() {
        let entry = NewAuditEntry::anonymous(AuditAction::Login, Decision::Denied).into_entry(1);
        assert!(entry.actor_id.is_none());
        assert!(entry.actor_role.is_none());
    }
}
