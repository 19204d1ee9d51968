//! Roles, capabilities and authorization decisions
//!
//! All three sets are closed. Adding a variant is a compile-time change that
//! forces every `match` over them to be revisited.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role held by an authenticated user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Hospital administrator
    Admin,
    /// Treating physician
    Doctor,
    /// Front-desk staff registering patients
    Receptionist,
}

impl Role {
    /// Every role, in table order
    pub const ALL: [Role; 3] = [Role::Admin, Role::Doctor, Role::Receptionist];

    /// Returns the lowercase name used in configuration and storage
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::Receptionist => "receptionist",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "doctor" => Ok(Role::Doctor),
            "receptionist" => Ok(Role::Receptionist),
            other => Err(format!(
                "Invalid role '{other}'. Must be one of: admin, doctor, receptionist"
            )),
        }
    }
}

/// Permission required to perform an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Read raw patient fields
    ReadRaw,
    /// Read the anonymized projection of a record
    ReadAnonymized,
    /// Create or modify raw patient fields
    WriteRaw,
    /// Recover a sealed value
    Unmask,
    /// Query the audit log
    ViewAuditLog,
    /// Administer user accounts and data retention
    ManageUsers,
    /// Recompute anonymized projections
    TriggerAnonymize,
}

impl Capability {
    /// Every capability, in table order
    pub const ALL: [Capability; 7] = [
        Capability::ReadRaw,
        Capability::ReadAnonymized,
        Capability::WriteRaw,
        Capability::Unmask,
        Capability::ViewAuditLog,
        Capability::ManageUsers,
        Capability::TriggerAnonymize,
    ];

    /// Returns the snake_case name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Capability::ReadRaw => "read_raw",
            Capability::ReadAnonymized => "read_anonymized",
            Capability::WriteRaw => "write_raw",
            Capability::Unmask => "unmask",
            Capability::ViewAuditLog => "view_audit_log",
            Capability::ManageUsers => "manage_users",
            Capability::TriggerAnonymize => "trigger_anonymize",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an authorization check, also recorded on every audit entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Granted,
    Denied,
}

impl Decision {
    pub const fn is_granted(&self) -> bool {
        matches!(self, Decision::Granted)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Decision::Granted => "granted",
            Decision::Denied => "denied",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "granted" => Ok(Decision::Granted),
            "denied" => Ok(Decision::Denied),
            other => Err(format!("Invalid decision '{other}'")),
        }
    }
}
