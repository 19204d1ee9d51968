//! Audit log filters

use super::entry::{AuditAction, AuditEntry};
use crate::domain::{Decision, RecordId, Role, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Filter over the audit log; every field set must match
///
/// ```
/// use vigil::audit::{AuditAction, AuditQuery};
/// use vigil::domain::Role;
///
/// let query = AuditQuery::new()
///     .role(Role::Doctor)
///     .action(AuditAction::ReadRecord)
///     .limit(50);
/// assert_eq!(query.limit, Some(50));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditQuery {
    pub role: Option<Role>,
    pub actor: Option<UserId>,
    pub action: Option<AuditAction>,
    pub target: Option<RecordId>,
    pub outcome: Option<Decision>,
    /// Inclusive lower bound
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper bound
    pub until: Option<DateTime<Utc>>,
    /// Maximum number of entries, taken from the lowest `seq`
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn actor(mut self, actor: UserId) -> Self {
        self.actor = Some(actor);
        self
    }

    pub fn action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn target(mut self, target: RecordId) -> Self {
        self.target = Some(target);
        self
    }

    pub fn outcome(mut self, outcome: Decision) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `entry` passes every filter (ignores `limit`)
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.role.map_or(true, |role| entry.actor_role == Some(role))
            && self.actor.map_or(true, |actor| entry.actor_id == Some(actor))
            && self.action.map_or(true, |action| entry.action == action)
            && self.target.map_or(true, |target| entry.target_id == Some(target))
            && self.outcome.map_or(true, |outcome| entry.outcome == outcome)
            && self.since.map_or(true, |since| entry.timestamp >= since)
            && self.until.map_or(true, |until| entry.timestamp < until)
    }

    /// Compact description for audit details
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(role) = self.role {
            parts.push(format!("role={role}"));
        }
        if let Some(actor) = self.actor {
            parts.push(format!("actor={actor}"));
        }
        if let Some(action) = self.action {
            parts.push(format!("action={action}"));
        }
        if let Some(target) = self.target {
            parts.push(format!("target={target}"));
        }
        if let Some(outcome) = self.outcome {
            parts.push(format!("outcome={outcome}"));
        }
        if let Some(since) = self.since {
            parts.push(format!("since={}", since.to_rfc3339()));
        }
        if let Some(until) = self.until {
            parts.push(format!("until={}", until.to_rfc3339()));
        }
        if let Some(limit) = self.limit {
            parts.push(format!("limit={limit}"));
        }
        if parts.is_empty() {
            "filter=none".to_string()
        } else {
            parts.join(" ")
        }
    }
}
