//! Audit-export command implementation
//!
//! Writes audit entries to a JSON-lines file. The log itself is not
//! modified apart from the `view_audit` entry recording the export.

use super::{admin_session, finish, report, EXIT_SUCCESS};
use crate::audit::{AuditAction, AuditQuery};
use crate::domain::{Decision, RecordId};
use chrono::{DateTime, Utc};
use clap::Args;

/// Arguments for the audit-export command
#[derive(Args, Debug)]
pub struct AuditExportArgs {
    /// Output file (overwritten)
    #[arg(short, long)]
    pub output: String,

    /// Only entries for this action (e.g. read_record)
    #[arg(long)]
    pub action: Option<AuditAction>,

    /// Only granted or denied entries
    #[arg(long)]
    pub outcome: Option<Decision>,

    /// Only entries targeting this record
    #[arg(long, value_name = "RECORD_ID")]
    pub target: Option<RecordId>,

    /// Entries at or after this time (RFC 3339)
    #[arg(long)]
    pub since: Option<DateTime<Utc>>,

    /// Entries before this time (RFC 3339)
    #[arg(long)]
    pub until: Option<DateTime<Utc>>,
}

impl AuditExportArgs {
    pub fn query(&self) -> AuditQuery {
        let mut query = AuditQuery::new();
        if let Some(action) = self.action {
            query = query.action(action);
        }
        if let Some(outcome) = self.outcome {
            query = query.outcome(outcome);
        }
        if let Some(target) = self.target {
            query = query.target(target);
        }
        if let Some(since) = self.since {
            query = query.since(since);
        }
        if let Some(until) = self.until {
            query = query.until(until);
        }
        query
    }

    /// Execute the audit-export command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let query = self.query();
        tracing::info!(output = %self.output, filter = %query.describe(), "Exporting audit log");

        let (engine, session) = match admin_session(config_path).await {
            Ok(opened) => opened,
            Err(e) => return Ok(report("Failed to start export", &e)),
        };

        println!("📤 Exporting audit entries to {}", self.output);
        let result = engine.export_audit(&session, query, &self.output).await;

        let code = match result {
            Ok(count) => {
                println!("✅ {count} entr{} exported", if count == 1 { "y" } else { "ies" });
                EXIT_SUCCESS
            }
            Err(e) => report("Export failed", &e),
        };
        Ok(finish(&engine, &session, code).await)
    }
}
