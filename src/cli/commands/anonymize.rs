//! Anonymize-all command implementation
//!
//! Re-derives anonymized fields, typically after a key rotation. Runs as an
//! administrator and is audited like any other `TriggerAnonymize`.

use super::{admin_session, finish, report, EXIT_SUCCESS};
use crate::access::AnonymizeTarget;
use crate::domain::RecordId;
use clap::Args;

/// Arguments for the anonymize-all command
#[derive(Args, Debug)]
pub struct AnonymizeArgs {
    /// Only re-derive this record
    #[arg(long, value_name = "RECORD_ID")]
    pub record: Option<RecordId>,
}

impl AnonymizeArgs {
    pub fn target(&self) -> AnonymizeTarget {
        self.record.map_or(AnonymizeTarget::All, AnonymizeTarget::Record)
    }

    /// Execute the anonymize-all command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let target = self.target();
        tracing::info!(target = %target, "Starting anonymization run");

        let (engine, session) = match admin_session(config_path).await {
            Ok(opened) => opened,
            Err(e) => return Ok(report("Failed to start anonymization", &e)),
        };

        println!("🔐 Re-deriving anonymized fields ({target})");
        println!("   Fingerprint: {}", engine.fingerprint());

        let result = engine.anonymize(&session, target).await;

        let code = match result {
            Ok(count) => {
                println!("✅ {count} record(s) re-derived");
                EXIT_SUCCESS
            }
            Err(e) => report("Anonymization failed", &e),
        };
        Ok(finish(&engine, &session, code).await)
    }
}
