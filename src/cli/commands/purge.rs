//! Purge-expired command implementation
//!
//! Applies the retention period from `[retention]`.

use super::{admin_session, finish, report, EXIT_SUCCESS};
use chrono::{DateTime, Utc};
use clap::Args;

/// Arguments for the purge-expired command
#[derive(Args, Debug)]
pub struct PurgeArgs {
    /// Reference time for the retention cutoff (RFC 3339, default now)
    #[arg(long, value_name = "TIMESTAMP")]
    pub as_of: Option<DateTime<Utc>>,
}

impl PurgeArgs {
    /// Execute the purge-expired command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let now = self.as_of.unwrap_or_else(Utc::now);
        tracing::info!(as_of = %now, "Starting retention purge");

        let (engine, session) = match admin_session(config_path).await {
            Ok(opened) => opened,
            Err(e) => return Ok(report("Failed to start purge", &e)),
        };

        println!("🗑️  Purging records past retention (as of {})", now.to_rfc3339());
        let result = engine.purge_expired(&session, now).await;

        let code = match result {
            Ok(count) => {
                println!("✅ {count} record(s) purged");
                EXIT_SUCCESS
            }
            Err(e) => report("Purge failed", &e),
        };
        Ok(finish(&engine, &session, code).await)
    }
}
