//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Vigil configuration file, including its key material.

use super::{report, EXIT_SUCCESS};
use crate::access::capabilities_for;
use crate::anonymization::Anonymizer;
use crate::config::{load_config, StorageBackend};
use crate::credentials::CredentialHasher;
use crate::domain::{Capability, Role};
use clap::Args;
use secrecy::ExposeSecret;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(config) => {
                println!("✅ Configuration file loaded and validated");
                config
            }
            Err(e) => return Ok(report("Configuration is invalid", &e)),
        };

        let anonymizer = match Anonymizer::from_config(&config.anonymization) {
            Ok(anonymizer) => anonymizer,
            Err(e) => return Ok(report("Anonymization keys are unusable", &e)),
        };
        if let Err(e) = CredentialHasher::new(&config.credentials) {
            return Ok(report("Credential hashing parameters are unusable", &e));
        }
        println!("✅ Keys and hashing parameters are usable");
        println!();

        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        match config.storage.backend {
            StorageBackend::Memory => println!("  Storage: memory (not persistent)"),
            StorageBackend::PostgreSQL => {
                if let Some(ref pg_config) = config.storage.postgresql {
                    println!("  Storage: PostgreSQL");
                    println!(
                        "  PostgreSQL Connection: {}",
                        pg_config
                            .connection_string
                            .expose_secret()
                            .as_str()
                            .rsplit_once('@')
                            .map_or("***", |(_, host)| host)
                    );
                    println!("  Max Connections: {}", pg_config.max_connections);
                }
            }
        }
        println!(
            "  Operation Timeout: {}ms",
            config.storage.operation_timeout_ms
        );
        println!("  Name Strategy: {}", config.anonymization.name_strategy.as_str());
        println!("  Anonymizer Fingerprint: {}", anonymizer.fingerprint());
        println!("  Retention: {} days", config.retention.retention_days);
        println!("  Seed Accounts: {}", config.seed.users.len());
        match config.audit.mirror_path {
            Some(ref path) => println!("  Audit Mirror: {path}"),
            None => println!("  Audit Mirror: disabled"),
        }
        println!();

        println!("Role Capabilities:");
        for role in [Role::Admin, Role::Doctor, Role::Receptionist] {
            let capabilities: Vec<String> = capabilities_for(role)
                .iter()
                .map(Capability::to_string)
                .collect();
            println!("  {role}: {}", capabilities.join(", "));
        }
        println!();
        Ok(EXIT_SUCCESS)
    }
}
