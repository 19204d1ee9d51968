//! CLI interface and argument parsing
//!
//! This module provides the operator command-line interface for Vigil using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Vigil - access control and audit for patient records
#[derive(Parser, Debug)]
#[command(name = "vigil")]
#[command(version, about, long_about = None)]
#[command(author = "Vigil Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "vigil.toml", env = "VIGIL_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "VIGIL_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new configuration file with fresh keys
    Init(commands::init::InitArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Create the accounts listed under [seed] that do not exist yet
    SeedUsers(commands::seed::SeedArgs),

    /// Re-derive anonymized fields under the active keys
    AnonymizeAll(commands::anonymize::AnonymizeArgs),

    /// Delete records older than the retention period
    PurgeExpired(commands::purge::PurgeArgs),

    /// Write audit entries to a JSON-lines file
    AuditExport(commands::audit_export::AuditExportArgs),
}
