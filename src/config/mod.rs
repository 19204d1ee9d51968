//! Configuration management for Vigil.
//!
//! Vigil reads a TOML file (`vigil.toml` by default) with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `VIGIL_<SECTION>_<KEY>` environment overrides
//! - Default values for optional settings
//! - Validation on load
//!
//! # Example Configuration
//!
//! ```toml
//! [storage]
//! backend = "memory"
//! operation_timeout_ms = 5000
//!
//! [credentials]
//! memory_kib = 19456
//! iterations = 2
//!
//! [anonymization]
//! name_strategy = "pseudonym"
//! pseudonym_key = "${VIGIL_PSEUDONYM_KEY}"
//! encryption_key = "${VIGIL_ENCRYPTION_KEY}"
//!
//! [retention]
//! retention_days = 1825
//!
//! [[seed.users]]
//! username = "admin"
//! password = "${VIGIL_SEED_ADMIN_PASSWORD}"
//! role = "admin"
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use vigil::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("vigil.toml")?;
//! println!("Storage backend: {:?}", config.storage.backend);
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::{load_config, parse_config};
pub use schema::{
    AnonymizationConfig, ApplicationConfig, AuditConfig, CredentialsConfig, LoggingConfig,
    NameStrategy, PostgreSQLConfig, RetentionConfig, SeedConfig, SeedUser, StorageBackend,
    StorageConfig, VigilConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
