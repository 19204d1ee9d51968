//! Storage backends for Vigil.
//!
//! - [`database`] - Repository traits, the [`Storage`](database::Storage) bundle and time limits
//! - [`memory`] - In-process backend with outage simulation
//! - [`postgresql`] - PostgreSQL backend on a `deadpool-postgres` pool
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern**: the engine only sees the
//! `UserRepository`, `RecordRepository` and `AuditRepository` traits, and the
//! factory picks the implementation from configuration.
//!
//! ```rust,no_run
//! use vigil::adapters::database::create_storage;
//! use vigil::config::load_config;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("vigil.toml")?;
//! let storage = create_storage(&config.storage).await?;
//! println!("Using {} storage", storage.backend_name());
//! # Ok(())
//! # }
//! ```

pub mod database;
pub mod memory;
pub mod postgresql;
