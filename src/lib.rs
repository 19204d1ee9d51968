// Vigil - Access control and audit core for patient records
// Copyright (c) 2025 Vigil Contributors
// Licensed under the MIT License

//! # Vigil - privacy-aware access control and audit
//!
//! Vigil guards patient records in a hospital system. Every read and write
//! goes through a closed role table, sensitive fields are kept alongside an
//! anonymized projection, and every attempted operation is written to an
//! append-only audit log.
//!
//! ## Overview
//!
//! The library provides:
//! - **Credentials**: Argon2id-hashed accounts with roles and deactivation
//! - **Anonymization**: keyed pseudonyms, sealed (reversible) values and
//!   masked contact numbers
//! - **Access control**: a compile-time role/capability table applied to
//!   every operation by one [`access::Engine`]
//! - **Records**: raw fields and their anonymized projection, written together
//! - **Audit**: a gap-free, ordered log of granted and denied attempts
//!
//! ## Architecture
//!
//! - [`access`] - Role table, sessions and the engine that mediates all operations
//! - [`credentials`] - User accounts and secret hashing
//! - [`anonymization`] - Masking strategies and projection derivation
//! - [`records`] - Patient record lifecycle
//! - [`audit`] - Audit entries, queries and the append-only log
//! - [`adapters`] - Storage backends (in-memory, PostgreSQL)
//! - [`domain`] - Core domain types, errors and validation
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//! - [`cli`] - Operator command-line interface
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vigil::access::Engine;
//! use vigil::config::{load_config, secret_string};
//! use vigil::domain::{RawFields, View};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("vigil.toml")?;
//!     let engine = Engine::from_config(&config).await?;
//!
//!     let session = engine
//!         .login("reception", &secret_string("front-desk".to_string()))
//!         .await?;
//!     let id = engine
//!         .create_record(
//!             &session,
//!             RawFields::new("John Doe", "555-111-4592", "Seasonal influenza"),
//!         )
//!         .await?;
//!
//!     println!("Created record {id}");
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Every operation returns [`domain::Result`], whose error type is
//! [`domain::VigilError`]. Authentication failures never reveal whether a
//! username exists.
//!
//! ## Logging
//!
//! Vigil uses structured logging with the `tracing` crate. Raw patient fields
//! and secrets are never logged; consistency violations are logged under the
//! `vigil::consistency` target.

pub mod access;
pub mod adapters;
pub mod anonymization;
pub mod audit;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod domain;
pub mod logging;
pub mod records;
