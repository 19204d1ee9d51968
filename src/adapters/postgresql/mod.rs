//! PostgreSQL storage backend
//!
//! Stores users, patient records and audit entries in three tables created by
//! `migrations/001_initial_schema.sql`.

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::PostgreSQLStorage;
pub use client::PostgreSQLClient;
