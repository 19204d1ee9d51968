//! Storage factory
//!
//! Builds the repositories for the backend named in `storage.backend`.

use super::Storage;
use crate::adapters::postgresql::{PostgreSQLClient, PostgreSQLStorage};
use crate::config::{StorageBackend, StorageConfig};
use crate::domain::{Result, VigilError};
use std::sync::Arc;

/// Create the storage backend selected by the configuration
///
/// For PostgreSQL the connection is tested and the schema created before the
/// storage is returned.
///
/// # Errors
///
/// Returns a configuration error if the PostgreSQL section is missing, or a
/// persistence error if the database cannot be reached.
pub async fn create_storage(config: &StorageConfig) -> Result<Storage> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::info!("Creating in-memory storage");
            let (storage, _) = Storage::memory();
            Ok(storage)
        }
        StorageBackend::PostgreSQL => {
            let pg_config = config.postgresql.as_ref().ok_or_else(|| {
                VigilError::Configuration(
                    "storage.postgresql section is required when backend = \"postgresql\""
                        .to_string(),
                )
            })?;

            tracing::info!("Creating PostgreSQL storage");
            let client = Arc::new(PostgreSQLClient::new(pg_config.clone()).await?);
            tracing::info!(
                connection = %client.connection_string_safe(),
                "Connecting to PostgreSQL"
            );
            client.test_connection().await?;
            client.ensure_schema().await?;

            let storage = Arc::new(PostgreSQLStorage::new_with_arc(client));
            Ok(Storage::from_backend(storage, "postgresql"))
        }
    }
}
