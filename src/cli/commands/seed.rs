//! Seed-users command implementation
//!
//! Creates the `[seed]` accounts that do not exist yet. On an empty
//! deployment the first listed admin is bootstrapped and then provisions the
//! rest; otherwise an existing administrator does.

use super::{admin_credentials, report, EXIT_SUCCESS};
use crate::access::{Engine, Session};
use crate::config::{load_config, SeedConfig, StorageBackend};
use crate::domain::{ConflictError, PermissionError, Result, Role, VigilError};
use clap::Args;

/// Arguments for the seed-users command
#[derive(Args, Debug)]
pub struct SeedArgs {}

/// Usernames created and skipped by a seeding run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedSummary {
    pub created: Vec<String>,
    pub existing: Vec<String>,
}

impl SeedArgs {
    /// Execute the seed-users command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Seeding user accounts");

        let config = match load_config(config_path) {
            Ok(config) => config,
            Err(e) => return Ok(report("Failed to load configuration file", &e)),
        };
        if config.storage.backend == StorageBackend::Memory {
            println!("⚠️  Memory backend: accounts will not outlive this process");
        }

        let engine = match Engine::from_config(&config).await {
            Ok(engine) => engine,
            Err(e) => return Ok(report("Failed to open storage", &e)),
        };

        match seed_users(&engine, &config.seed).await {
            Ok(summary) => {
                println!("✅ Seeding complete");
                println!("   Created: {}", summary.created.len());
                for username in &summary.created {
                    println!("     - {username}");
                }
                println!("   Already present: {}", summary.existing.len());
                Ok(EXIT_SUCCESS)
            }
            Err(e) => Ok(report("Seeding failed", &e)),
        }
    }
}

/// Create every seed account missing from storage
pub async fn seed_users(engine: &Engine, seed: &SeedConfig) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();
    let session = open_session(engine, seed, &mut summary).await?;

    for user in &seed.users {
        if summary.created.contains(&user.username) {
            continue;
        }
        match engine
            .provision_user(&session, &user.username, user.password.clone(), user.role)
            .await
        {
            Ok(_) => summary.created.push(user.username.clone()),
            Err(VigilError::Conflict(ConflictError::DuplicateUsername(_))) => {
                summary.existing.push(user.username.clone());
            }
            Err(e) => return Err(e),
        }
    }

    engine.logout(&session).await?;
    tracing::info!(
        created = summary.created.len(),
        existing = summary.existing.len(),
        "Seeding finished"
    );
    Ok(summary)
}

async fn open_session(
    engine: &Engine,
    seed: &SeedConfig,
    summary: &mut SeedSummary,
) -> Result<Session> {
    if let Some(admin) = seed.users.iter().find(|user| user.role == Role::Admin) {
        match engine.bootstrap_admin(&admin.username, &admin.password).await {
            Ok(_) => {
                summary.created.push(admin.username.clone());
                return engine.login(&admin.username, &admin.password).await;
            }
            Err(VigilError::Permission(PermissionError::Denied(_))) => {
                tracing::debug!("Accounts already exist; skipping bootstrap");
            }
            Err(e) => return Err(e),
        }
    }

    let (username, secret) = admin_credentials(seed)?;
    engine.login(&username, &secret).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::database::Storage;
    use crate::config::schema::test_config;
    use crate::config::{secret_string, SeedUser};

    fn seed() -> SeedConfig {
        SeedConfig {
            users: vec![
                SeedUser {
                    username: "admin".to_string(),
                    password: secret_string("admin-secret".to_string()),
                    role: Role::Admin,
                },
                SeedUser {
                    username: "dr.bob".to_string(),
                    password: secret_string("stethoscope".to_string()),
                    role: Role::Doctor,
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let (storage, _) = Storage::memory();
        let engine = Engine::new(storage, &test_config()).unwrap();

        let first = seed_users(&engine, &seed()).await.unwrap();
        assert_eq!(first.created, vec!["admin".to_string(), "dr.bob".to_string()]);
        assert!(first.existing.is_empty());

        if std::env::var("VIGIL_ADMIN_USERNAME").is_err() {
            let second = seed_users(&engine, &seed()).await.unwrap();
            assert!(second.created.is_empty());
            assert_eq!(second.existing, vec!["admin".to_string(), "dr.bob".to_string()]);
        }
    }
}
