//! CLI command implementations
//!
//! Commands that act on data log in as an administrator. Credentials come
//! from `VIGIL_ADMIN_USERNAME` / `VIGIL_ADMIN_PASSWORD`, falling back to the
//! first admin listed under `[seed]`.

pub mod anonymize;
pub mod audit_export;
pub mod init;
pub mod purge;
pub mod seed;
pub mod validate;

use crate::access::{Engine, Session};
use crate::config::{load_config, secret_string, SecretString, SeedConfig, StorageBackend};
use crate::domain::{Result, Role, VigilError};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_CONFIGURATION: i32 = 2;
pub const EXIT_DENIED: i32 = 3;
pub const EXIT_FATAL: i32 = 5;

/// Map an error to the process exit code
pub fn exit_code(error: &VigilError) -> i32 {
    match error {
        VigilError::Configuration(_) | VigilError::Validation(_) => EXIT_CONFIGURATION,
        VigilError::Auth(_) | VigilError::Permission(_) => EXIT_DENIED,
        _ => EXIT_FATAL,
    }
}

/// Print a failure and return its exit code
pub(crate) fn report(context: &str, error: &VigilError) -> i32 {
    crate::log_error_with_context!(error, context);
    println!("❌ {context}");
    println!("   Error: {error}");
    exit_code(error)
}

/// Log out once the outcome has been reported
///
/// A failed logout is logged and leaves `code` unchanged.
pub(crate) async fn finish(engine: &Engine, session: &Session, code: i32) -> i32 {
    if let Err(e) = engine.logout(session).await {
        tracing::warn!(error = %e, "Logout failed after command completed");
    }
    code
}

/// Administrator credentials for operator commands
pub(crate) fn admin_credentials(seed: &SeedConfig) -> Result<(String, SecretString)> {
    let username = std::env::var("VIGIL_ADMIN_USERNAME").ok();
    let password = std::env::var("VIGIL_ADMIN_PASSWORD").ok();

    match (username, password) {
        (Some(username), Some(password)) => Ok((username, secret_string(password))),
        _ => seed
            .users
            .iter()
            .find(|user| user.role == Role::Admin)
            .map(|user| (user.username.clone(), user.password.clone()))
            .ok_or_else(|| {
                VigilError::Configuration(
                    "Set VIGIL_ADMIN_USERNAME and VIGIL_ADMIN_PASSWORD, or list an admin under [seed]"
                        .to_string(),
                )
            }),
    }
}

/// Load configuration, open the engine and log in as an administrator
pub(crate) async fn admin_session(config_path: &str) -> Result<(Engine, Session)> {
    let config = load_config(config_path)?;
    let engine = Engine::from_config(&config).await?;

    if config.storage.backend == StorageBackend::Memory {
        tracing::warn!("Memory backend keeps no data between runs; seeding accounts from configuration");
        seed::seed_users(&engine, &config.seed).await?;
    }

    let (username, secret) = admin_credentials(&config.seed)?;
    let session = engine.login(&username, &secret).await?;
    Ok((engine, session))
}
