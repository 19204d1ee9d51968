//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use vigil::access::{Engine, Session};
use vigil::adapters::database::Storage;
use vigil::adapters::memory::MemoryStorage;
use vigil::config::{parse_config, secret_string, SecretString, VigilConfig};
use vigil::domain::{RawFields, Role};

pub const ENCRYPTION_KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";
pub const PSEUDONYM_KEY: &str = "integration-pseudonym-key";
pub const ADMIN_SECRET: &str = "admin-secret";

/// Configuration text with cheap hashing and fixed keys
pub fn config_toml(pseudonym_key: &str, name_strategy: &str) -> String {
    format!(
        r#"
[storage]
backend = "memory"
operation_timeout_ms = 2000
read_retries = 1

[credentials]
memory_kib = 64
iterations = 1
parallelism = 1
min_secret_length = 6

[anonymization]
name_strategy = "{name_strategy}"
pseudonym_key = "{pseudonym_key}"
encryption_key = "{ENCRYPTION_KEY}"

[logging]
local_enabled = false
"#
    )
}

pub fn test_config() -> VigilConfig {
    parse_config(&config_toml(PSEUDONYM_KEY, "pseudonym")).unwrap()
}

pub fn secret(value: &str) -> SecretString {
    secret_string(value.to_string())
}

pub fn john_doe() -> RawFields {
    RawFields::new("John Doe", "555-111-4592", "Seasonal influenza")
}

/// An engine over fresh memory storage with a logged-in administrator
pub struct Harness {
    pub engine: Engine,
    pub storage: Storage,
    pub backend: Arc<MemoryStorage>,
    pub admin: Session,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: VigilConfig) -> Self {
        let (storage, backend) = Storage::memory();
        let engine = Engine::new(storage.clone(), &config).unwrap();
        engine
            .bootstrap_admin("admin", &secret(ADMIN_SECRET))
            .await
            .unwrap();
        let admin = engine.login("admin", &secret(ADMIN_SECRET)).await.unwrap();
        Self {
            engine,
            storage,
            backend,
            admin,
        }
    }

    /// Provision an account and log it in
    pub async fn user(&self, username: &str, role: Role) -> Session {
        let password = format!("{username}-password");
        self.engine
            .provision_user(&self.admin, username, secret(&password), role)
            .await
            .unwrap();
        self.engine.login(username, &secret(&password)).await.unwrap()
    }
}
