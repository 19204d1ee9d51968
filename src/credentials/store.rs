//! Credential store: accounts, authentication and secret changes
//!
//! Permission checks happen in the access control engine. This layer only
//! validates input, hashes secrets and talks to the [`UserRepository`].

use super::hasher::CredentialHasher;
use crate::adapters::database::{bounded, spawn_bounded, with_read_retries, UserRepository};
use crate::config::{CredentialsConfig, SecretString};
use crate::domain::validation::{validate_secret, validate_username};
use crate::domain::{AuthError, Result, Role, User, UserId, UserSummary, VigilError};
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;
use zeroize::Zeroizing;

/// Handle to the user accounts
#[derive(Clone)]
pub struct CredentialStore {
    users: Arc<dyn UserRepository>,
    hasher: Arc<CredentialHasher>,
    min_secret_length: usize,
    read_retries: u32,
}

impl CredentialStore {
    pub fn new(
        users: Arc<dyn UserRepository>,
        config: &CredentialsConfig,
        read_retries: u32,
    ) -> Result<Self> {
        Ok(Self {
            users,
            hasher: Arc::new(CredentialHasher::new(config)?),
            min_secret_length: config.min_secret_length,
            read_retries,
        })
    }

    /// Verify a username and secret
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidCredentials`] for an unknown username or a wrong
    /// secret (indistinguishable, including timing), and
    /// [`AuthError::AccountDeactivated`] for a correct secret on a
    /// deactivated account.
    pub async fn authenticate(
        &self,
        username: &str,
        secret: &SecretString,
        limit: Duration,
    ) -> Result<User> {
        let found = self.find_by_username(username, limit).await?;
        let stored = found.as_ref().map(|user| user.credential_hash.clone());
        let verified = self.verify_blocking(secret, stored).await?;

        match found {
            Some(user) if verified => {
                if user.active {
                    Ok(user)
                } else {
                    Err(AuthError::AccountDeactivated.into())
                }
            }
            _ => Err(AuthError::InvalidCredentials.into()),
        }
    }

    /// Create a new account
    ///
    /// # Errors
    ///
    /// Validation errors for a bad username or short secret, and
    /// [`ConflictError::DuplicateUsername`](crate::domain::ConflictError) if
    /// the username is taken.
    pub async fn provision(
        &self,
        username: &str,
        secret: &SecretString,
        role: Role,
        limit: Duration,
    ) -> Result<User> {
        self.validate_new_account(username, secret)?;
        let hash = self.hash_blocking(secret).await?;
        let user = User::new(username, hash, role);

        let users = Arc::clone(&self.users);
        let stored = user.clone();
        spawn_bounded(limit, async move { users.insert_user(&stored).await }).await?;

        tracing::info!(user_id = %user.id, role = %role, "User provisioned");
        Ok(user)
    }

    /// Check username and secret rules without touching storage
    pub fn validate_new_account(&self, username: &str, secret: &SecretString) -> Result<()> {
        validate_username(username)?;
        validate_secret(secret.expose_secret().as_str(), self.min_secret_length)
    }

    /// Change the role of an account
    pub async fn reassign_role(&self, username: &str, role: Role, limit: Duration) -> Result<User> {
        let mut user = self.require_user(username, limit).await?;
        let previous = user.role;
        user.role = role;
        self.store_update(&user, limit).await?;

        tracing::info!(user_id = %user.id, from = %previous, to = %role, "Role reassigned");
        Ok(user)
    }

    /// Deactivate an account; it stays in storage and in the audit trail
    pub async fn deactivate(&self, username: &str, limit: Duration) -> Result<User> {
        let mut user = self.require_user(username, limit).await?;
        user.active = false;
        self.store_update(&user, limit).await?;

        tracing::info!(user_id = %user.id, "User deactivated");
        Ok(user)
    }

    /// Replace a user's secret after re-verifying the current one
    pub async fn change_secret(
        &self,
        user_id: UserId,
        current: &SecretString,
        new: &SecretString,
        limit: Duration,
    ) -> Result<()> {
        let user = self.verify_current(user_id, current, limit).await?;
        self.validate_secret(new)?;
        self.replace_secret(user, new, limit).await
    }

    /// Re-check the secret of an active account
    pub async fn verify_current(
        &self,
        user_id: UserId,
        current: &SecretString,
        limit: Duration,
    ) -> Result<User> {
        let found = self.find_by_id(user_id, limit).await?;
        let stored = found.as_ref().map(|user| user.credential_hash.clone());
        let verified = self.verify_blocking(current, stored).await?;

        match found {
            Some(user) if verified && user.active => Ok(user),
            Some(_) if verified => Err(AuthError::AccountDeactivated.into()),
            _ => Err(AuthError::InvalidCredentials.into()),
        }
    }

    pub fn validate_secret(&self, secret: &SecretString) -> Result<()> {
        validate_secret(secret.expose_secret().as_str(), self.min_secret_length)
    }

    /// Store a new hash for an account already verified by [`verify_current`](Self::verify_current)
    pub async fn replace_secret(
        &self,
        mut user: User,
        new: &SecretString,
        limit: Duration,
    ) -> Result<()> {
        self.validate_secret(new)?;
        user.credential_hash = self.hash_blocking(new).await?;
        self.store_update(&user, limit).await?;

        tracing::info!(user_id = %user.id, "Secret changed");
        Ok(())
    }

    pub async fn find_by_username(&self, username: &str, limit: Duration) -> Result<Option<User>> {
        bounded(
            limit,
            with_read_retries(self.read_retries, || {
                self.users.find_user_by_username(username)
            }),
        )
        .await
    }

    pub async fn find_by_id(&self, id: UserId, limit: Duration) -> Result<Option<User>> {
        bounded(
            limit,
            with_read_retries(self.read_retries, || self.users.find_user_by_id(id)),
        )
        .await
    }

    pub async fn list(&self, limit: Duration) -> Result<Vec<UserSummary>> {
        let users = bounded(
            limit,
            with_read_retries(self.read_retries, || self.users.list_users()),
        )
        .await?;
        Ok(users.iter().map(User::summary).collect())
    }

    pub async fn count(&self, limit: Duration) -> Result<u64> {
        bounded(
            limit,
            with_read_retries(self.read_retries, || self.users.count_users()),
        )
        .await
    }

    async fn require_user(&self, username: &str, limit: Duration) -> Result<User> {
        self.find_by_username(username, limit)
            .await?
            .ok_or_else(|| VigilError::UserNotFound {
                username: username.to_string(),
            })
    }

    async fn store_update(&self, user: &User, limit: Duration) -> Result<()> {
        let users = Arc::clone(&self.users);
        let user = user.clone();
        spawn_bounded(limit, async move { users.update_user(&user).await }).await
    }

    async fn hash_blocking(&self, secret: &SecretString) -> Result<String> {
        let hasher = Arc::clone(&self.hasher);
        let secret = Zeroizing::new(secret.expose_secret().as_str().to_string());
        tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| VigilError::Internal(format!("Hashing task failed: {e}")))?
    }

    async fn verify_blocking(&self, secret: &SecretString, stored: Option<String>) -> Result<bool> {
        let hasher = Arc::clone(&self.hasher);
        let secret = Zeroizing::new(secret.expose_secret().as_str().to_string());
        tokio::task::spawn_blocking(move || match stored {
            Some(hash) => hasher.verify(&secret, &hash),
            None => {
                hasher.verify_dummy(&secret);
                false
            }
        })
        .await
        .map_err(|e| VigilError::Internal(format!("Verification task failed: {e}")))
    }
}
