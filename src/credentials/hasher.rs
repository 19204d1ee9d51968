//! Argon2id credential hashing
//!
//! Hashes are stored as PHC strings (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`),
//! so each hash carries its own parameters and stays verifiable after the
//! configured cost changes.

use crate::config::CredentialsConfig;
use crate::domain::{Result, VigilError};
use argon2::password_hash::{PasswordHash, PasswordHasher, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use subtle::ConstantTimeEq;

const SALT_LEN: usize = 16;
const DUMMY_SECRET: &str = "vigil-dummy-credential";

/// Hashes and verifies user secrets
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    dummy_hash: String,
}

impl CredentialHasher {
    /// Build a hasher with the configured Argon2id cost
    ///
    /// # Errors
    ///
    /// Returns a configuration error if Argon2 rejects the parameters.
    pub fn new(config: &CredentialsConfig) -> Result<Self> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| VigilError::Configuration(format!("Invalid Argon2 parameters: {e}")))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut hasher = Self {
            argon2,
            dummy_hash: String::new(),
        };
        hasher.dummy_hash = hasher.hash(DUMMY_SECRET)?;
        Ok(hasher)
    }

    /// Hash a secret with a fresh random salt
    pub fn hash(&self, secret: &str) -> Result<String> {
        let mut salt_bytes = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| VigilError::Internal(format!("Failed to encode salt: {e}")))?;

        self.argon2
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| VigilError::Internal(format!("Failed to hash credential: {e}")))
    }

    /// Check `secret` against a stored PHC hash
    ///
    /// The derived output is compared in constant time. A stored hash that
    /// does not parse counts as a mismatch.
    pub fn verify(&self, secret: &str, stored: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored) else {
            tracing::warn!("Stored credential hash is not a valid PHC string");
            return false;
        };
        let Ok(params) = Params::try_from(&parsed) else {
            return false;
        };
        let (Some(salt), Some(expected)) = (parsed.salt, parsed.hash) else {
            return false;
        };

        let derived = Argon2::default().hash_password_customized(
            secret.as_bytes(),
            Some(parsed.algorithm),
            parsed.version,
            params,
            salt,
        );
        match derived.ok().and_then(|hash| hash.hash) {
            Some(output) => output.as_bytes().ct_eq(expected.as_bytes()).into(),
            None => false,
        }
    }

    /// Run a full verification against a fixed hash and discard the result
    ///
    /// Used for unknown usernames so they take as long as a wrong secret.
    pub fn verify_dummy(&self, secret: &str) {
        let _ = self.verify(secret, &self.dummy_hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::test_config;

    fn hasher() -> CredentialHasher {
        CredentialHasher::new(&test_config().credentials).unwrap()
    }

    #[test]
    fn test_hash_is_phc_argon2id() {
        let hash = hasher().hash("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$v=19$"));
        assert!(!hash.contains("correct horse"));
    }

    #[test]
    fn test_verify() {
        let hasher = hasher();
        let hash = hasher.hash("correct horse").unwrap();
        assert!(hasher.verify("correct horse", &hash));
        assert!(!hasher.verify("battery staple", &hash));
        assert!(!hasher.verify("", &hash));
    }

    #[test]
    fn test_salts_differ() {
        let hasher = hasher();
        assert_ne!(
            hasher.hash("correct horse").unwrap(),
            hasher.hash("correct horse").unwrap()
        );
    }

    #[test]
    fn test_malformed_hash_never_verifies() {
        let hasher = hasher();
        assert!(!hasher.verify("anything", "not-a-phc-string"));
        assert!(!hasher.verify("anything", ""));
    }

    #[test]
    fn test_hash_verifies_under_different_configured_cost() {
        let hash = hasher().hash("correct horse").unwrap();

        let mut config = test_config().credentials;
        config.memory_kib = 128;
        config.iterations = 2;
        let other = CredentialHasher::new(&config).unwrap();
        assert!(other.verify("correct horse", &hash));
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let mut config = test_config().credentials;
        config.memory_kib = 1;
        assert!(matches!(
            CredentialHasher::new(&config),
            Err(VigilError::Configuration(_))
        ));
    }
}
