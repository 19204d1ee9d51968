//! Secret handling for keys, passwords and connection strings
//!
//! Values are wrapped in `secrecy::Secret`, which zeroes memory on drop and
//! redacts `Debug` output. Access requires an explicit `expose_secret()`.
//!
//! # Example
//!
//! ```rust
//! use vigil::config::secret_string;
//! use secrecy::ExposeSecret;
//!
//! let key = secret_string("pseudonym-key-material".to_string());
//! assert_eq!(key.expose_secret().as_str(), "pseudonym-key-material");
//! assert!(!format!("{key:?}").contains("pseudonym-key-material"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroize;

/// String payload of a [`SecretString`]
///
/// Its own `Debug` is redacted too, so a value that escapes the `Secret`
/// wrapper still does not print.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretValue([REDACTED])")
    }
}

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl SecretValue {
    /// Borrow the secret as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Borrow the secret as raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Length in characters, for policy checks
    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// A string kept behind `secrecy::Secret`
pub type SecretString = Secret<SecretValue>;

/// Wraps a String as a [`SecretString`]
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_secret_string_creation() {
        let secret = secret_string("test-password".to_string());
        assert_eq!(secret.expose_secret().as_str(), "test-password");
        assert_eq!(secret.expose_secret().as_bytes(), b"test-password");
    }

    #[test]
    fn test_secret_debug_redacted() {
        let secret = secret_string("sensitive-data".to_string());
        let debug_output = format!("{secret:?}");

        assert!(!debug_output.contains("sensitive-data"));
        assert!(debug_output.contains("REDACTED") || debug_output.contains("Secret"));
    }

    #[test]
    fn test_inner_value_debug_redacted() {
        let secret = secret_string("pg-password".to_string());
        let inner = format!("{:?}", secret.expose_secret());
        assert_eq!(inner, "SecretValue([REDACTED])");
        assert_eq!(secret.expose_secret().char_count(), 11);
    }

    #[test]
    fn test_secret_deserializes_from_toml() {
        #[derive(Deserialize)]
        struct Keys {
            key: SecretString,
        }

        let keys: Keys = toml::from_str("key = \"abc123\"").unwrap();
        assert_eq!(keys.key.expose_secret().as_str(), "abc123");
    }
}
