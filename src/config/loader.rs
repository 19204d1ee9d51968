//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{PostgreSQLConfig, StorageBackend, VigilConfig};
use super::secret_string;
use crate::domain::errors::VigilError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into VigilConfig
/// 4. Applies environment variable overrides (VIGIL_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`VigilError::Configuration`] if the file is missing or unreadable,
/// a referenced variable is unset, parsing fails or validation fails.
///
/// # Examples
///
/// ```no_run
/// use vigil::config::loader::load_config;
///
/// let config = load_config("vigil.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<VigilConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(VigilError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        VigilError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses configuration from TOML text, applying substitution, overrides and validation
pub fn parse_config(contents: &str) -> Result<VigilConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: VigilConfig = toml::from_str(&contents)
        .map_err(|e| VigilError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        VigilError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are copied through untouched. All missing variables are
/// reported together.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| VigilError::Internal(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(VigilError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Reads `name` and parses it, reporting malformed values instead of ignoring them
fn env_parsed<T: FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(val) => val.trim().parse::<T>().map(Some).map_err(|_| {
            VigilError::Configuration(format!("Invalid value for {name}: '{val}'"))
        }),
        Err(_) => Ok(None),
    }
}

/// Applies environment variable overrides using VIGIL_* prefix
///
/// Environment variables follow the pattern: VIGIL_<SECTION>_<KEY>
/// For example: VIGIL_STORAGE_BACKEND, VIGIL_RETENTION_RETENTION_DAYS
fn apply_env_overrides(config: &mut VigilConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("VIGIL_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Storage overrides
    if let Ok(val) = std::env::var("VIGIL_STORAGE_BACKEND") {
        config.storage.backend = match val.to_lowercase().as_str() {
            "memory" => StorageBackend::Memory,
            "postgresql" => StorageBackend::PostgreSQL,
            other => {
                return Err(VigilError::Configuration(format!(
                    "Invalid value for VIGIL_STORAGE_BACKEND: '{other}'"
                )))
            }
        };
    }
    if let Some(timeout) = env_parsed("VIGIL_STORAGE_OPERATION_TIMEOUT_MS")? {
        config.storage.operation_timeout_ms = timeout;
    }
    if let Some(retries) = env_parsed("VIGIL_STORAGE_READ_RETRIES")? {
        config.storage.read_retries = retries;
    }
    if let Ok(val) = std::env::var("VIGIL_STORAGE_POSTGRESQL_CONNECTION_STRING") {
        match config.storage.postgresql {
            Some(ref mut pg_config) => pg_config.connection_string = secret_string(val),
            None => {
                config.storage.postgresql = Some(PostgreSQLConfig {
                    connection_string: secret_string(val),
                    max_connections: 10,
                    connection_timeout_seconds: 30,
                    statement_timeout_seconds: 60,
                })
            }
        }
    }
    if let Some(ref mut pg_config) = config.storage.postgresql {
        if let Some(max) = env_parsed("VIGIL_STORAGE_POSTGRESQL_MAX_CONNECTIONS")? {
            pg_config.max_connections = max;
        }
    }

    // Credential overrides
    if let Some(memory) = env_parsed("VIGIL_CREDENTIALS_MEMORY_KIB")? {
        config.credentials.memory_kib = memory;
    }
    if let Some(iterations) = env_parsed("VIGIL_CREDENTIALS_ITERATIONS")? {
        config.credentials.iterations = iterations;
    }
    if let Some(parallelism) = env_parsed("VIGIL_CREDENTIALS_PARALLELISM")? {
        config.credentials.parallelism = parallelism;
    }

    // Anonymization overrides
    if let Ok(val) = std::env::var("VIGIL_ANONYMIZATION_NAME_STRATEGY") {
        config.anonymization.name_strategy = match val.to_lowercase().as_str() {
            "pseudonym" => super::schema::NameStrategy::Pseudonym,
            "sealed" => super::schema::NameStrategy::Sealed,
            other => {
                return Err(VigilError::Configuration(format!(
                    "Invalid value for VIGIL_ANONYMIZATION_NAME_STRATEGY: '{other}'"
                )))
            }
        };
    }
    if let Ok(val) = std::env::var("VIGIL_ANONYMIZATION_PSEUDONYM_KEY") {
        config.anonymization.pseudonym_key = secret_string(val);
    }
    if let Ok(val) = std::env::var("VIGIL_ANONYMIZATION_ENCRYPTION_KEY") {
        config.anonymization.encryption_key = secret_string(val);
    }

    // Audit overrides
    if let Ok(val) = std::env::var("VIGIL_AUDIT_MIRROR_PATH") {
        config.audit.mirror_path = if val.trim().is_empty() {
            None
        } else {
            Some(val)
        };
    }

    // Retention overrides
    if let Some(days) = env_parsed("VIGIL_RETENTION_RETENTION_DAYS")? {
        config.retention.retention_days = days;
    }

    // Logging overrides
    if let Ok(val) = std::env::var("VIGIL_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("VIGIL_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[anonymization]
pseudonym_key = "loader-test-pseudonym-key"
encryption_key = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY="
"#;

    #[test]
    fn test_substitute_env_vars() {
        std::env::set_var("VIGIL_LOADER_TEST_VAR", "test_value");
        let input = "password = \"${VIGIL_LOADER_TEST_VAR}\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result.trim_end(), "password = \"test_value\"");
        std::env::remove_var("VIGIL_LOADER_TEST_VAR");
    }

    #[test]
    fn test_substitute_env_vars_missing() {
        std::env::remove_var("VIGIL_LOADER_MISSING_A");
        std::env::remove_var("VIGIL_LOADER_MISSING_B");
        let input = "a = \"${VIGIL_LOADER_MISSING_A}\"\nb = \"${VIGIL_LOADER_MISSING_B}\"";
        let err = substitute_env_vars(input).unwrap_err().to_string();
        assert!(err.contains("VIGIL_LOADER_MISSING_A"));
        assert!(err.contains("VIGIL_LOADER_MISSING_B"));
    }

    #[test]
    fn test_substitute_skips_comments() {
        std::env::remove_var("VIGIL_LOADER_COMMENTED");
        let input = "# key = \"${VIGIL_LOADER_COMMENTED}\"";
        assert!(substitute_env_vars(input).is_ok());
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent-vigil.toml");
        assert!(matches!(result, Err(VigilError::Configuration(_))));
    }

    #[test]
    fn test_load_minimal_config_uses_defaults() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(MINIMAL.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.storage.operation_timeout_ms, 5000);
        assert_eq!(config.credentials.min_secret_length, 6);
        assert_eq!(config.anonymization.mask_char, 'X');
        assert_eq!(config.anonymization.visible_digits, 4);
        assert_eq!(
            config.anonymization.pseudonym_key.expose_secret().as_str(),
            "loader-test-pseudonym-key"
        );
    }

    #[test]
    fn test_missing_anonymization_section_fails() {
        let result = parse_config("[application]\nlog_level = \"info\"\n");
        assert!(matches!(result, Err(VigilError::Configuration(_))));
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let contents = format!("{MINIMAL}\n[retention]\nretention_days = 0\n");
        let err = parse_config(&contents).unwrap_err().to_string();
        assert!(err.contains("retention_days"));
    }
}
