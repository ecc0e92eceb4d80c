//! Configuration loading and validation.
//!
//! Values are read from environment variables. The master key is validated
//! when the configuration is loaded, so a misconfigured process fails before
//! it serves its first request.

use journal_common::VaultError;
use serde::Deserialize;

use crate::keys::MasterKey;

/// Validated key-management configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Standard-base64 encoding of the 32-byte master key
    /// (`ENCRYPTION_MASTER_KEY`). **Required.**
    #[serde(default)]
    pub encryption_master_key: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Configuration`] if the master key is absent or
    /// does not decode to exactly 32 bytes.
    pub fn from_env() -> Result<Self, VaultError> {
        Self::from_environment(config::Environment::default())
    }

    fn from_environment(env: config::Environment) -> Result<Self, VaultError> {
        let cfg = config::Config::builder()
            .add_source(env)
            .build()
            .map_err(|e| {
                VaultError::Configuration(format!(
                    "failed to build configuration from environment: {e}"
                ))
            })?;

        let c: Config = cfg.try_deserialize().map_err(|e| {
            VaultError::Configuration(format!("failed to deserialise configuration: {e}"))
        })?;

        c.validate()?;
        Ok(c)
    }

    /// Decode the configured master key.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Configuration`] if the value is missing, empty,
    /// not base64, or not exactly 32 bytes once decoded.
    pub fn master_key(&self) -> Result<MasterKey, VaultError> {
        let encoded = self
            .encryption_master_key
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                VaultError::Configuration(
                    "ENCRYPTION_MASTER_KEY is required and must not be empty".into(),
                )
            })?;
        MasterKey::from_base64(encoded)
    }

    fn validate(&self) -> Result<(), VaultError> {
        self.master_key().map(drop)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field(
                "encryption_master_key",
                &self.encryption_master_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("log_level", &self.log_level)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use std::collections::HashMap;

    fn env_with(vars: &[(&str, &str)]) -> config::Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::default().source(Some(map))
    }

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn loads_valid_master_key_from_environment() {
        let encoded = STANDARD.encode([0x01u8; 32]);
        let cfg = Config::from_environment(env_with(&[
            ("ENCRYPTION_MASTER_KEY", encoded.as_str()),
            ("LOG_LEVEL", "debug"),
        ]))
        .unwrap();
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.master_key().unwrap().as_bytes(), &[0x01u8; 32]);
    }

    #[test]
    fn missing_master_key_is_configuration_error() {
        let err = Config::from_environment(env_with(&[("LOG_LEVEL", "info")])).unwrap_err();
        assert!(matches!(err, VaultError::Configuration(_)));
    }

    #[test]
    fn short_master_key_is_configuration_error() {
        let encoded = STANDARD.encode([0x01u8; 31]);
        let env = env_with(&[("ENCRYPTION_MASTER_KEY", encoded.as_str())]);
        let err = Config::from_environment(env).unwrap_err();
        assert!(matches!(err, VaultError::Configuration(_)));
    }

    #[test]
    fn validate_rejects_blank_master_key() {
        let cfg = Config {
            encryption_master_key: Some("   ".into()),
            log_level: default_log_level(),
        };
        assert!(matches!(cfg.validate(), Err(VaultError::Configuration(_))));
    }

    #[test]
    fn debug_redacts_master_key() {
        let encoded = STANDARD.encode([0x01u8; 32]);
        let cfg = Config {
            encryption_master_key: Some(encoded.clone()),
            log_level: default_log_level(),
        };
        let printed = format!("{cfg:?}");
        assert!(!printed.contains(&encoded));
        assert!(printed.contains("REDACTED"));
    }
}
