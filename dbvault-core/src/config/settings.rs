//! Application settings
//!
//! Settings never contain secret material; they only decide where secrets go.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Upper bound for backend calls; local secret stores answer well within this
const MAX_BACKEND_TIMEOUT_MS: u64 = 60_000;

/// Application settings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AppSettings {
    /// Secret storage settings
    #[serde(default)]
    pub secrets: SecretSettings,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl AppSettings {
    /// Validates every section
    ///
    /// # Errors
    /// Returns `ConfigError::Validation` naming the first invalid field
    pub fn validate(&self) -> ConfigResult<()> {
        self.secrets.validate()?;
        self.logging.validate()
    }
}

/// Secret storage settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretSettings {
    /// Backend used to persist credentials
    #[serde(default)]
    pub backend: SecretBackendType,
    /// Service name secrets are filed under in the platform store
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Prefix namespacing connection keys within the service
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Upper bound for a single backend call, in milliseconds
    #[serde(default = "default_backend_timeout_ms")]
    pub backend_timeout_ms: u64,
}

fn default_service_name() -> String {
    "dbvault".to_string()
}

fn default_key_prefix() -> String {
    "dbvault.connection.".to_string()
}

const fn default_backend_timeout_ms() -> u64 {
    3000
}

impl Default for SecretSettings {
    fn default() -> Self {
        Self {
            backend: SecretBackendType::default(),
            service_name: default_service_name(),
            key_prefix: default_key_prefix(),
            backend_timeout_ms: default_backend_timeout_ms(),
        }
    }
}

impl SecretSettings {
    /// Returns the backend call timeout
    #[must_use]
    pub const fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms)
    }

    /// Validates the secret settings
    ///
    /// # Errors
    /// Returns `ConfigError::Validation` for an empty service name or a
    /// timeout that is zero or longer than a minute
    pub fn validate(&self) -> ConfigResult<()> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "secrets.service_name".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.backend_timeout_ms == 0 || self.backend_timeout_ms > MAX_BACKEND_TIMEOUT_MS {
            return Err(ConfigError::Validation {
                field: "secrets.backend_timeout_ms".to_string(),
                reason: format!("must be between 1 and {MAX_BACKEND_TIMEOUT_MS}"),
            });
        }
        Ok(())
    }
}

/// Secret backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretBackendType {
    /// libsecret via `secret-tool` (GNOME Keyring/KDE Wallet)
    #[serde(rename = "libsecret")]
    LibSecret,
    /// Native OS keychain through the `keyring` crate
    Keyring,
    /// Process memory only, nothing persisted
    Memory,
    /// No backend; the store runs in degraded mode
    None,
}

impl Default for SecretBackendType {
    fn default() -> Self {
        if cfg!(target_os = "linux") {
            Self::LibSecret
        } else {
            Self::Keyring
        }
    }
}

impl std::str::FromStr for SecretBackendType {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "libsecret" | "lib_secret" => Ok(Self::LibSecret),
            "keyring" => Ok(Self::Keyring),
            "memory" => Ok(Self::Memory),
            "none" => Ok(Self::None),
            other => Err(ConfigError::Validation {
                field: "secrets.backend".to_string(),
                reason: format!("unknown backend '{other}'"),
            }),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingSettings {
    /// Validates the logging settings
    ///
    /// # Errors
    /// Returns `ConfigError::Validation` for an empty level
    pub fn validate(&self) -> ConfigResult<()> {
        if self.level.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "logging.level".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}
