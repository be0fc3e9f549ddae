//! Error types for `dbvault`
//!
//! This module defines the error taxonomy used by the secret backends, the
//! credential store, configuration handling and the legacy migration routine.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Top-level error type for `dbvault` operations
#[derive(Debug, Error)]
pub enum DbVaultError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Secret backend errors
    #[error("Secret backend error: {0}")]
    Secret(#[from] SecretError),

    /// Credential store argument errors
    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),

    /// Legacy migration errors
    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),

    /// I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Backend operation names used in errors and diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOperation {
    /// Persisting a value
    Store,
    /// Reading a value
    Retrieve,
    /// Removing a value
    Delete,
}

impl BackendOperation {
    /// Returns the lowercase operation name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Retrieve => "retrieve",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for BackendOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors reported by a secret backend
#[derive(Debug, Clone, Error)]
pub enum SecretError {
    /// No value is stored under the requested key
    #[error("No secret stored under the requested key")]
    NotFound,

    /// The backend is not exposed or not reachable in this runtime
    #[error("Secret backend not available: {0}")]
    Unavailable(String),

    /// The platform refused access to the secret store
    #[error("Access to secret store denied: {0}")]
    PermissionDenied(String),

    /// The backend was reachable but the operation failed
    #[error("Secret backend {operation} failed: {message}")]
    OperationFailed {
        /// The operation that failed
        operation: BackendOperation,
        /// Backend-provided failure description
        message: String,
    },

    /// The backend did not answer in time
    #[error("Secret backend {operation} timed out after {after:?}")]
    Timeout {
        /// The operation that timed out
        operation: BackendOperation,
        /// The timeout that elapsed
        after: Duration,
    },

    /// A stored value could not be decoded
    #[error("Stored secret has an invalid format: {0}")]
    InvalidValue(String),
}

impl SecretError {
    /// Returns true for the `NotFound` condition
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Returns true when the backend itself is unreachable
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// Maps a raw backend failure message onto the error taxonomy
    ///
    /// Platform secret stores report most failures as free-form text, so the
    /// message is matched case-insensitively against known patterns:
    /// access denials become `PermissionDenied`, missing services become
    /// `Unavailable`, and anything else is an `OperationFailed`.
    #[must_use]
    pub fn classify(operation: BackendOperation, message: impl Into<String>) -> Self {
        const DENIED: &[&str] = &[
            "denied",
            "permission",
            "authorization",
            "unauthorized",
            "restricted",
        ];
        const UNAVAILABLE: &[&str] = &[
            "unavailable",
            "not available",
            "not installed",
            "secret service",
            "dbus",
            "no such file",
        ];

        let message = message.into();
        let lower = message.to_lowercase();

        if DENIED.iter().any(|p| lower.contains(p)) {
            Self::PermissionDenied(message)
        } else if UNAVAILABLE.iter().any(|p| lower.contains(p)) {
            Self::Unavailable(message)
        } else {
            Self::OperationFailed { operation, message }
        }
    }
}

/// Errors returned to callers of the credential store
///
/// Backend failures are absorbed by the store; only malformed arguments are
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The connection identifier is empty or otherwise malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Errors related to configuration file operations
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse configuration file
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {reason}")]
    Validation {
        /// The field that failed validation
        field: String,
        /// The reason for validation failure
        reason: String,
    },

    /// Configuration directory could not be determined
    #[error("Configuration directory not found: {0}")]
    NotFound(PathBuf),

    /// Failed to write configuration file
    #[error("Failed to write configuration: {0}")]
    Write(String),

    /// Failed to serialize configuration
    #[error("Failed to serialize configuration: {0}")]
    Serialize(String),
}

/// Errors related to importing legacy plaintext credentials
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The legacy source could not be read
    #[error("Failed to read legacy source {path}: {reason}")]
    Source {
        /// Location of the legacy data
        path: PathBuf,
        /// Why reading failed
        reason: String,
    },

    /// The legacy data is malformed
    #[error("Failed to parse legacy credentials: {0}")]
    Parse(String),

    /// I/O error during migration
    #[error("IO error during migration: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for `dbvault` operations
pub type Result<T> = std::result::Result<T, DbVaultError>;

/// Result type alias for secret backend operations
pub type SecretResult<T> = std::result::Result<T, SecretError>;

/// Result type alias for credential store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for migration operations
pub type MigrationResult<T> = std::result::Result<T, MigrationError>;
