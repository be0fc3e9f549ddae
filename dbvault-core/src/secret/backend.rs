//! Secret backend trait definition
//!
//! This module defines the `SecretBackend` trait that all secret storage
//! implementations must implement, and the typed capability returned by the
//! availability probe.

use std::fmt;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::SecretResult;

/// Result of probing a backend for availability
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCapability {
    /// The backend's operations can be called
    Available,
    /// The backend is not exposed or not reachable, with a reason
    Unavailable(String),
}

impl BackendCapability {
    /// Returns true if the backend can be called
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }
}

impl fmt::Display for BackendCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => f.write_str("available"),
            Self::Unavailable(reason) => write!(f, "unavailable ({reason})"),
        }
    }
}

/// Abstraction over platform secret stores
///
/// Values are addressed by an opaque backend key. Implementations must not
/// cache availability: `probe` is called before every store operation and its
/// answer may change over the life of the process.
#[async_trait]
pub trait SecretBackend: Send + Sync {
    /// Store a value under `key`, overwriting any previous value
    ///
    /// # Errors
    /// Returns `SecretError` if the storage operation fails
    async fn store(&self, key: &str, value: &SecretString) -> SecretResult<()>;

    /// Retrieve the value stored under `key`
    ///
    /// # Errors
    /// Returns `SecretError::NotFound` if nothing is stored under `key`, or
    /// another `SecretError` if the retrieval fails
    async fn retrieve(&self, key: &str) -> SecretResult<SecretString>;

    /// Delete the value stored under `key`
    ///
    /// Deleting a key that holds no value succeeds.
    ///
    /// # Errors
    /// Returns `SecretError` if the deletion operation fails
    async fn delete(&self, key: &str) -> SecretResult<()>;

    /// Checks, without mutating anything, whether the backend is reachable
    async fn probe(&self) -> BackendCapability;

    /// Returns the backend identifier
    ///
    /// # Returns
    /// A static string identifying this backend (e.g., "libsecret", "memory")
    fn backend_id(&self) -> &'static str;

    /// Returns a human-readable name for this backend
    fn display_name(&self) -> &'static str;
}
