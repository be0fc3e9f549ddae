//! Connection identifiers and backend key derivation.

use std::fmt;

use crate::error::{StoreError, StoreResult};

/// Opaque identifier of a database connection configuration
///
/// The value is never interpreted; it only has to be non-blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Creates a connection identifier
    ///
    /// # Errors
    /// Returns `StoreError::InvalidArgument` if the identifier is empty or
    /// consists only of whitespace
    pub fn new(id: impl Into<String>) -> StoreResult<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(StoreError::InvalidArgument(
                "connection id cannot be empty".to_string(),
            ));
        }
        Ok(Self(id))
    }

    /// Returns the identifier as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derives the namespaced key used to address this connection's secret
    #[must_use]
    pub fn backend_key(&self, prefix: &str) -> String {
        format!("{prefix}{}", self.0)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ConnectionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for ConnectionId {
    type Error = StoreError;

    fn try_from(value: &str) -> StoreResult<Self> {
        Self::new(value)
    }
}

impl TryFrom<String> for ConnectionId {
    type Error = StoreError;

    fn try_from(value: String) -> StoreResult<Self> {
        Self::new(value)
    }
}
