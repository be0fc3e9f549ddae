//! Credential bundle model for secure credential storage.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::{SecretError, SecretResult};

/// Sensitive material associated with one connection
///
/// Every field is optional. A bundle with no field set means "no credentials".
///
/// Note: this type intentionally has no `Serialize` implementation. The only
/// serialized form is the backend value produced for the secret store, so a
/// bundle cannot end up in a config file by accident.
#[derive(Debug, Clone, Default)]
pub struct CredentialBundle {
    /// Primary database password
    pub password: Option<SecretString>,
    /// Secondary password for the SSH tunnel
    pub ssh_password: Option<SecretString>,
    /// SSH private key material
    pub ssh_private_key: Option<SecretString>,
}

/// Wire form written to the secret backend
#[derive(Serialize)]
struct EncodedBundle<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ssh_password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ssh_private_key: Option<&'a str>,
}

/// Wire form read back from the secret backend
#[derive(Deserialize)]
struct DecodedBundle {
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    ssh_password: Option<String>,
    #[serde(default)]
    ssh_private_key: Option<String>,
}

impl DecodedBundle {
    fn parse(raw: &str) -> Option<Self> {
        let serde_json::Value::Object(map) = serde_json::from_str::<serde_json::Value>(raw).ok()? else {
            return None;
        };
        let decoded: Self = serde_json::from_value(serde_json::Value::Object(map)).ok()?;
        let has_field = decoded.password.is_some()
            || decoded.ssh_password.is_some()
            || decoded.ssh_private_key.is_some();
        has_field.then_some(decoded)
    }
}

impl CredentialBundle {
    /// Creates an empty bundle
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            password: None,
            ssh_password: None,
            ssh_private_key: None,
        }
    }

    /// Creates a bundle holding only a primary password
    #[must_use]
    pub fn with_password(password: impl Into<String>) -> Self {
        Self::empty().password(password)
    }

    /// Sets the primary password
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self
    }

    /// Sets the SSH tunnel password
    #[must_use]
    pub fn ssh_password(mut self, password: impl Into<String>) -> Self {
        self.ssh_password = Some(SecretString::from(password.into()));
        self
    }

    /// Sets the SSH private key
    #[must_use]
    pub fn ssh_private_key(mut self, key: impl Into<String>) -> Self {
        self.ssh_private_key = Some(SecretString::from(key.into()));
        self
    }

    /// Returns true if no field is set
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.password.is_none() && self.ssh_password.is_none() && self.ssh_private_key.is_none()
    }

    /// Returns true if the bundle contains a primary password
    #[must_use]
    pub const fn has_password(&self) -> bool {
        self.password.is_some()
    }

    /// Exposes the primary password (should be used carefully)
    #[must_use]
    pub fn expose_password(&self) -> Option<&str> {
        self.password.as_ref().map(ExposeSecret::expose_secret)
    }

    /// Exposes the SSH tunnel password (should be used carefully)
    #[must_use]
    pub fn expose_ssh_password(&self) -> Option<&str> {
        self.ssh_password.as_ref().map(ExposeSecret::expose_secret)
    }

    /// Exposes the SSH private key (should be used carefully)
    #[must_use]
    pub fn expose_ssh_private_key(&self) -> Option<&str> {
        self.ssh_private_key.as_ref().map(ExposeSecret::expose_secret)
    }

    /// Encodes the bundle into the value stored in the secret backend
    pub(crate) fn to_backend_value(&self) -> SecretResult<SecretString> {
        let encoded = EncodedBundle {
            password: self.expose_password(),
            ssh_password: self.expose_ssh_password(),
            ssh_private_key: self.expose_ssh_private_key(),
        };
        serde_json::to_string(&encoded)
            .map(SecretString::from)
            .map_err(|e| SecretError::InvalidValue(e.to_string()))
    }

    /// Decodes a value read from the secret backend
    ///
    /// Only a JSON object carrying at least one bundle field counts as an
    /// encoded bundle. Anything else was written by releases that stored the
    /// bare password, and is read as a password-only bundle even when it
    /// happens to parse as JSON.
    pub(crate) fn from_backend_value(value: &SecretString) -> Self {
        let raw = value.expose_secret();
        if let Some(decoded) = DecodedBundle::parse(raw) {
            return Self {
                password: decoded.password.map(SecretString::from),
                ssh_password: decoded.ssh_password.map(SecretString::from),
                ssh_private_key: decoded.ssh_private_key.map(SecretString::from),
            };
        }

        if raw.is_empty() {
            Self::empty()
        } else {
            Self::with_password(raw)
        }
    }
}

// Manual PartialEq implementation since SecretString doesn't implement it
impl PartialEq for CredentialBundle {
    fn eq(&self, other: &Self) -> bool {
        self.expose_password() == other.expose_password()
            && self.expose_ssh_password() == other.expose_ssh_password()
            && self.expose_ssh_private_key() == other.expose_ssh_private_key()
    }
}

impl Eq for CredentialBundle {}
