//! Legacy credential sources.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{MigrationError, MigrationResult};
use crate::models::CredentialBundle;

/// A plaintext credential record from an older version
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LegacyCredential {
    /// Connection the record belongs to
    pub connection_id: String,
    /// Database password
    #[serde(default)]
    pub password: Option<String>,
    /// SSH tunnel password
    #[serde(default)]
    pub ssh_password: Option<String>,
    /// SSH private key (or key passphrase)
    #[serde(default)]
    pub ssh_private_key: Option<String>,
}

impl LegacyCredential {
    /// Converts the record into a bundle, dropping empty strings
    #[must_use]
    pub fn to_bundle(&self) -> CredentialBundle {
        let mut bundle = CredentialBundle::empty();
        if let Some(password) = non_empty(self.password.as_ref()) {
            bundle = bundle.password(password);
        }
        if let Some(password) = non_empty(self.ssh_password.as_ref()) {
            bundle = bundle.ssh_password(password);
        }
        if let Some(key) = non_empty(self.ssh_private_key.as_ref()) {
            bundle = bundle.ssh_private_key(key);
        }
        bundle
    }
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(String::as_str).filter(|v| !v.is_empty())
}

/// Anything that can hand over legacy credential records
pub trait LegacyCredentialSource: Send + Sync {
    /// Human-readable description used in logs
    fn describe(&self) -> String;

    /// Reads every record
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or parsed at all.
    fn load(&self) -> MigrationResult<Vec<LegacyCredential>>;
}

/// Legacy records stored as a JSON array in a file
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    /// Creates a source for `path`; a leading `~` is expanded
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        let raw = path.as_ref().to_string_lossy();
        Self {
            path: PathBuf::from(shellexpand::tilde(&raw).into_owned()),
        }
    }

    /// Returns the expanded file path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LegacyCredentialSource for JsonFileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> MigrationResult<Vec<LegacyCredential>> {
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| MigrationError::Source {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        serde_json::from_str(&content).map_err(|e| MigrationError::Parse(e.to_string()))
    }
}
