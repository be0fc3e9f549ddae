//! Native OS keychain backend
//!
//! Uses the `keyring` crate to reach the platform store:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring / KWallet)
//!
//! The `keyring` API is blocking, so every call runs on tokio's blocking pool.

use async_trait::async_trait;
use keyring::Entry;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{BackendOperation, SecretError, SecretResult};

use super::backend::{BackendCapability, SecretBackend};

/// Account name used when probing whether an entry can be constructed
const PROBE_ACCOUNT: &str = "__dbvault_probe__";

/// Backend storing secrets in the native OS keychain
pub struct KeyringBackend {
    service_name: String,
}

impl KeyringBackend {
    /// Creates a keychain backend for `service_name`
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    fn map_error(operation: BackendOperation, err: keyring::Error) -> SecretError {
        match err {
            keyring::Error::NoEntry => SecretError::NotFound,
            keyring::Error::NoStorageAccess(inner) => {
                SecretError::classify(operation, format!("no storage access: {inner}"))
            }
            keyring::Error::BadEncoding(_) => {
                SecretError::InvalidValue("secret is not valid UTF-8".to_string())
            }
            other => SecretError::classify(operation, other.to_string()),
        }
    }

    async fn run_blocking<T, F>(
        &self,
        operation: BackendOperation,
        key: &str,
        call: F,
    ) -> SecretResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Entry) -> Result<T, keyring::Error> + Send + 'static,
    {
        let service = self.service_name.clone();
        let key = key.to_string();

        tokio::task::spawn_blocking(move || {
            let entry = Entry::new(&service, &key).map_err(|e| Self::map_error(operation, e))?;
            call(&entry).map_err(|e| Self::map_error(operation, e))
        })
        .await
        .map_err(|e| SecretError::OperationFailed {
            operation,
            message: format!("keychain task failed: {e}"),
        })?
    }
}

#[async_trait]
impl SecretBackend for KeyringBackend {
    async fn store(&self, key: &str, value: &SecretString) -> SecretResult<()> {
        let value = value.clone();
        self.run_blocking(BackendOperation::Store, key, move |entry| {
            entry.set_password(value.expose_secret())
        })
        .await
    }

    async fn retrieve(&self, key: &str) -> SecretResult<SecretString> {
        self.run_blocking(BackendOperation::Retrieve, key, |entry| {
            entry.get_password().map(SecretString::from)
        })
        .await
    }

    async fn delete(&self, key: &str) -> SecretResult<()> {
        match self
            .run_blocking(BackendOperation::Delete, key, |entry| entry.delete_credential())
            .await
        {
            Err(SecretError::NotFound) => Ok(()),
            other => other,
        }
    }

    async fn probe(&self) -> BackendCapability {
        let service = self.service_name.clone();
        let probe = tokio::task::spawn_blocking(move || Entry::new(&service, PROBE_ACCOUNT)).await;

        match probe {
            Ok(Ok(_)) => BackendCapability::Available,
            Ok(Err(e)) => BackendCapability::Unavailable(e.to_string()),
            Err(e) => BackendCapability::Unavailable(format!("probe task failed: {e}")),
        }
    }

    fn backend_id(&self) -> &'static str {
        "keyring"
    }

    fn display_name(&self) -> &'static str {
        "OS keychain"
    }
}
