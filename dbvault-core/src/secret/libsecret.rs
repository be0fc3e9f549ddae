//! libsecret backend for GNOME Keyring/KDE Wallet integration
//!
//! This module implements secret storage using the Secret Service API
//! through the `secret-tool` command-line utility.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{BackendOperation, SecretError, SecretResult};

use super::backend::{BackendCapability, SecretBackend};

const SECRET_TOOL: &str = "secret-tool";

/// libsecret backend for GNOME Keyring/KDE Wallet
///
/// Each backend key maps to one Secret Service item carrying the attributes
/// `service=<service name>` and `key=<backend key>`. Works with GNOME
/// Keyring, KDE Wallet and other Secret Service implementations.
///
/// Every `secret-tool` child is killed when its call is dropped, so a call
/// abandoned by a timeout does not leave a process behind (for example one
/// waiting on a keyring unlock prompt).
pub struct LibSecretBackend {
    /// Service attribute shared by every item this backend writes
    service_name: String,
    /// `secret-tool` executable, looked up on `PATH` by default
    program: PathBuf,
}

impl LibSecretBackend {
    /// Creates a new libsecret backend
    ///
    /// # Arguments
    /// * `service_name` - Service attribute for stored secrets
    #[must_use]
    pub fn new(service_name: impl Into<String>) -> Self {
        Self::with_program(service_name, SECRET_TOOL)
    }

    /// Creates a libsecret backend running `program` instead of `secret-tool`
    #[must_use]
    pub fn with_program(service_name: impl Into<String>, program: impl Into<PathBuf>) -> Self {
        Self {
            service_name: service_name.into(),
            program: program.into(),
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.kill_on_drop(true);
        command
    }

    /// Builds the attribute arguments identifying one item
    fn attribute_args(&self, key: &str) -> [String; 4] {
        [
            "service".to_string(),
            self.service_name.clone(),
            "key".to_string(),
            key.to_string(),
        ]
    }

    /// Maps a spawn failure; a missing binary means the backend is absent
    fn spawn_error(operation: BackendOperation, err: &std::io::Error) -> SecretError {
        if err.kind() == ErrorKind::NotFound {
            SecretError::Unavailable(format!("{SECRET_TOOL} is not installed"))
        } else {
            SecretError::classify(operation, format!("Failed to run {SECRET_TOOL}: {err}"))
        }
    }
}

#[async_trait]
impl SecretBackend for LibSecretBackend {
    async fn store(&self, key: &str, value: &SecretString) -> SecretResult<()> {
        let label = format!("{}: {key}", self.service_name);

        let mut child = self
            .command()
            .arg("store")
            .arg(format!("--label={label}"))
            .args(self.attribute_args(key))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Self::spawn_error(BackendOperation::Store, &e))?;

        // The secret only ever travels over stdin, never on the command line
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(value.expose_secret().as_bytes())
                .await
                .map_err(|e| {
                    SecretError::classify(
                        BackendOperation::Store,
                        format!("Failed to write secret: {e}"),
                    )
                })?;
        }

        let output = child.wait_with_output().await.map_err(|e| {
            SecretError::classify(
                BackendOperation::Store,
                format!("Failed to wait for {SECRET_TOOL}: {e}"),
            )
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SecretError::classify(
                BackendOperation::Store,
                format!("{SECRET_TOOL} store failed: {}", stderr.trim()),
            ));
        }

        debug!(backend = self.backend_id(), "Secret stored");
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> SecretResult<SecretString> {
        let output = self
            .command()
            .arg("lookup")
            .args(self.attribute_args(key))
            .output()
            .await
            .map_err(|e| Self::spawn_error(BackendOperation::Retrieve, &e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // secret-tool exits non-zero without a message when nothing matches
            if stderr.trim().is_empty() {
                return Err(SecretError::NotFound);
            }
            return Err(SecretError::classify(
                BackendOperation::Retrieve,
                format!("{SECRET_TOOL} lookup failed: {}", stderr.trim()),
            ));
        }

        let mut value = String::from_utf8(output.stdout)
            .map_err(|_| SecretError::InvalidValue("secret is not valid UTF-8".to_string()))?;
        if value.ends_with('\n') {
            value.pop();
        }
        if value.is_empty() {
            return Err(SecretError::NotFound);
        }

        Ok(SecretString::from(value))
    }

    async fn delete(&self, key: &str) -> SecretResult<()> {
        let output = self
            .command()
            .arg("clear")
            .args(self.attribute_args(key))
            .output()
            .await
            .map_err(|e| Self::spawn_error(BackendOperation::Delete, &e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            // Clearing an item that does not exist is not an error
            if stderr.trim().is_empty() {
                return Ok(());
            }
            return Err(SecretError::classify(
                BackendOperation::Delete,
                format!("{SECRET_TOOL} clear failed: {}", stderr.trim()),
            ));
        }

        Ok(())
    }

    async fn probe(&self) -> BackendCapability {
        match self.command().arg("--version").output().await {
            Ok(output) if output.status.success() => BackendCapability::Available,
            Ok(output) => BackendCapability::Unavailable(format!(
                "{SECRET_TOOL} exited with {}",
                output.status
            )),
            Err(e) => BackendCapability::Unavailable(format!("{SECRET_TOOL} not usable: {e}")),
        }
    }

    fn backend_id(&self) -> &'static str {
        "libsecret"
    }

    fn display_name(&self) -> &'static str {
        "GNOME Keyring / KDE Wallet"
    }
}
