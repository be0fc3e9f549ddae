//! Platform secret store detection
//!
//! Reports which native secret store the current platform offers and whether
//! the tools the default backend relies on are installed.

use std::env;
use std::path::{Path, PathBuf};

/// Description of the platform's native secret store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformInfo {
    /// Operating system identifier (`std::env::consts::OS`)
    pub platform: &'static str,
    /// Service name secrets are filed under
    pub service: String,
    /// Human-readable name of the native store
    pub backend: &'static str,
    /// Whether the platform has a supported native store
    pub supported: bool,
    /// Operator-facing notes
    pub notes: String,
    /// Package to install when the store is missing
    pub install_hint: Option<&'static str>,
    /// Location of `secret-tool`, when present
    pub secret_tool_path: Option<PathBuf>,
}

impl PlatformInfo {
    /// Detects the secret store of the running platform
    #[must_use]
    pub fn detect(service: impl Into<String>) -> Self {
        let mut info = Self::for_platform(env::consts::OS, service);
        if info.platform == "linux" {
            info.secret_tool_path = find_in_path("secret-tool", env::var_os("PATH").as_deref());
        }
        info
    }

    /// Describes the secret store of `platform` without touching the system
    #[must_use]
    pub fn for_platform(platform: &str, service: impl Into<String>) -> Self {
        let service = service.into();
        let (platform, backend, supported, notes, install_hint): (
            &'static str,
            &'static str,
            bool,
            String,
            Option<&'static str>,
        ) = match platform {
            "macos" => (
                "macos",
                "macOS Keychain",
                true,
                "Uses Keychain Access; may prompt for a password on first access".to_string(),
                None,
            ),
            "windows" => (
                "windows",
                "Windows Credential Manager",
                true,
                "May prompt for access permission".to_string(),
                None,
            ),
            "linux" => (
                "linux",
                "Secret Service API",
                true,
                "Requires a running Secret Service (GNOME Keyring, KWallet) and libsecret"
                    .to_string(),
                Some("libsecret-tools"),
            ),
            other => (
                "unknown",
                "Unknown",
                false,
                format!("Platform {other} has no supported secret store; credentials stay in memory"),
                None,
            ),
        };

        Self {
            platform,
            service,
            backend,
            supported,
            notes,
            install_hint,
            secret_tool_path: None,
        }
    }
}

/// Searches `path_var` for an executable named `binary`
fn find_in_path(binary: &str, path_var: Option<&std::ffi::OsStr>) -> Option<PathBuf> {
    env::split_paths(path_var?)
        .map(|dir| dir.join(binary))
        .find(|candidate| is_file(candidate))
}

fn is_file(path: &Path) -> bool {
    path.metadata().is_ok_and(|m| m.is_file())
}
