//! Configuration manager for TOML file operations
//!
//! This module provides the `ConfigManager` which handles loading and saving
//! the application settings file.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

use super::settings::AppSettings;

/// File name of the settings file
const CONFIG_FILE: &str = "config.toml";

/// Configuration manager for `dbvault`
///
/// Settings are stored in `~/.config/dbvault/config.toml` by default.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// Base directory for configuration files
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Creates a new `ConfigManager` with the default configuration directory
    ///
    /// # Errors
    /// Returns `ConfigError::NotFound` if the platform has no config directory
    pub fn new() -> ConfigResult<Self> {
        let config_dir = Self::default_config_dir()
            .ok_or_else(|| ConfigError::NotFound(PathBuf::from("~/.config/dbvault")))?;
        Ok(Self { config_dir })
    }

    /// Creates a `ConfigManager` rooted at `config_dir`
    #[must_use]
    pub fn with_config_dir(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Returns the default configuration directory
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("dbvault"))
    }

    /// Returns the configuration directory
    #[must_use]
    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Returns the path of the settings file
    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Loads settings; a missing file yields the defaults
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed or validated
    pub fn load_settings(&self) -> ConfigResult<AppSettings> {
        let path = self.settings_path();
        if !path.exists() {
            debug!(path = %path.display(), "No settings file, using defaults");
            return Ok(AppSettings::default());
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
        let settings: AppSettings = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("{}: {e}", path.display())))?;
        settings.validate()?;

        debug!(path = %path.display(), "Settings loaded");
        Ok(settings)
    }

    /// Saves settings, creating the configuration directory if needed
    ///
    /// # Errors
    /// Returns `ConfigError` if the settings cannot be serialized or written
    pub fn save_settings(&self, settings: &AppSettings) -> ConfigResult<()> {
        settings.validate()?;

        fs::create_dir_all(&self.config_dir)
            .map_err(|e| ConfigError::Write(format!("{}: {e}", self.config_dir.display())))?;

        let content =
            toml::to_string_pretty(settings).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        let path = self.settings_path();
        fs::write(&path, content)
            .map_err(|e| ConfigError::Write(format!("{}: {e}", path.display())))?;

        debug!(path = %path.display(), "Settings saved");
        Ok(())
    }
}
