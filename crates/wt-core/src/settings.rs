use std::path::PathBuf;

use crate::config::{Config, ConfigError};

/// Manages loading and saving [`Config`] to a TOML file on disk.
pub struct SettingsManager {
    path: PathBuf,
}

impl SettingsManager {
    /// Create a new `SettingsManager` that reads/writes the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a `SettingsManager` using the default config location
    /// (`~/.config/webtty/config.toml`).
    pub fn default_path() -> Self {
        let path = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("webtty")
            .join("config.toml");
        Self { path }
    }

    /// Load config from the TOML file on disk.
    pub fn load(&self) -> Result<Config, ConfigError> {
        Config::load_from(&self.path)
    }

    /// Save config to the TOML file on disk, creating parent directories if
    /// they don't exist.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Io(e.to_string()))?;
        }
        let text = config.to_toml()?;
        std::fs::write(&self.path, text).map_err(|e| ConfigError::Io(e.to_string()))?;
        Ok(())
    }

    /// Load config from disk, falling back to `Config::default()` when the
    /// file is missing or unparseable.
    pub fn load_or_default(&self) -> Config {
        self.load().unwrap_or_default()
    }

    /// Return the file path this manager reads/writes.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}
