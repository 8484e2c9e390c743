//! Engine config persistence
//!
//! The config lives in `<config_dir>/tablecad/config.ron`. A missing or broken
//! file never stops the engine; it runs on defaults instead.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use super::EngineConfig;

/// Config manager shared between the session and tools
pub type SharedConfig = Arc<RwLock<ConfigManager>>;

#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Reading or writing the config file failed
    Io(String),
    /// The config could not be encoded as RON
    Serialize(String),
    /// The file is not a valid engine config
    Deserialize(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "config file: {}", msg),
            ConfigError::Serialize(msg) => write!(f, "cannot encode config: {}", msg),
            ConfigError::Deserialize(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Owns the loaded [`EngineConfig`] and tracks unsaved edits
pub struct ConfigManager {
    config: EngineConfig,
    config_path: PathBuf,
    dirty: bool,
}

impl ConfigManager {
    /// Load from the default path
    pub fn new() -> Self {
        Self::with_path(Self::default_config_path())
    }

    /// Create a configuration manager for an explicit path
    ///
    /// A missing or unreadable file falls back to defaults.
    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        let config_path = config_path.into();
        let config = match Self::load_from_path(&config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::info!("Using default config ({})", e);
                EngineConfig::new()
            }
        };

        Self {
            config,
            config_path,
            dirty: false,
        }
    }

    fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tablecad")
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> PathBuf {
        Self::config_dir().join("config.ron")
    }

    /// Parse a config file, warning on a version mismatch
    pub fn load_from_path(path: &Path) -> Result<EngineConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: EngineConfig =
            ron::from_str(&content).map_err(|e| ConfigError::Deserialize(e.to_string()))?;
        tracing::info!("Loaded engine config from {}", path.display());
        if config.version != EngineConfig::CURRENT_VERSION {
            tracing::warn!(
                "Config version {} differs from {}",
                config.version,
                EngineConfig::CURRENT_VERSION
            );
        }
        Ok(config)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Edit the config; marks it unsaved
    pub fn config_mut(&mut self) -> &mut EngineConfig {
        self.dirty = true;
        &mut self.config
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write unsaved edits
    ///
    /// The file is written beside the target and renamed over it, so a
    /// failed save leaves the previous config intact.
    pub fn save(&mut self) -> Result<(), ConfigError> {
        if !self.dirty {
            return Ok(());
        }
        let io = |e: std::io::Error| ConfigError::Io(e.to_string());

        if let Some(dir) = self.config_path.parent() {
            std::fs::create_dir_all(dir).map_err(io)?;
        }
        let pretty = ron::ser::PrettyConfig::default().depth_limit(3);
        let text = ron::ser::to_string_pretty(&self.config, pretty)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;

        let staging = self.config_path.with_extension("ron.tmp");
        std::fs::write(&staging, text).map_err(io)?;
        std::fs::rename(&staging, &self.config_path).map_err(io)?;

        tracing::info!("Wrote engine config to {}", self.config_path.display());
        self.dirty = false;
        Ok(())
    }

    /// Discard edits and loaded values; the defaults still need saving
    pub fn reset_to_defaults(&mut self) {
        self.config = EngineConfig::new();
        self.dirty = true;
    }

    pub fn config_file_path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Load the default config into a shared handle
pub fn create_shared_config() -> SharedConfig {
    Arc::new(RwLock::new(ConfigManager::new()))
}
