//! Configuration management for moa-console

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Base URL of the Mixture-of-Agents service
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Timeout in seconds for one generate request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Timeout in seconds for the model catalog request
    #[serde(default = "default_catalog_timeout")]
    pub catalog_timeout_secs: u64,

    /// Poll interval in milliseconds for the TUI event loop
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_server_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

const fn default_request_timeout() -> u64 {
    300
}

const fn default_catalog_timeout() -> u64 {
    10
}

const fn default_poll_interval() -> u64 {
    100
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            request_timeout_secs: default_request_timeout(),
            catalog_timeout_secs: default_catalog_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl Config {
    /// Load configuration from the default location
    ///
    /// # Errors
    ///
    /// Returns an error if reading or parsing the config file fails
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Save configuration to a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be created or the file cannot be written
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory {}", parent.display())
            })?;
        }
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn default_path() -> PathBuf {
        crate::paths::config_file()
    }

    /// Timeout for one generate request
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Timeout for the model catalog request
    #[must_use]
    pub const fn catalog_timeout(&self) -> Duration {
        Duration::from_secs(self.catalog_timeout_secs)
    }
}
