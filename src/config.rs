//! Configuration management for the e-paper bridge.
//!
//! Handles loading, saving, and validating configuration from JSON files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "/etc/epaper-bridge/config.json";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config JSON: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Base URL of the display controller
    #[serde(default = "default_device_url")]
    pub device_url: String,

    /// Web server port
    #[serde(default = "default_web_port")]
    pub web_port: u16,

    /// Timeout for every request to the display controller
    #[serde(default = "default_device_timeout_secs")]
    pub device_timeout_secs: u64,

    /// Timeout for downloading images from URLs
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Maximum accepted request body for image uploads
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,

    /// Write rendered image, hex array and payload for every frame
    #[serde(default = "default_true")]
    pub save_artifacts: bool,

    /// Directory for saved artifacts
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Allow only one frame upload to the display at a time
    #[serde(default = "default_true")]
    pub serialize_uploads: bool,

    /// Enable verbose logging
    #[serde(default)]
    pub verbose: bool,
}

fn default_device_url() -> String {
    "http://192.168.0.119".to_string()
}

fn default_web_port() -> u16 {
    5000
}

fn default_device_timeout_secs() -> u64 {
    5
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_max_image_bytes() -> usize {
    20 * 1024 * 1024
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_url: default_device_url(),
            web_port: default_web_port(),
            device_timeout_secs: default_device_timeout_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            max_image_bytes: default_max_image_bytes(),
            save_artifacts: true,
            output_dir: default_output_dir(),
            serialize_uploads: true,
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, or `None` when the file does not exist
    ///
    /// Unreadable, malformed or invalid files are still errors so a broken
    /// config is never silently replaced by defaults.
    pub fn load_optional<P: AsRef<Path>>(path: P) -> Result<Option<Self>, ConfigError> {
        match Self::load(path) {
            Ok(config) => Ok(Some(config)),
            Err(ConfigError::ReadError(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Save configuration to a JSON file atomically
    ///
    /// Writes to a temporary file and renames it over the target, so a
    /// crash mid-write never leaves a truncated config behind.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;

        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &content)?;

        std::fs::rename(&tmp_path, path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            ConfigError::ReadError(e)
        })?;

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(self.device_url.trim()).map_err(|e| {
            ConfigError::ValidationError(format!(
                "device_url '{}' is not a valid URL: {}",
                self.device_url, e
            ))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError(format!(
                "device_url must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.web_port == 0 {
            return Err(ConfigError::ValidationError(
                "web_port must be greater than 0".to_string(),
            ));
        }

        if self.device_timeout_secs < 1 || self.device_timeout_secs > 120 {
            return Err(ConfigError::ValidationError(
                "device_timeout_secs must be between 1 and 120".to_string(),
            ));
        }

        if self.fetch_timeout_secs < 1 || self.fetch_timeout_secs > 300 {
            return Err(ConfigError::ValidationError(
                "fetch_timeout_secs must be between 1 and 300".to_string(),
            ));
        }

        if self.max_image_bytes < 1024 {
            return Err(ConfigError::ValidationError(
                "max_image_bytes must be at least 1024".to_string(),
            ));
        }

        if self.save_artifacts && self.output_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "output_dir is required when save_artifacts is enabled".to_string(),
            ));
        }

        Ok(())
    }

    /// Timeout for display controller requests
    pub fn device_timeout(&self) -> Duration {
        Duration::from_secs(self.device_timeout_secs)
    }

    /// Timeout for image downloads
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}
