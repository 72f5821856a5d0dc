//! Server configuration loaded from an optional TOML file

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Main server configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub charts: ChartsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Dataset and model locations
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DataConfig {
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,
}

/// Forecast request limits
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ForecastConfig {
    /// Furthest a request may end past a floor's last known hour. Each hour
    /// beyond the history costs one model call.
    #[serde(default = "default_max_horizon_hours")]
    pub max_horizon_hours: u32,
}

/// Chart rendering configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ChartsConfig {
    /// TrueType font for chart text; the bundled DejaVu Sans is used otherwise
    #[serde(default)]
    pub font_path: Option<PathBuf>,
}

// Default value functions
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    5000
}
fn default_dataset_path() -> PathBuf {
    PathBuf::from("energy_consumption_dataset.csv")
}
fn default_models_dir() -> PathBuf {
    PathBuf::from("models")
}
pub(crate) fn default_max_horizon_hours() -> u32 {
    24 * 366
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dataset_path: default_dataset_path(),
            models_dir: default_models_dir(),
        }
    }
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            max_horizon_hours: default_max_horizon_hours(),
        }
    }
}

impl Config {
    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Address the server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
