//! Configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::pool::PoolConfig;

/// Main retrypool configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Admission and retry settings
    pub pool: PoolConfig,

    /// HTTP client settings
    pub http: HttpConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level", skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration with fallback chain
    ///
    /// The first config file that exists is used; a file that exists but
    /// cannot be read or parsed is an error rather than a silent fallback.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Project-local retrypool.yml, then ~/.config/retrypool/retrypool.yml
        let mut candidates = vec![PathBuf::from("retrypool.yml")];
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("retrypool").join("retrypool.yml"));
        }
        Self::load_first_existing(&candidates)
    }

    /// Load the first existing file among `candidates`, or defaults if none exist
    fn load_first_existing(candidates: &[PathBuf]) -> Result<Self> {
        if let Some(path) = candidates.iter().find(|path| path.exists()) {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config")
    }
}

/// HTTP client settings for the built-in executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            user_agent: format!("retrypool/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}
