//! Client configuration at `~/.chatbridge/cli.toml`.
//!
//! Provides the default server URL. CLI flags always override config file
//! values.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Top-level config file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Default connection settings.
    #[serde(default)]
    pub default: DefaultConfig,
}

/// Default connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultConfig {
    /// Base URL of the bridge server.
    #[serde(default = "default_server")]
    pub server: String,

    /// Seconds to wait for a single HTTP request.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

impl Default for DefaultConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            request_timeout: default_request_timeout(),
        }
    }
}

fn default_server() -> String {
    "http://127.0.0.1:3030".to_string()
}

fn default_request_timeout() -> u64 {
    60
}

impl Config {
    /// Load configuration from a TOML file, returning defaults if the file
    /// does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config at {}", path.display()))?;

        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}
