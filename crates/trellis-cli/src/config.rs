//! Configuration file support for the CLI.
//!
//! Loads and saves CLI configuration from TOML files. Connection settings
//! live in a `[client]` table with the same keys as `ClientConfig`:
//!
//! ```toml
//! output_format = "json"
//!
//! [client]
//! endpoints = ["localhost:10800", "localhost:10801"]
//! connect_timeout_ms = 2000
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use trellis_client::ClientConfig;

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Client connection settings.
    #[serde(default)]
    pub client: ClientConfig,

    /// Default output format.
    #[serde(default = "default_format")]
    pub output_format: String,

    /// Print elapsed time after each step.
    #[serde(default)]
    pub timing: bool,
}

fn default_format() -> String {
    "table".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            output_format: default_format(),
            timing: false,
        }
    }
}

impl CliConfig {
    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Saves configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Loads the default configuration file, or the defaults if there is
    /// none.
    ///
    /// Looks in `~/.config/trellis/config.toml`, then
    /// `~/.trellis/config.toml`.
    pub fn load_default() -> Result<Self> {
        let candidates = [
            Self::default_config_path(),
            dirs::home_dir().map(|h| h.join(".trellis").join("config.toml")),
        ];
        for path in candidates.into_iter().flatten() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }
        Ok(Self::default())
    }

    /// Returns the default configuration file path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("trellis").join("config.toml"))
    }
}
