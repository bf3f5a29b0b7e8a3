//! Configuration management for the Intake CLI
//!
//! Handles loading configuration from ~/.intake/config.toml

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use intake::IntakeConfig;
use serde::{Deserialize, Serialize};

/// Configuration for the Intake CLI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    /// Pipeline settings (`[llm]`, `[retry]`, `[orchestrator]`, `[matcher]`, `[voice]`)
    #[serde(flatten)]
    pub pipeline: IntakeConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Snapshot file; defaults to ~/.intake/store.json
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn intake_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".intake")
}

impl Config {
    /// Get the path to the config file
    pub fn config_path() -> PathBuf {
        intake_dir().join("config.toml")
    }

    /// Load configuration from the default location, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;
        config.pipeline.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from file, or return defaults if not found
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Snapshot file used by the store, with the command-line override taking priority
    pub fn store_path(&self, cli_override: Option<&Path>) -> PathBuf {
        cli_override
            .map(Path::to_path_buf)
            .or_else(|| self.store.path.clone())
            .unwrap_or_else(|| intake_dir().join("store.json"))
    }
}
