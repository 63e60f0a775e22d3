//! Configuration loading for the dmkit CLI

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};

use dmkit_bayes::SearchConfig;
use dmkit_rl::{CarConfig, GridConfig, QLearningConfig};

/// Configuration for every subcommand
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding `small.csv`, `medium.csv` and `large.csv`
    pub data_dir: PathBuf,
    pub search: SearchConfig,
    pub grid: GridConfig,
    pub car: CarConfig,
    pub qlearning: QLearningConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            search: SearchConfig::default(),
            grid: GridConfig::default(),
            car: CarConfig::default(),
            qlearning: QLearningConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        let config_path = Self::find_config_file();
        match &config_path {
            Some(path) => tracing::debug!("Loading config from: {:?}", path),
            None => tracing::debug!("No config file found, using defaults"),
        }
        Self::load_from(config_path.as_deref())
    }

    /// Layer an optional TOML file and `DMKIT__SECTION__KEY` variables over the defaults
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let mut builder = ConfigBuilder::<config::builder::DefaultState>::default();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path.to_path_buf()).required(false));
        }

        builder = builder.add_source(
            Environment::with_prefix("DMKIT")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Find the configuration file
    pub fn find_config_file() -> Option<PathBuf> {
        // Check in order: DMKIT_CONFIG env, ./dmkit.toml, ~/.config/dmkit/dmkit.toml
        if let Ok(path) = std::env::var("DMKIT_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let local = PathBuf::from("dmkit.toml");
        if local.exists() {
            return Some(local);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".config").join("dmkit").join("dmkit.toml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        None
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}
