//! Runner configuration: the engine settings plus where and how often to persist.

use anyhow::{Context, Result};
use intentsim_core::SimulationConfig;
use intentsim_io::StateFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RunnerConfig {
    /// Wall-clock period between ticks.
    pub tick_interval_ms: u64,
    /// Persist the universe every this many ticks; 0 disables autosave.
    pub autosave_interval: u64,
    pub state_dir: String,
    pub state_key: String,
    pub state_format: StateFormat,
    /// Directory for the JSONL event journal; unset disables it.
    pub journal_dir: Option<String>,
    /// Stop after this many ticks.
    pub max_ticks: Option<u64>,
    pub save_on_exit: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 16,
            autosave_interval: 500,
            state_dir: "state".to_string(),
            state_key: "latest".to_string(),
            state_format: StateFormat::GzJson,
            journal_dir: Some("logs".to_string()),
            max_ticks: None,
            save_on_exit: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub simulation: SimulationConfig,
    pub runner: RunnerConfig,
}

impl AppConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("parsing configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.simulation
            .validate()
            .context("invalid [simulation] section")?;
        anyhow::ensure!(self.runner.tick_interval_ms > 0, "tick_interval_ms must be positive");
        anyhow::ensure!(!self.runner.state_key.is_empty(), "state_key must not be empty");
        Ok(())
    }

    /// Reads `path`, or writes the defaults there if it does not exist yet.
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            return Self::from_toml(&content).with_context(|| format!("loading {}", path.display()));
        }

        let default = Self::default();
        match toml::to_string(&default) {
            Ok(text) => {
                if let Err(e) = std::fs::write(path, text) {
                    tracing::warn!(path = %path.display(), error = %e, "Could not write default config");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Could not render default config"),
        }
        Ok(default)
    }
}
