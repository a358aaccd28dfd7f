use crate::paths;
use crate::workflow::WorkflowTemplates;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Studio configuration, read from `~/.contentq/config.yaml` when present.
/// Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StudioConfig {
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Replaces the embedded workflow templates.
    #[serde(default)]
    pub templates_path: Option<PathBuf>,
}

/// Base timer durations, before simulation-speed scaling.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TimingConfig {
    /// Interval between progress ticks. Default: 200
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
    /// Progress added per tick, in percent. Default: 10
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,
    /// Delay before a processing stage completes itself. Default: 100
    #[serde(default = "default_auto_complete_delay_ms")]
    pub auto_complete_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            progress_interval_ms: default_progress_interval_ms(),
            progress_step: default_progress_step(),
            auto_complete_delay_ms: default_auto_complete_delay_ms(),
        }
    }
}

fn default_progress_interval_ms() -> u64 {
    200
}

fn default_progress_step() -> u32 {
    10
}

fn default_auto_complete_delay_ms() -> u64 {
    100
}

impl TimingConfig {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn auto_complete_delay(&self) -> Duration {
        Duration::from_millis(self.auto_complete_delay_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct SimulationConfig {
    /// Overrides the persisted simulation speed at startup.
    #[serde(default)]
    pub speed: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct StorageConfig {
    /// Directory for persisted demo state. Default: `~/.contentq/sessions/`
    #[serde(default)]
    pub session_dir: Option<PathBuf>,
}

impl StudioConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file as YAML: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `explicit` if given, else the default config file if it exists,
    /// else built-in defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let default_path = paths::default_config_path()?;
        if default_path.exists() {
            tracing::debug!(path = %default_path.display(), "Loading studio config");
            return Self::load(&default_path);
        }
        Ok(Self::default())
    }

    pub fn validate(&self) -> Result<()> {
        if self.timing.progress_interval_ms == 0 {
            anyhow::bail!("timing.progress_interval_ms must be greater than 0");
        }
        if !(1..=100).contains(&self.timing.progress_step) {
            anyhow::bail!(
                "timing.progress_step must be between 1 and 100, got {}",
                self.timing.progress_step
            );
        }
        if let Some(speed) = self.simulation.speed {
            if !speed.is_finite() || speed <= 0.0 {
                anyhow::bail!("simulation.speed must be a positive number, got {}", speed);
            }
        }
        Ok(())
    }

    /// Resolves the session directory, creating the default one if needed.
    pub fn session_dir(&self) -> Result<PathBuf> {
        match &self.storage.session_dir {
            Some(dir) => Ok(dir.clone()),
            None => paths::sessions_dir(),
        }
    }

    pub fn load_templates(&self) -> Result<WorkflowTemplates> {
        match &self.templates_path {
            Some(path) => WorkflowTemplates::load(path),
            None => Ok(WorkflowTemplates::default_templates()),
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
