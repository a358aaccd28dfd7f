//! Centralized home-based storage paths for the studio.
//!
//! Everything lives under `~/.contentq/` (or `$CONTENTQ_HOME` when set):
//! - `config.yaml` - Optional studio configuration
//! - `sessions/` - Persisted demo state, one JSON file per storage key
//! - `logs/` - Command/event journal

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// The name of the studio directory under the home directory.
const CONTENTQ_DIR: &str = ".contentq";

/// Environment variable overriding the studio home directory.
pub const CONTENTQ_HOME_ENV: &str = "CONTENTQ_HOME";

/// Returns the studio home directory: `~/.contentq/`
///
/// Creates the directory if it doesn't exist.
///
/// # Errors
///
/// Returns an error if:
/// - Home directory cannot be determined
/// - Directory creation fails
pub fn contentq_home_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os(CONTENTQ_HOME_ENV) {
        Some(custom) if !custom.is_empty() => PathBuf::from(custom),
        _ => dirs::home_dir()
            .context("Could not determine home directory for studio storage")?
            .join(CONTENTQ_DIR),
    };
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create studio directory: {}", dir.display()))?;
    Ok(dir)
}

/// Returns the sessions directory: `~/.contentq/sessions/`
///
/// Creates the directory if it doesn't exist.
pub fn sessions_dir() -> Result<PathBuf> {
    let dir = contentq_home_dir()?.join("sessions");
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create sessions directory: {}", dir.display()))?;
    Ok(dir)
}

/// Returns the logs directory: `~/.contentq/logs/`
pub fn logs_dir() -> Result<PathBuf> {
    let dir = contentq_home_dir()?.join("logs");
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create logs directory: {}", dir.display()))?;
    Ok(dir)
}

/// Returns the default config path: `~/.contentq/config.yaml`. The file may not exist.
pub fn default_config_path() -> Result<PathBuf> {
    Ok(contentq_home_dir()?.join("config.yaml"))
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
