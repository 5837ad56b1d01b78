use anyhow::{Context, Result};
use autopush_local_store::LogStore;
use autopush_runtime_config::{AutopushConfig, CONFIG_FILE_NAME};
use std::path::{Path, PathBuf};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "AUTOPUSH_CONFIG";

fn home_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("Could not determine home directory")?;
    Ok(PathBuf::from(home))
}

/// Get the config directory path (~/.config/autopush/)
pub fn config_dir() -> Result<PathBuf> {
    Ok(home_dir()?.join(".config").join("autopush"))
}

/// Get the data directory path (~/.local/share/autopush/), home of the event
/// log and push locks.
pub fn data_dir() -> Result<PathBuf> {
    Ok(home_dir()?.join(".local").join("share").join("autopush"))
}

/// `--config`, then `$AUTOPUSH_CONFIG`, then the default location.
pub fn resolve_config_path(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path);
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

pub fn load_config(path: &Path) -> Result<AutopushConfig> {
    AutopushConfig::load(path).with_context(|| format!("Failed to load {}", path.display()))
}

/// Event log for the given settings.
pub fn open_log_store(config: &AutopushConfig) -> Result<LogStore> {
    Ok(LogStore::in_dir(&data_dir()?, config.log.enabled))
}
