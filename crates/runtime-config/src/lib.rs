//! Settings for autopush.
//!
//! The CLI reads `autopush.toml` into [`AutopushConfig`] and turns it into
//! [`ValidatedSettings`] before any push runs. Nothing here talks to the
//! network; the pipeline only ever sees validated values.

mod validate;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub use validate::{ConfigIssue, ValidatedSettings, sanitize_key};

/// Canonical config file name.
pub const CONFIG_FILE_NAME: &str = "autopush.toml";

pub use autopush_core::DEFAULT_COMMIT_MESSAGE;

/// Longest rate-limit reset wait (seconds) a push will sit through.
pub const DEFAULT_RATE_LIMIT_MAX_WAIT_SECS: u64 =
    autopush_core::DEFAULT_MAX_RATE_LIMIT_WAIT.as_secs();

/// Number of log records shown by default.
pub const DEFAULT_LOG_VIEW_LIMIT: usize = 10;

/// Top-level configuration (persisted as `autopush.toml`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AutopushConfig {
    #[serde(default)]
    pub github: GitHubSettings,
    #[serde(default)]
    pub source: SourceSettings,
    #[serde(default)]
    pub trigger: TriggerSettings,
    #[serde(default)]
    pub push: PushSettings,
    #[serde(default)]
    pub log: LogSettings,
    #[serde(default)]
    pub hooks: HookSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubSettings {
    /// Personal access token, sent as a bearer credential.
    #[serde(default)]
    pub token: String,
    /// `owner/name`
    #[serde(default)]
    pub repository: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            token: String::new(),
            repository: String::new(),
            api_base: default_api_base(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SourceSettings {
    /// Absolute path of the directory mirrored into the repository.
    #[serde(default)]
    pub folder: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TriggerSettings {
    /// Event name that starts a push.
    #[serde(default)]
    pub action: String,
    /// When non-empty, one scalar event argument must equal this value.
    #[serde(default)]
    pub param: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushSettings {
    #[serde(default = "default_commit_message")]
    pub commit_message: String,
    #[serde(default = "default_rate_limit_max_wait_secs")]
    pub rate_limit_max_wait_secs: u64,
}

impl Default for PushSettings {
    fn default() -> Self {
        Self {
            commit_message: default_commit_message(),
            rate_limit_max_wait_secs: default_rate_limit_max_wait_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_log_view_limit")]
    pub view_limit: usize,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            view_limit: default_log_view_limit(),
        }
    }
}

/// Shell commands run after a push completes.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HookSettings {
    #[serde(default)]
    pub on_success: String,
    /// Runs with `AUTOPUSH_ERROR` set to the failure message.
    #[serde(default)]
    pub on_failure: String,
}

// ── Serde default functions ─────────────────────────────────────────────

fn default_true() -> bool {
    true
}
fn default_api_base() -> String {
    "https://api.github.com".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_commit_message() -> String {
    DEFAULT_COMMIT_MESSAGE.to_string()
}
fn default_rate_limit_max_wait_secs() -> u64 {
    DEFAULT_RATE_LIMIT_MAX_WAIT_SECS
}
fn default_log_view_limit() -> usize {
    DEFAULT_LOG_VIEW_LIMIT
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to write config at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}", join_issues(.0))]
    Invalid(Vec<ConfigIssue>),
}

fn join_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(|issue| issue.message.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

impl AutopushConfig {
    /// Load from disk; a missing file yields defaults (which fail validation).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.apply_compat_fallbacks();
        Ok(config)
    }

    /// Write as pretty TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(write_err)?;
        }
        let body = toml::to_string_pretty(self)
            .map_err(|e| write_err(std::io::Error::other(e.to_string())))?;
        std::fs::write(path, body).map_err(write_err)
    }

    /// Replace blank values that have a sensible default.
    /// Returns true when any field was updated.
    pub fn apply_compat_fallbacks(&mut self) -> bool {
        let mut changed = false;

        if self.push.commit_message.trim().is_empty() {
            self.push.commit_message = default_commit_message();
            changed = true;
        }

        if self.github.api_base.trim().is_empty() {
            self.github.api_base = default_api_base();
            changed = true;
        }

        changed
    }

    /// Check required fields and formats; see [`ValidatedSettings`].
    pub fn validate(&self) -> Result<ValidatedSettings, ConfigError> {
        validate::validate(self).map_err(ConfigError::Invalid)
    }
}
