use std::path::{Path, PathBuf};

use autopush_api_client::Repository;

use crate::{AutopushConfig, HookSettings, LogSettings};

/// One problem found while validating settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub field: &'static str,
    pub message: String,
}

impl ConfigIssue {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }

    fn required(field: &'static str, label: &str) -> Self {
        Self::new(field, format!("{label} is required."))
    }
}

/// Settings that passed validation, trimmed and normalized.
#[derive(Debug, Clone)]
pub struct ValidatedSettings {
    pub token: String,
    pub repository: Repository,
    pub api_base: String,
    pub timeout_secs: u64,
    pub source_folder: PathBuf,
    pub trigger_action: String,
    pub trigger_param: Option<String>,
    pub commit_message: String,
    pub rate_limit_max_wait_secs: u64,
    pub log: LogSettings,
    pub hooks: HookSettings,
}

/// Lowercase and keep only `[a-z0-9_-]`.
pub fn sanitize_key(raw: &str) -> String {
    raw.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-')
        .collect()
}

/// Strip trailing separators, keeping a bare root intact.
fn untrailing_slash(raw: &str) -> &str {
    let trimmed = raw.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() && !raw.is_empty() {
        &raw[..1]
    } else {
        trimmed
    }
}

pub(crate) fn validate(config: &AutopushConfig) -> Result<ValidatedSettings, Vec<ConfigIssue>> {
    let mut issues = Vec::new();

    let token = config.github.token.trim().to_string();
    if token.is_empty() {
        issues.push(ConfigIssue::required(
            "github.token",
            "GitHub Personal Access Token",
        ));
    }

    let raw_repository = config.github.repository.trim();
    let repository = if raw_repository.is_empty() {
        issues.push(ConfigIssue::required("github.repository", "GitHub Repository"));
        None
    } else {
        match raw_repository.parse::<Repository>() {
            Ok(repository) => Some(repository),
            Err(_) => {
                issues.push(ConfigIssue::new(
                    "github.repository",
                    "Invalid repository format. Please use format: username/repository",
                ));
                None
            }
        }
    };

    if config.github.timeout_secs == 0 {
        issues.push(ConfigIssue::new(
            "github.timeout_secs",
            "Request timeout must be greater than zero.",
        ));
    }

    let folder = untrailing_slash(config.source.folder.trim());
    if folder.is_empty() {
        issues.push(ConfigIssue::required("source.folder", "Source Folder"));
    } else if !Path::new(folder).is_dir() {
        issues.push(ConfigIssue::new(
            "source.folder",
            "Source folder does not exist.",
        ));
    }

    let trigger_action = sanitize_key(&config.trigger.action);
    if trigger_action.is_empty() {
        issues.push(ConfigIssue::required("trigger.action", "Trigger Action Hook"));
    }

    let trigger_param = Some(config.trigger.param.trim().to_string()).filter(|p| !p.is_empty());

    let Some(repository) = repository.filter(|_| issues.is_empty()) else {
        return Err(issues);
    };

    Ok(ValidatedSettings {
        token,
        repository,
        api_base: config.github.api_base.trim().to_string(),
        timeout_secs: config.github.timeout_secs,
        source_folder: PathBuf::from(folder),
        trigger_action,
        trigger_param,
        commit_message: config.push.commit_message.clone(),
        rate_limit_max_wait_secs: config.push.rate_limit_max_wait_secs,
        log: config.log.clone(),
        hooks: config.hooks.clone(),
    })
}
