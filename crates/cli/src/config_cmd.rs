use anyhow::{Context, Result};
use autopush_runtime_config::{AutopushConfig, ConfigError};
use clap::{Args, Subcommand};
use std::path::Path;

use crate::config::load_config;

#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Defaults to `show`.
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ConfigAction {
    /// Show effective settings (token masked) and any validation problems.
    Show,
    /// Update settings and write the config file.
    Set {
        /// GitHub personal access token
        #[arg(long)]
        token: Option<String>,
        /// Target repository as owner/name
        #[arg(long)]
        repository: Option<String>,
        /// Directory mirrored into the repository
        #[arg(long)]
        source: Option<String>,
        /// Event name that starts a push
        #[arg(long)]
        action: Option<String>,
        /// Argument value the event must carry (empty string clears it)
        #[arg(long)]
        param: Option<String>,
        /// Commit message for every push
        #[arg(long)]
        message: Option<String>,
    },
}

pub fn run(config_path: &Path, args: ConfigArgs) -> Result<()> {
    match args.action.unwrap_or(ConfigAction::Show) {
        ConfigAction::Show => run_show(config_path),
        ConfigAction::Set {
            token,
            repository,
            source,
            action,
            param,
            message,
        } => {
            let mut cfg = load_config(config_path)?;
            let changes = SetFields {
                token,
                repository,
                source,
                action,
                param,
                message,
            };
            changes.apply(&mut cfg);
            run_set(config_path, &cfg)
        }
    }
}

struct SetFields {
    token: Option<String>,
    repository: Option<String>,
    source: Option<String>,
    action: Option<String>,
    param: Option<String>,
    message: Option<String>,
}

impl SetFields {
    fn apply(self, cfg: &mut AutopushConfig) {
        if let Some(v) = self.token {
            cfg.github.token = v.trim().to_string();
        }
        if let Some(v) = self.repository {
            cfg.github.repository = v.trim().to_string();
        }
        if let Some(v) = self.source {
            cfg.source.folder = v.trim().to_string();
        }
        if let Some(v) = self.action {
            cfg.trigger.action = v.trim().to_string();
        }
        if let Some(v) = self.param {
            cfg.trigger.param = v.trim().to_string();
        }
        if let Some(v) = self.message {
            cfg.push.commit_message = v;
        }
        cfg.apply_compat_fallbacks();
    }
}

fn run_set(config_path: &Path, cfg: &AutopushConfig) -> Result<()> {
    cfg.save(config_path)
        .with_context(|| format!("Failed to save {}", config_path.display()))?;
    println!("Settings saved to {}", config_path.display());
    print_issues(cfg);
    Ok(())
}

fn run_show(config_path: &Path) -> Result<()> {
    let cfg = load_config(config_path)?;
    println!("config: {}", config_path.display());
    for (key, value) in describe(&cfg) {
        println!("{key:<26} {value}");
    }
    print_issues(&cfg);
    Ok(())
}

fn describe(cfg: &AutopushConfig) -> Vec<(&'static str, String)> {
    vec![
        ("github.token", mask_token(&cfg.github.token)),
        ("github.repository", cfg.github.repository.clone()),
        ("github.api_base", cfg.github.api_base.clone()),
        ("github.timeout_secs", cfg.github.timeout_secs.to_string()),
        ("source.folder", cfg.source.folder.clone()),
        ("trigger.action", cfg.trigger.action.clone()),
        ("trigger.param", cfg.trigger.param.clone()),
        ("push.commit_message", cfg.push.commit_message.clone()),
        (
            "push.rate_limit_max_wait_secs",
            cfg.push.rate_limit_max_wait_secs.to_string(),
        ),
        ("log.enabled", cfg.log.enabled.to_string()),
        ("log.view_limit", cfg.log.view_limit.to_string()),
        ("hooks.on_success", cfg.hooks.on_success.clone()),
        ("hooks.on_failure", cfg.hooks.on_failure.clone()),
    ]
}

fn print_issues(cfg: &AutopushConfig) {
    match cfg.validate() {
        Ok(_) => println!("Settings are valid."),
        Err(ConfigError::Invalid(issues)) => {
            for issue in issues {
                println!("  {}: {}", issue.field, issue.message);
            }
        }
        Err(e) => println!("  {e}"),
    }
}

/// Keep the last four characters of a token visible.
fn mask_token(token: &str) -> String {
    if token.is_empty() {
        return "(not set)".to_string();
    }
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{tail}", "*".repeat(chars.len() - 4))
}
