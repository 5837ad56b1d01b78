use anyhow::{Result, bail};
use autopush_api_client::{Credentials, GitDataApi, GitHubClient};
use autopush_core::{PushError, PushNotifier, PushOptions, PushReport, Pusher};
use autopush_local_store::{LogLevel, LogStore};
use autopush_runtime_config::{AutopushConfig, ValidatedSettings};
use std::path::Path;
use std::time::Duration;
use tracing::{error, warn};

use crate::config::{data_dir, load_config, open_log_store};
use crate::lock::PushLock;
use crate::notify::{CommandHookNotifier, EventLogNotifier};

pub async fn run_push(config_path: &Path) -> Result<()> {
    let cfg = load_config(config_path)?;
    let store = open_log_store(&cfg)?;
    let settings = validated(&cfg, &store).await?;
    push_now(&settings, &store).await
}

/// Validate settings. An invalid config is a [`PushError::Configuration`]:
/// it is recorded in the event log and reaches the failure hook.
pub(crate) async fn validated(
    cfg: &AutopushConfig,
    store: &LogStore,
) -> Result<ValidatedSettings, PushError> {
    let cause = match cfg.validate() {
        Ok(settings) => return Ok(settings),
        Err(e) => e,
    };
    let err = PushError::Configuration(format!("Settings are not properly configured: {cause}"));
    error!(kind = ?err.kind(), "{err}");
    if let Err(log_err) = store.log(LogLevel::Error, "Settings are not properly configured") {
        warn!("Failed to write event log: {log_err}");
    }

    let hooks = CommandHookNotifier::new(&cfg.hooks);
    hooks.on_failure(&err);
    hooks.run_pending().await;
    Err(err)
}

/// Push against GitHub with the per-repository lock held.
pub(crate) async fn push_now(settings: &ValidatedSettings, store: &LogStore) -> Result<()> {
    let credentials = Credentials::new(settings.token.clone(), settings.repository.clone());
    let client = GitHubClient::from_credentials(
        &settings.api_base,
        &credentials,
        Duration::from_secs(settings.timeout_secs),
    )?;

    let _lock = PushLock::acquire(&data_dir()?, &credentials.repository)?;
    let report = execute(&client, settings, store).await;
    print_report(&report);
    match report.last_error() {
        None => Ok(()),
        Some(message) => bail!(message),
    }
}

pub(crate) fn push_options(settings: &ValidatedSettings) -> PushOptions {
    PushOptions {
        commit_message: settings.commit_message.clone(),
        max_rate_limit_wait: Duration::from_secs(settings.rate_limit_max_wait_secs),
    }
}

async fn execute<A: GitDataApi>(
    api: &A,
    settings: &ValidatedSettings,
    store: &LogStore,
) -> PushReport {
    let event_log = EventLogNotifier::new(store);
    let hooks = CommandHookNotifier::new(&settings.hooks);
    let report = Pusher::new(api, push_options(settings))
        .with_notifier(&event_log)
        .with_notifier(&hooks)
        .run(&settings.source_folder)
        .await;
    hooks.run_pending().await;
    report
}

fn print_report(report: &PushReport) {
    if let Some(outcome) = report.outcome() {
        println!(
            "Pushed {} files to {} (commit {})",
            outcome.files, outcome.branch, outcome.commit_sha
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use autopush_api_client::Repository;
    use autopush_core::ErrorKind;
    use autopush_core::testing::FakeGitData;
    use autopush_runtime_config::{HookSettings, LogSettings};
    use std::path::PathBuf;

    fn settings(source: PathBuf) -> ValidatedSettings {
        ValidatedSettings {
            token: "ghp_token".to_string(),
            repository: Repository::new("octo", "site"),
            api_base: "https://api.github.com".to_string(),
            timeout_secs: 30,
            source_folder: source,
            trigger_action: "publish".to_string(),
            trigger_param: None,
            commit_message: "Site snapshot".to_string(),
            rate_limit_max_wait_secs: 60,
            log: LogSettings::default(),
            hooks: HookSettings::default(),
        }
    }

    #[tokio::test]
    async fn execute_pushes_and_logs_success() {
        let source = tempfile::tempdir().unwrap();
        std::fs::write(source.path().join("index.html"), "<h1>hi</h1>").unwrap();
        let data = tempfile::tempdir().unwrap();
        let store = LogStore::in_dir(data.path(), true);
        let fake = FakeGitData::with_branch("main");

        let report = execute(&fake, &settings(source.path().to_path_buf()), &store).await;

        let outcome = report.outcome().unwrap();
        assert_eq!(outcome.branch, "main");
        assert_eq!(fake.commit(&outcome.commit_sha).unwrap().message, "Site snapshot");

        let records = store.last(10).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].message.starts_with("Push operation completed successfully"));
        assert!(records[1].message.starts_with("Starting push operation"));
    }

    #[tokio::test]
    async fn execute_logs_failure() {
        let source = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        let store = LogStore::in_dir(data.path(), true);
        let fake = FakeGitData::new();

        let report = execute(&fake, &settings(source.path().to_path_buf()), &store).await;

        assert!(!report.succeeded());
        let records = store.last(1).unwrap();
        assert_eq!(records[0].level, LogLevel::Error);
        assert!(records[0].message.contains("failed to find default branch"));
    }

    #[tokio::test]
    async fn invalid_settings_are_a_configuration_failure() {
        let data = tempfile::tempdir().unwrap();
        let store = LogStore::in_dir(data.path(), true);

        let err = validated(&AutopushConfig::default(), &store)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err
            .to_string()
            .contains("GitHub Personal Access Token is required."));

        let records = store.last(1).unwrap();
        assert_eq!(records[0].message, "Settings are not properly configured");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn invalid_settings_reach_the_failure_hook() {
        let data = tempfile::tempdir().unwrap();
        let store = LogStore::in_dir(data.path(), true);
        let out = data.path().join("failure.out");
        let mut cfg = AutopushConfig::default();
        cfg.hooks.on_failure = format!("printf '%s' \"$AUTOPUSH_ERROR\" > '{}'", out.display());

        validated(&cfg, &store).await.unwrap_err();

        let message = std::fs::read_to_string(&out).unwrap();
        assert!(message.starts_with("Settings are not properly configured: "));
    }
}
