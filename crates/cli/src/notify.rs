use autopush_core::{PushError, PushNotifier, PushOutcome};
use autopush_local_store::{LogLevel, LogStore};
use autopush_runtime_config::HookSettings;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tokio::process::Command;
use tracing::{debug, warn};

/// Records push lifecycle events in the event log.
pub struct EventLogNotifier<'a> {
    store: &'a LogStore,
}

impl<'a> EventLogNotifier<'a> {
    pub fn new(store: &'a LogStore) -> Self {
        Self { store }
    }

    fn write(&self, level: LogLevel, message: &str) {
        if let Err(e) = self.store.log(level, message) {
            warn!("Failed to write event log: {e}");
        }
    }
}

impl PushNotifier for EventLogNotifier<'_> {
    fn on_start(&self, source_root: &Path) {
        self.write(
            LogLevel::Info,
            &format!("Starting push operation from {}", source_root.display()),
        );
    }

    fn on_success(&self, outcome: &PushOutcome) {
        self.write(
            LogLevel::Info,
            &format!(
                "Push operation completed successfully: {} files, commit {} on {}",
                outcome.files, outcome.commit_sha, outcome.branch
            ),
        );
    }

    fn on_failure(&self, error: &PushError) {
        self.write(
            LogLevel::Error,
            &format!("Push operation failed. Error: {error}"),
        );
    }
}

/// Runs the configured shell command after a push.
///
/// Callbacks only queue the hook; [`CommandHookNotifier::run_pending`] runs
/// it through `tokio::process` once the push has finished. Success hooks see
/// `AUTOPUSH_COMMIT` and `AUTOPUSH_BRANCH`; failure hooks see
/// `AUTOPUSH_ERROR`. Hook failures are logged and otherwise ignored.
pub struct CommandHookNotifier {
    on_success: Option<String>,
    on_failure: Option<String>,
    pending: Mutex<Vec<PendingHook>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingHook {
    command: String,
    env: Vec<(&'static str, String)>,
}

impl CommandHookNotifier {
    pub fn new(hooks: &HookSettings) -> Self {
        let non_empty = |s: &str| Some(s.trim().to_string()).filter(|s| !s.is_empty());
        Self {
            on_success: non_empty(&hooks.on_success),
            on_failure: non_empty(&hooks.on_failure),
            pending: Mutex::new(Vec::new()),
        }
    }

    fn queue(&self, command: &str, env: Vec<(&'static str, String)>) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(PendingHook {
                command: command.to_string(),
                env,
            });
    }

    /// Run every queued hook in order, waiting for each to exit.
    pub async fn run_pending(&self) {
        let hooks = std::mem::take(
            &mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner),
        );
        for hook in hooks {
            let mut cmd = shell(&hook.command);
            cmd.envs(hook.env.iter().map(|(k, v)| (*k, v.as_str())));
            match cmd.status().await {
                Ok(status) if status.success() => debug!("Hook succeeded: {}", hook.command),
                Ok(status) => warn!("Hook `{}` exited with {status}", hook.command),
                Err(e) => warn!("Failed to run hook `{}`: {e}", hook.command),
            }
        }
    }
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(not(unix))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

impl PushNotifier for CommandHookNotifier {
    fn on_success(&self, outcome: &PushOutcome) {
        if let Some(command) = &self.on_success {
            self.queue(
                command,
                vec![
                    ("AUTOPUSH_COMMIT", outcome.commit_sha.clone()),
                    ("AUTOPUSH_BRANCH", outcome.branch.clone()),
                ],
            );
        }
    }

    fn on_failure(&self, error: &PushError) {
        if let Some(command) = &self.on_failure {
            self.queue(command, vec![("AUTOPUSH_ERROR", error.to_string())]);
        }
    }
}
