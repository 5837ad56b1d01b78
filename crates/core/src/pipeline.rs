use std::path::Path;
use std::time::Duration;

use autopush_api_client::GitDataApi;
use tracing::{error, info};

use crate::branch::resolve_default_branch;
use crate::error::{PushError, Result};
use crate::notify::PushNotifier;
use crate::objects::{build_tree, create_commit, update_ref};
use crate::rate_limit::{DEFAULT_MAX_RATE_LIMIT_WAIT, RateDecision, RateLimitGuard};
use crate::upload::upload_blobs;
use crate::walk::{check_source_root, walk_source};

/// Commit message used when none is configured.
pub const DEFAULT_COMMIT_MESSAGE: &str = "Automated push from autopush";

#[derive(Debug, Clone)]
pub struct PushOptions {
    pub commit_message: String,
    /// Longest rate-limit reset the push will wait for before giving up.
    pub max_rate_limit_wait: Duration,
}

impl Default for PushOptions {
    fn default() -> Self {
        Self {
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
            max_rate_limit_wait: DEFAULT_MAX_RATE_LIMIT_WAIT,
        }
    }
}

/// Everything a successful push created or observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushOutcome {
    pub branch: String,
    /// Branch head read at pipeline start; parent of the new commit.
    pub parent_sha: String,
    pub base_tree_sha: String,
    pub tree_sha: String,
    pub commit_sha: String,
    pub files: usize,
}

/// Binary outcome of [`Pusher::run`].
#[derive(Debug)]
pub struct PushReport {
    result: Result<PushOutcome>,
}

impl PushReport {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    pub fn outcome(&self) -> Option<&PushOutcome> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&PushError> {
        self.result.as_ref().err()
    }

    /// Human-readable description of the failure, if any.
    pub fn last_error(&self) -> Option<String> {
        self.error().map(ToString::to_string)
    }
}

/// Sequences one push: rate check, branch resolve, base tree, walk, blob
/// upload, tree, commit, forced ref update.
///
/// There is no mutual exclusion here: two concurrent pushes to the same
/// repository both succeed and the later ref update silently wins. Callers
/// that may overlap must serialize pushes per repository themselves.
pub struct Pusher<'a, A> {
    api: &'a A,
    options: PushOptions,
    notifiers: Vec<&'a dyn PushNotifier>,
}

impl<'a, A: GitDataApi> Pusher<'a, A> {
    pub fn new(api: &'a A, options: PushOptions) -> Self {
        Self {
            api,
            options,
            notifiers: Vec::new(),
        }
    }

    pub fn with_notifier(mut self, notifier: &'a dyn PushNotifier) -> Self {
        self.notifiers.push(notifier);
        self
    }

    /// Run the pipeline once. The first error ends the push; remote objects
    /// already created are not cleaned up.
    pub async fn push(&self, source_root: &Path) -> Result<PushOutcome> {
        let guard = RateLimitGuard::new(self.options.max_rate_limit_wait);
        match guard.check(self.api).await {
            RateDecision::Proceed => {}
            RateDecision::Wait(wait) => tokio::time::sleep(wait).await,
            RateDecision::Abort(e) => return Err(e),
        }

        check_source_root(source_root).await?;

        let head = resolve_default_branch(self.api).await?;
        let base_tree_sha = self.api.commit_tree(&head.sha).await?;

        let entries = walk_source(source_root).await?;
        let tree_entries = upload_blobs(self.api, &entries).await?;

        let tree_sha = build_tree(self.api, &tree_entries, &base_tree_sha).await?;
        let commit_sha = create_commit(
            self.api,
            &tree_sha,
            &head.sha,
            &self.options.commit_message,
        )
        .await?;
        update_ref(self.api, &head.name, &commit_sha).await?;

        Ok(PushOutcome {
            branch: head.name,
            parent_sha: head.sha,
            base_tree_sha,
            tree_sha,
            commit_sha,
            files: entries.len(),
        })
    }

    /// [`Self::push`] plus logging and notifier callbacks.
    pub async fn run(&self, source_root: &Path) -> PushReport {
        info!(source = %source_root.display(), "Starting push");
        for notifier in &self.notifiers {
            notifier.on_start(source_root);
        }

        let result = self.push(source_root).await;
        match &result {
            Ok(outcome) => {
                info!(
                    branch = %outcome.branch,
                    commit = %outcome.commit_sha,
                    files = outcome.files,
                    "Push completed successfully"
                );
                for notifier in &self.notifiers {
                    notifier.on_success(outcome);
                }
            }
            Err(e) => {
                error!(kind = ?e.kind(), "Push failed: {e}");
                for notifier in &self.notifiers {
                    notifier.on_failure(e);
                }
            }
        }
        PushReport { result }
    }
}
