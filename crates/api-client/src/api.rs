use std::future::Future;

use crate::error::Result;
use crate::types::{RateLimitStatus, TreeEntry};

/// The low-level Git Data operations the push pipeline is built from.
///
/// [`crate::GitHubClient`] talks HTTPS; tests substitute in-memory doubles.
/// Every method is one remote round trip and never retries.
pub trait GitDataApi {
    /// Head commit sha of `refs/heads/{branch}`.
    fn branch_head(&self, branch: &str) -> impl Future<Output = Result<String>> + Send;

    /// Tree sha referenced by a commit.
    fn commit_tree(&self, commit_sha: &str) -> impl Future<Output = Result<String>> + Send;

    /// Upload raw bytes as a blob and return its sha.
    fn create_blob(&self, content: &[u8]) -> impl Future<Output = Result<String>> + Send;

    /// Create a tree layered over `base_tree`. Paths absent from `entries`
    /// are carried forward from the base tree by the server.
    fn create_tree(
        &self,
        base_tree: &str,
        entries: &[TreeEntry],
    ) -> impl Future<Output = Result<String>> + Send;

    /// Create a single-parent commit.
    fn create_commit(
        &self,
        message: &str,
        tree: &str,
        parent: &str,
    ) -> impl Future<Output = Result<String>> + Send;

    /// Force-move `refs/heads/{branch}` to `sha`, fast-forward or not.
    fn update_ref(&self, branch: &str, sha: &str) -> impl Future<Output = Result<()>> + Send;

    /// Current core request quota.
    fn rate_limit(&self) -> impl Future<Output = Result<RateLimitStatus>> + Send;
}
