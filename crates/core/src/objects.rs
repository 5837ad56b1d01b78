//! Tree, commit and reference writes that finish a push.

use autopush_api_client::{GitDataApi, TreeEntry};
use tracing::info;

use crate::error::Result;

/// Create a tree layered over `base_tree_sha`.
///
/// Paths in `entries` replace the base tree's; every other base path is
/// carried forward. No tombstones are ever sent, so files deleted locally
/// stay in the remote tree.
pub async fn build_tree<A: GitDataApi>(
    api: &A,
    entries: &[TreeEntry],
    base_tree_sha: &str,
) -> Result<String> {
    Ok(api.create_tree(base_tree_sha, entries).await?)
}

/// Create exactly one single-parent commit.
pub async fn create_commit<A: GitDataApi>(
    api: &A,
    tree_sha: &str,
    parent_sha: &str,
    message: &str,
) -> Result<String> {
    Ok(api.create_commit(message, tree_sha, parent_sha).await?)
}

/// Force-move the branch to `commit_sha`.
///
/// Does not re-check that the branch still points at the parent; a commit
/// added by anyone else since the head was read is discarded.
pub async fn update_ref<A: GitDataApi>(api: &A, branch: &str, commit_sha: &str) -> Result<()> {
    api.update_ref(branch, commit_sha).await?;
    info!(branch, sha = commit_sha, "branch force-updated");
    Ok(())
}
