use serde::{Deserialize, Serialize};

/// File mode of every tree entry we emit (non-executable regular file).
pub const BLOB_MODE: &str = "100644";

/// Object type of every tree entry we emit.
pub const BLOB_TYPE: &str = "blob";

/// One `path -> blob` mapping submitted to the tree-creation call.
///
/// Directory structure is implied by the `/` separated path; no tree-type or
/// symlink entries are ever built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub mode: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sha: String,
}

impl TreeEntry {
    pub fn blob(path: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: BLOB_MODE.to_string(),
            kind: BLOB_TYPE.to_string(),
            sha: sha.into(),
        }
    }
}

/// Remaining core quota, read fresh at the start of every push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub remaining: u64,
    /// Seconds until the quota window resets; zero if already past.
    pub reset_in_secs: u64,
}

impl RateLimitStatus {
    /// Build from the server's absolute reset time (unix seconds).
    pub fn from_reset_epoch(remaining: u64, reset_epoch: i64, now_epoch: i64) -> Self {
        let reset_in_secs = reset_epoch.saturating_sub(now_epoch).max(0) as u64;
        Self {
            remaining,
            reset_in_secs,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

// ── Request bodies ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct CreateBlobRequest {
    pub content: String,
    pub encoding: &'static str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateTreeRequest<'a> {
    pub base_tree: &'a str,
    pub tree: &'a [TreeEntry],
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateCommitRequest<'a> {
    pub message: &'a str,
    pub tree: &'a str,
    pub parents: [&'a str; 1],
}

#[derive(Debug, Serialize)]
pub(crate) struct UpdateRefRequest<'a> {
    pub sha: &'a str,
    pub force: bool,
}
