use autopush_api_client::GitDataApi;
use tracing::{info, warn};

use crate::error::{PushError, Result};

/// Branch probed first.
pub const PRIMARY_BRANCH: &str = "master";

/// Branch probed when the primary cannot be read.
pub const FALLBACK_BRANCH: &str = "main";

/// The resolved default branch and its head commit at pipeline start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchHead {
    pub name: String,
    pub sha: String,
}

/// Resolve the repository's default branch by probing `master`, then `main`.
///
/// Any failure reading `master` (transport, status, malformed body) falls
/// through to `main`. When both fail the error carries both causes. No other
/// candidates are tried.
pub async fn resolve_default_branch<A: GitDataApi>(api: &A) -> Result<BranchHead> {
    let master_err = match api.branch_head(PRIMARY_BRANCH).await {
        Ok(sha) => {
            return Ok(BranchHead {
                name: PRIMARY_BRANCH.to_string(),
                sha,
            });
        }
        Err(e) => e,
    };

    warn!(
        "Could not read {PRIMARY_BRANCH} head ({master_err}), trying {FALLBACK_BRANCH}"
    );

    match api.branch_head(FALLBACK_BRANCH).await {
        Ok(sha) => {
            info!(branch = FALLBACK_BRANCH, sha = %sha, "using fallback default branch");
            Ok(BranchHead {
                name: FALLBACK_BRANCH.to_string(),
                sha,
            })
        }
        Err(main_err) => Err(PushError::BranchResolution {
            master: Box::new(master_err),
            main: Box::new(main_err),
        }),
    }
}
