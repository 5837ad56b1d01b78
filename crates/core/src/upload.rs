use autopush_api_client::{GitDataApi, TreeEntry};
use tracing::{debug, info};

use crate::error::{PushError, Result};
use crate::walk::RelativeEntry;

/// Upload every file as a blob, one request at a time, in walk order.
///
/// The first failure aborts the whole upload. Blobs already created are left
/// on the remote; they are unreferenced and inert.
pub async fn upload_blobs<A: GitDataApi>(
    api: &A,
    entries: &[RelativeEntry],
) -> Result<Vec<TreeEntry>> {
    let total = entries.len();
    let mut tree = Vec::with_capacity(total);

    for (i, entry) in entries.iter().enumerate() {
        let content = tokio::fs::read(&entry.absolute)
            .await
            .map_err(PushError::filesystem(&entry.absolute))?;
        let sha = api.create_blob(&content).await?;
        debug!(
            path = %entry.path,
            sha = %sha,
            "uploaded blob {}/{}",
            i + 1,
            total
        );
        tree.push(TreeEntry::blob(&entry.path, sha));
    }

    info!(files = total, "uploaded all blobs");
    Ok(tree)
}
