//! In-memory Git Data API for tests.
//!
//! [`FakeGitData`] keeps refs, commits, trees and blobs in memory and applies
//! the same merge rule as the real tree endpoint (listed paths override the
//! base tree, everything else carries forward). Failures can be injected per
//! operation, and every call is recorded in order.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use autopush_api_client::{ApiError, GitDataApi, RateLimitStatus, TreeEntry};

/// One recorded API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    RateLimit,
    BranchHead(String),
    CommitTree(String),
    CreateBlob(Vec<u8>),
    CreateTree {
        base: String,
        entries: Vec<TreeEntry>,
    },
    CreateCommit {
        message: String,
        tree: String,
        parent: String,
    },
    UpdateRef {
        branch: String,
        sha: String,
    },
}

impl Call {
    /// Whether the call creates or moves anything on the remote.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Self::CreateBlob(_)
                | Self::CreateTree { .. }
                | Self::CreateCommit { .. }
                | Self::UpdateRef { .. }
        )
    }
}

/// Operations that can be made to fail with [`FakeGitData::fail`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    CommitTree,
    CreateTree,
    CreateCommit,
    UpdateRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeCommit {
    pub tree: String,
    pub parent: Option<String>,
    pub message: String,
}

struct State {
    calls: Vec<Call>,
    refs: BTreeMap<String, String>,
    commits: HashMap<String, FakeCommit>,
    trees: HashMap<String, BTreeMap<String, String>>,
    blobs: HashMap<String, Vec<u8>>,
    rate_limit: RateLimitStatus,
    rate_limit_failure: Option<u16>,
    blob_failure: Option<(usize, u16)>,
    op_failures: HashMap<Op, u16>,
    interleave: Option<(String, usize)>,
    interleaved: Vec<String>,
    blobs_created: usize,
    next_id: u64,
}

impl State {
    fn next_sha(&mut self, kind: &str) -> String {
        self.next_id += 1;
        format!("{kind}-{:04}", self.next_id)
    }

    fn put_tree(&mut self, files: BTreeMap<String, String>) -> String {
        let sha = self.next_sha("tree");
        self.trees.insert(sha.clone(), files);
        sha
    }

    fn put_commit(&mut self, tree: &str, parent: Option<&str>, message: &str) -> String {
        let sha = self.next_sha("commit");
        self.commits.insert(
            sha.clone(),
            FakeCommit {
                tree: tree.to_string(),
                parent: parent.map(str::to_string),
                message: message.to_string(),
            },
        );
        sha
    }

    fn put_blob(&mut self, content: &[u8]) -> String {
        // Content-addressed, like the real store.
        if let Some((sha, _)) = self.blobs.iter().find(|(_, c)| c.as_slice() == content) {
            return sha.clone();
        }
        let sha = self.next_sha("blob");
        self.blobs.insert(sha.clone(), content.to_vec());
        sha
    }

    fn head_tree(&self, branch: &str) -> BTreeMap<String, String> {
        self.refs
            .get(branch)
            .and_then(|sha| self.commits.get(sha))
            .and_then(|commit| self.trees.get(&commit.tree))
            .cloned()
            .unwrap_or_default()
    }

    fn injected(&self, op: Op, operation: &str) -> Result<(), ApiError> {
        match self.op_failures.get(&op) {
            Some(status) => Err(status_error(operation, *status, "injected failure")),
            None => Ok(()),
        }
    }
}

fn status_error(operation: &str, status: u16, message: &str) -> ApiError {
    ApiError::Status {
        operation: operation.to_string(),
        status,
        body: serde_json::json!({ "message": message }).to_string(),
    }
}

pub struct FakeGitData {
    state: Mutex<State>,
}

impl Default for FakeGitData {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeGitData {
    /// A repository without any branches.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                calls: Vec::new(),
                refs: BTreeMap::new(),
                commits: HashMap::new(),
                trees: HashMap::new(),
                blobs: HashMap::new(),
                rate_limit: RateLimitStatus {
                    remaining: 5_000,
                    reset_in_secs: 3_600,
                },
                rate_limit_failure: None,
                blob_failure: None,
                op_failures: HashMap::new(),
                interleave: None,
                interleaved: Vec::new(),
                blobs_created: 0,
                next_id: 0,
            }),
        }
    }

    /// A repository whose only branch `name` holds one empty initial commit.
    pub fn with_branch(name: &str) -> Self {
        let fake = Self::new();
        {
            let mut state = fake.state();
            let tree = state.put_tree(BTreeMap::new());
            let commit = state.put_commit(&tree, None, "Initial commit");
            state.refs.insert(name.to_string(), commit);
        }
        fake
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("fake state poisoned")
    }

    /// Point a new branch at another branch's head.
    pub fn create_branch_like(&self, name: &str, from: &str) {
        let mut state = self.state();
        let sha = state.refs.get(from).cloned().expect("source branch exists");
        state.refs.insert(name.to_string(), sha);
    }

    /// Commit files on top of `branch` without recording calls.
    pub fn seed_files(&self, branch: &str, files: &[(&str, &str)]) {
        let mut state = self.state();
        let parent = state.refs.get(branch).cloned();
        let mut tree = state.head_tree(branch);
        for (path, content) in files {
            let sha = state.put_blob(content.as_bytes());
            tree.insert((*path).to_string(), sha);
        }
        let tree_sha = state.put_tree(tree);
        let commit = state.put_commit(&tree_sha, parent.as_deref(), "seed");
        state.refs.insert(branch.to_string(), commit);
    }

    /// Insert a commit object without moving any ref.
    pub fn insert_commit(&self, tree: &str, parent: Option<&str>, message: &str) -> String {
        self.state().put_commit(tree, parent, message)
    }

    pub fn set_rate_limit(&self, remaining: u64, reset_in_secs: u64) {
        self.state().rate_limit = RateLimitStatus {
            remaining,
            reset_in_secs,
        };
    }

    pub fn fail_rate_limit(&self, status: u16) {
        self.state().rate_limit_failure = Some(status);
    }

    /// Make the `nth` (1-based) blob creation answer with `status`.
    pub fn fail_blob(&self, nth: usize, status: u16) {
        self.state().blob_failure = Some((nth, status));
    }

    pub fn fail(&self, op: Op, status: u16) {
        self.state().op_failures.insert(op, status);
    }

    /// After the `nth` blob is created, another writer commits to `branch`.
    pub fn interleave_commit_after_blob(&self, branch: &str, nth: usize) {
        self.state().interleave = Some((branch.to_string(), nth));
    }

    /// Commits made by the simulated concurrent writer.
    pub fn interleaved_commits(&self) -> Vec<String> {
        self.state().interleaved.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn ref_sha(&self, branch: &str) -> Option<String> {
        self.state().refs.get(branch).cloned()
    }

    pub fn commit(&self, sha: &str) -> Option<FakeCommit> {
        self.state().commits.get(sha).cloned()
    }

    /// Flattened `path -> blob sha` listing of a tree.
    pub fn tree(&self, sha: &str) -> Option<BTreeMap<String, String>> {
        self.state().trees.get(sha).cloned()
    }

    pub fn blob(&self, sha: &str) -> Option<Vec<u8>> {
        self.state().blobs.get(sha).cloned()
    }
}

impl GitDataApi for FakeGitData {
    async fn branch_head(&self, branch: &str) -> Result<String, ApiError> {
        let mut state = self.state();
        state.calls.push(Call::BranchHead(branch.to_string()));
        state
            .refs
            .get(branch)
            .cloned()
            .ok_or_else(|| status_error(&format!("get {branch} SHA"), 404, "Not Found"))
    }

    async fn commit_tree(&self, commit_sha: &str) -> Result<String, ApiError> {
        let mut state = self.state();
        state.calls.push(Call::CommitTree(commit_sha.to_string()));
        state.injected(Op::CommitTree, "get base tree SHA")?;
        state
            .commits
            .get(commit_sha)
            .map(|c| c.tree.clone())
            .ok_or_else(|| status_error("get base tree SHA", 404, "Not Found"))
    }

    async fn create_blob(&self, content: &[u8]) -> Result<String, ApiError> {
        let mut state = self.state();
        state.calls.push(Call::CreateBlob(content.to_vec()));
        state.blobs_created += 1;
        if let Some((nth, status)) = state.blob_failure {
            if nth == state.blobs_created {
                return Err(status_error("create blob", status, "injected failure"));
            }
        }
        let sha = state.put_blob(content);

        if let Some((branch, nth)) = state.interleave.clone() {
            if nth == state.blobs_created {
                let parent = state.refs.get(&branch).cloned();
                let mut files = state.head_tree(&branch);
                let foreign = state.put_blob(b"written by someone else");
                files.insert("FOREIGN.txt".to_string(), foreign);
                let tree = state.put_tree(files);
                let commit = state.put_commit(&tree, parent.as_deref(), "concurrent writer");
                state.refs.insert(branch, commit.clone());
                state.interleaved.push(commit);
            }
        }
        Ok(sha)
    }

    async fn create_tree(&self, base_tree: &str, entries: &[TreeEntry]) -> Result<String, ApiError> {
        let mut state = self.state();
        state.calls.push(Call::CreateTree {
            base: base_tree.to_string(),
            entries: entries.to_vec(),
        });
        state.injected(Op::CreateTree, "create tree")?;

        let mut files = state
            .trees
            .get(base_tree)
            .cloned()
            .ok_or_else(|| status_error("create tree", 422, "Invalid base_tree"))?;
        for entry in entries {
            if !state.blobs.contains_key(&entry.sha) {
                return Err(status_error("create tree", 422, "Invalid tree info"));
            }
            files.insert(entry.path.clone(), entry.sha.clone());
        }
        Ok(state.put_tree(files))
    }

    async fn create_commit(
        &self,
        message: &str,
        tree: &str,
        parent: &str,
    ) -> Result<String, ApiError> {
        let mut state = self.state();
        state.calls.push(Call::CreateCommit {
            message: message.to_string(),
            tree: tree.to_string(),
            parent: parent.to_string(),
        });
        state.injected(Op::CreateCommit, "create commit")?;

        if !state.trees.contains_key(tree) || !state.commits.contains_key(parent) {
            return Err(status_error("create commit", 422, "Invalid tree or parent"));
        }
        Ok(state.put_commit(tree, Some(parent), message))
    }

    async fn update_ref(&self, branch: &str, sha: &str) -> Result<(), ApiError> {
        let mut state = self.state();
        state.calls.push(Call::UpdateRef {
            branch: branch.to_string(),
            sha: sha.to_string(),
        });
        let operation = format!("update {branch} reference");
        state.injected(Op::UpdateRef, &operation)?;

        if !state.refs.contains_key(branch) {
            return Err(status_error(&operation, 422, "Reference does not exist"));
        }
        if !state.commits.contains_key(sha) {
            return Err(status_error(&operation, 422, "Object does not exist"));
        }
        state.refs.insert(branch.to_string(), sha.to_string());
        Ok(())
    }

    async fn rate_limit(&self) -> Result<RateLimitStatus, ApiError> {
        let mut state = self.state();
        state.calls.push(Call::RateLimit);
        if let Some(status) = state.rate_limit_failure {
            return Err(status_error("read rate limit", status, "unavailable"));
        }
        Ok(state.rate_limit)
    }
}
