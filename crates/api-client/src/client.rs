use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::api::GitDataApi;
use crate::error::{ApiError, Result};
use crate::repo::{Credentials, Repository};
use crate::types::{
    CreateBlobRequest, CreateCommitRequest, CreateTreeRequest, RateLimitStatus, TreeEntry,
    UpdateRefRequest,
};
use crate::{ACCEPT_HEADER, USER_AGENT};

/// HTTPS client for one repository's Git Data API.
///
/// Every request carries the bearer token, the fixed `Accept` media type and
/// the `autopush/<version>` user agent. Calls never retry; the first
/// unexpected answer is returned as an [`ApiError`].
pub struct GitHubClient {
    client: reqwest::Client,
    api_base: String,
    repository: Repository,
    token: String,
}

impl GitHubClient {
    /// Create a new client with its own connection pool and request timeout.
    pub fn new(
        api_base: &str,
        repository: Repository,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|source| ApiError::Network {
                operation: "build HTTP client".to_string(),
                source,
            })?;
        Ok(Self::with_client(client, api_base, repository, token))
    }

    /// Create a client for the repository and token in `credentials`.
    pub fn from_credentials(
        api_base: &str,
        credentials: &Credentials,
        timeout: Duration,
    ) -> Result<Self> {
        Self::new(
            api_base,
            credentials.repository.clone(),
            credentials.token.clone(),
            timeout,
        )
    }

    /// Create from an existing `reqwest::Client` (e.g. shared in tests).
    pub fn with_client(
        client: reqwest::Client,
        api_base: &str,
        repository: Repository,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            repository,
            token: token.into(),
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }


    fn git_url(&self, path: &str) -> String {
        format!("{}/repos/{}/git/{}", self.api_base, self.repository, path)
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.authorized(self.client.get(url))
    }

    fn post_json<T: Serialize>(&self, url: &str, body: &T) -> RequestBuilder {
        self.authorized(self.client.post(url)).json(body)
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, ACCEPT_HEADER)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
    }

    /// Send a request and return the body text when the status is `expected`.
    async fn send(
        &self,
        operation: &str,
        url: &str,
        req: RequestBuilder,
        expected: StatusCode,
    ) -> Result<String> {
        let resp = req.send().await.map_err(|source| {
            error!(operation, url, "request failed: {source}");
            ApiError::Network {
                operation: operation.to_string(),
                source,
            }
        })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|source| {
            error!(operation, url, "failed to read response body: {source}");
            ApiError::Network {
                operation: operation.to_string(),
                source,
            }
        })?;

        if status != expected {
            error!(
                operation,
                url,
                status = status.as_u16(),
                body = %body,
                "unexpected response status"
            );
            return Err(ApiError::Status {
                operation: operation.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

/// Extract a string field by JSON pointer, or fail with `MissingField`.
fn string_field(operation: &str, body: &str, pointer: &str, field: &'static str) -> Result<String> {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer(pointer).and_then(Value::as_str).map(str::to_string))
        .ok_or_else(|| {
            error!(operation, field, body, "invalid response format");
            ApiError::MissingField {
                operation: operation.to_string(),
                field,
                body: body.to_string(),
            }
        })
}

impl GitDataApi for GitHubClient {
    async fn branch_head(&self, branch: &str) -> Result<String> {
        let operation = format!("get {branch} SHA");
        let url = self.git_url(&format!("refs/heads/{branch}"));
        let body = self
            .send(&operation, &url, self.get(&url), StatusCode::OK)
            .await?;
        let sha = string_field(&operation, &body, "/object/sha", "object.sha")?;
        info!(branch, sha = %sha, "got branch head");
        Ok(sha)
    }

    async fn commit_tree(&self, commit_sha: &str) -> Result<String> {
        let operation = "get base tree SHA";
        let url = self.git_url(&format!("commits/{commit_sha}"));
        let body = self
            .send(operation, &url, self.get(&url), StatusCode::OK)
            .await?;
        let tree = string_field(operation, &body, "/tree/sha", "tree.sha")?;
        debug!(commit = commit_sha, tree = %tree, "got base tree");
        Ok(tree)
    }

    async fn create_blob(&self, content: &[u8]) -> Result<String> {
        let operation = "create blob";
        let url = self.git_url("blobs");
        let body = CreateBlobRequest {
            content: BASE64.encode(content),
            encoding: "base64",
        };
        let text = self
            .send(
                operation,
                &url,
                self.post_json(&url, &body),
                StatusCode::CREATED,
            )
            .await?;
        let sha = string_field(operation, &text, "/sha", "sha")?;
        debug!(sha = %sha, bytes = content.len(), "created blob");
        Ok(sha)
    }

    async fn create_tree(&self, base_tree: &str, entries: &[TreeEntry]) -> Result<String> {
        let operation = "create tree";
        let url = self.git_url("trees");
        let body = CreateTreeRequest {
            base_tree,
            tree: entries,
        };
        let text = self
            .send(
                operation,
                &url,
                self.post_json(&url, &body),
                StatusCode::CREATED,
            )
            .await?;
        let sha = string_field(operation, &text, "/sha", "sha")?;
        info!(sha = %sha, entries = entries.len(), "created tree");
        Ok(sha)
    }

    async fn create_commit(&self, message: &str, tree: &str, parent: &str) -> Result<String> {
        let operation = "create commit";
        let url = self.git_url("commits");
        let body = CreateCommitRequest {
            message,
            tree,
            parents: [parent],
        };
        let text = self
            .send(
                operation,
                &url,
                self.post_json(&url, &body),
                StatusCode::CREATED,
            )
            .await?;
        let sha = string_field(operation, &text, "/sha", "sha")?;
        info!(sha = %sha, parent, "created commit");
        Ok(sha)
    }

    async fn update_ref(&self, branch: &str, sha: &str) -> Result<()> {
        let operation = format!("update {branch} reference");
        let url = self.git_url(&format!("refs/heads/{branch}"));
        // The endpoint accepts POST as an alias for PATCH.
        let body = UpdateRefRequest { sha, force: true };
        self.send(
            &operation,
            &url,
            self.post_json(&url, &body),
            StatusCode::OK,
        )
        .await?;
        info!(branch, sha, "updated branch reference");
        Ok(())
    }

    async fn rate_limit(&self) -> Result<RateLimitStatus> {
        let operation = "read rate limit";
        let url = format!("{}/rate_limit", self.api_base);
        let body = self
            .send(operation, &url, self.get(&url), StatusCode::OK)
            .await?;

        let parsed: Option<(u64, i64)> = serde_json::from_str::<Value>(&body).ok().and_then(|v| {
            let core = v.pointer("/resources/core")?;
            Some((core.get("remaining")?.as_u64()?, core.get("reset")?.as_i64()?))
        });
        let Some((remaining, reset)) = parsed else {
            return Err(ApiError::MissingField {
                operation: operation.to_string(),
                field: "resources.core",
                body,
            });
        };

        let status =
            RateLimitStatus::from_reset_epoch(remaining, reset, chrono::Utc::now().timestamp());
        debug!(
            remaining = status.remaining,
            reset_in_secs = status.reset_in_secs,
            "read rate limit"
        );
        Ok(status)
    }
}
