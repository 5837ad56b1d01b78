pub mod api;
pub mod client;
pub mod error;
pub mod repo;
pub mod types;

pub use api::GitDataApi;
pub use client::GitHubClient;
pub use error::{ApiError, Result};
pub use repo::{Credentials, Repository};
pub use types::{RateLimitStatus, TreeEntry};

/// Default base URL of the hosted API.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Media type sent in the `Accept` header of every request.
pub const ACCEPT_HEADER: &str = "application/vnd.github.v3+json";

/// Client identifier sent in the `User-Agent` header of every request.
pub const USER_AGENT: &str = concat!("autopush/", env!("CARGO_PKG_VERSION"));
