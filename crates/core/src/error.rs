use std::path::PathBuf;

use autopush_api_client::ApiError;

/// Coarse classification of a push failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Required settings absent or malformed.
    Configuration,
    /// Neither candidate default branch could be read.
    BranchResolution,
    /// Quota exhausted beyond the tolerable wait.
    RateLimit,
    /// Transport failure talking to the remote.
    Network,
    /// Unexpected status code or a response missing a required field.
    Api,
    /// Source root missing, unreadable, or holding unsupported entries.
    Filesystem,
}

/// Terminal failure of one push. The first error at any stage ends the push.
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("{0}")]
    Configuration(String),

    #[error(
        "failed to find default branch (tried both master and main): master: {master}; main: {main}"
    )]
    BranchResolution {
        master: Box<ApiError>,
        main: Box<ApiError>,
    },

    #[error(
        "Rate limit exceeded. Please wait {} minutes before trying again.",
        .wait_secs.div_ceil(60)
    )]
    RateLimit { wait_secs: u64 },

    #[error(transparent)]
    Remote(#[from] ApiError),

    #[error("{}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported entry in source folder (not a regular file or directory): {}", .path.display())]
    UnsupportedEntry { path: PathBuf },
}

impl PushError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::BranchResolution { .. } => ErrorKind::BranchResolution,
            Self::RateLimit { .. } => ErrorKind::RateLimit,
            Self::Remote(e) if e.is_network() => ErrorKind::Network,
            Self::Remote(ApiError::InvalidRepository(_)) => ErrorKind::Configuration,
            Self::Remote(_) => ErrorKind::Api,
            Self::Filesystem { .. } | Self::UnsupportedEntry { .. } => ErrorKind::Filesystem,
        }
    }

    pub(crate) fn filesystem(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Filesystem { path, source }
    }
}

pub type Result<T> = std::result::Result<T, PushError>;
