/// Failure of a single Git Data API call.
///
/// `Network` covers transport failures (DNS, TLS, timeouts, truncated bodies);
/// every other variant means the server answered but not the way the call
/// requires.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("failed to {operation}: {source}")]
    Network {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to {operation}. Status: {status} Response: {body}")]
    Status {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("invalid response format when trying to {operation} (missing `{field}`). Response: {body}")]
    MissingField {
        operation: String,
        field: &'static str,
        body: String,
    },

    #[error("invalid repository `{0}`, expected owner/name")]
    InvalidRepository(String),
}

impl ApiError {
    /// Whether the request never produced an HTTP response.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// HTTP status of the response, when the failure was an unexpected status.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
