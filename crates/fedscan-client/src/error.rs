//! Client error types.

use thiserror::Error;

/// Result type for node client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors returned by [`crate::NodeClient`] operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport-level failure (connection refused, DNS, TLS, timeout).
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The request exceeded its per-call timeout.
    #[error("Request timed out after {timeout_secs}s: {url}")]
    Timeout { url: String, timeout_secs: u64 },

    /// The remote returned 404 for an identifier we asked about.
    #[error("Not found on {node}: {what}")]
    NotFound { node: String, what: String },

    /// The remote returned an unexpected status code.
    #[error("Unexpected status {status} from {url}: {detail}")]
    UnexpectedStatus {
        status: u16,
        url: String,
        detail: String,
    },

    /// The response body did not match the expected shape. A required field
    /// absent from a response is a data-integrity error, never a silent None.
    #[error("Malformed response from {url}: {message}")]
    Parse { url: String, message: String },

    /// Client-side configuration problem (bad base URL, unreadable identity).
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl ClientError {
    pub fn parse(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn not_found(node: impl Into<String>, what: impl Into<String>) -> Self {
        Self::NotFound {
            node: node.into(),
            what: what.into(),
        }
    }

    /// Whether a retry at the same request could plausibly succeed.
    ///
    /// Transport errors, timeouts, and malformed bodies are retryable (a
    /// proxy mid-restart serves partial garbage); 4xx statuses are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout { .. } | Self::Parse { .. } => true,
            Self::UnexpectedStatus { .. } => self.is_server_error(),
            Self::NotFound { .. } | Self::InvalidConfig(_) => false,
        }
    }

    /// Whether this is a server-side (5xx) status error.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::UnexpectedStatus { status, .. } if *status >= 500)
    }
}
