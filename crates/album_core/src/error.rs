use std::fmt;

use thiserror::Error;

/// Transport-level failure classes reported by a document fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    Timeout,
    /// Connection reset or aborted mid-stream.
    ConnectionReset,
    DnsFailure,
    /// The transport succeeded but the server answered with an error status.
    HttpStatus(u16),
    Other,
}

impl NetworkErrorKind {
    /// Only transport failures are retried; status codes never are.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            NetworkErrorKind::Timeout
                | NetworkErrorKind::ConnectionReset
                | NetworkErrorKind::DnsFailure
        )
    }
}

impl fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkErrorKind::Timeout => write!(f, "timeout"),
            NetworkErrorKind::ConnectionReset => write!(f, "connection reset"),
            NetworkErrorKind::DnsFailure => write!(f, "dns failure"),
            NetworkErrorKind::HttpStatus(code) => write!(f, "http status {code}"),
            NetworkErrorKind::Other => write!(f, "network error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: NetworkErrorKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: NetworkErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

/// Whole-operation and per-article failures surfaced by the extractor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("network error: {0}")]
    Network(#[from] FetchError),
    #[error("no article content found at {url}")]
    ContentNotFound { url: String },
    #[error("no automatable browser available: {0}")]
    BrowserUnavailable(String),
    #[error("no article links found at {url}; the page layout may have changed or it requires login")]
    LinkDiscoveryEmpty { url: String },
}

impl ExtractError {
    /// Stable machine-readable identifier for the boundary's `{ kind, message }` shape.
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractError::Validation(_) => "ValidationError",
            ExtractError::Network(_) => "NetworkError",
            ExtractError::ContentNotFound { .. } => "ContentNotFound",
            ExtractError::BrowserUnavailable(_) => "BrowserUnavailable",
            ExtractError::LinkDiscoveryEmpty { .. } => "LinkDiscoveryEmpty",
        }
    }
}

/// Why a single article was left out of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("gave up after {attempts} attempts: {error}")]
    RetriesExhausted { attempts: u32, error: FetchError },
    #[error("fetch failed: {0}")]
    Fetch(FetchError),
    #[error("no article content found")]
    ContentNotFound,
}

impl SkipReason {
    /// Converts a per-article skip into the error reported for a single-article request.
    pub fn into_extract_error(self, url: &str) -> ExtractError {
        match self {
            SkipReason::RetriesExhausted { error, .. } | SkipReason::Fetch(error) => {
                ExtractError::Network(error)
            }
            SkipReason::ContentNotFound => ExtractError::ContentNotFound {
                url: url.to_string(),
            },
        }
    }
}
