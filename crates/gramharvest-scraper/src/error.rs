use gramharvest_core::{PostField, TargetKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by {url} (retry after {retry_after_secs}s)")]
    RateLimited { url: String, retry_after_secs: u64 },

    #[error("endpoint not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("content source reported failure for {context}: {message}")]
    Api { context: String, message: String },

    #[error("cannot resolve {kind} \"{query}\": {reason}")]
    TargetUnavailable {
        kind: TargetKind,
        query: String,
        reason: String,
    },

    #[error("{0} targets require a logged-in session")]
    LoginRequired(TargetKind),

    #[error("invalid base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },

    #[error("session file {path}: {reason}")]
    Session { path: String, reason: String },

    #[error("could not process item {shortcode}: {reason}")]
    Item { shortcode: String, reason: String },
}

impl ScraperError {
    /// Errors that mean the target itself could not be resolved, as opposed
    /// to a later page failing.
    #[must_use]
    pub fn is_resolution_failure(&self) -> bool {
        matches!(
            self,
            ScraperError::TargetUnavailable { .. } | ScraperError::LoginRequired(_)
        )
    }
}

/// A single attribute could not be read from an item.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("{0} is not present on this item")]
    Missing(PostField),

    #[error("{field} has an unexpected shape: {reason}")]
    Malformed { field: PostField, reason: String },
}

/// The media download for one item failed.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("item has no shortcode to name its files after")]
    NoShortcode,

    #[error("HTTP error downloading {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected HTTP status {status} downloading {url}")]
    Status { status: u16, url: String },

    #[error("I/O error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not serialize metadata for {shortcode}: {source}")]
    Metadata {
        shortcode: String,
        #[source]
        source: serde_json::Error,
    },
}
