//! Error types for the feed pipeline
//!
//! Each stage of a cycle owns a small error enum. Per-entry and per-source
//! errors are isolated by the caller; only [`PersistError`] can fail a cycle.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while fetching a source payload
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP transport error (connect, body read, redirect loop)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status returned by the server
    #[error("Server error: {0}")]
    ServerError(u16),

    /// Request exceeded the configured timeout
    #[error("Request timeout")]
    Timeout,

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Retries exhausted for a source
    #[error("Source {source_id} unavailable after {attempts} attempts: {last}")]
    Unavailable {
        source_id: String,
        attempts: u32,
        last: String,
    },

    /// Shutdown was requested before the fetch could complete
    #[error("Fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Whether another attempt may succeed.
    ///
    /// Timeouts, connection failures, 429 and 5xx responses are transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::ServerError(status) => is_retryable_status(*status),
            Self::Timeout => true,
            Self::InvalidUrl(_) | Self::Unavailable { .. } | Self::Cancelled => {
                false
            }
        }
    }
}

/// Status codes worth another attempt
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}

/// Errors that can occur while mapping a payload into entries
#[derive(Error, Debug)]
pub enum ParseError {
    /// Syndication document could not be parsed at all
    #[error("Malformed feed: {0}")]
    Feed(String),

    /// HTML listing could not be interpreted
    #[error("Malformed HTML listing: {0}")]
    Html(String),

    /// Timestamp in an unsupported format
    #[error("Invalid date format: {0}")]
    InvalidDate(String),
}

/// Errors raised by the location resolver
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    /// A name was extracted but the gazetteer has no coordinates for it
    #[error("Location '{0}' not found in gazetteer")]
    NotFound(String),

    /// Gazetteer file could not be loaded
    #[error("Invalid gazetteer {path}: {reason}")]
    InvalidGazetteer { path: PathBuf, reason: String },
}

/// Errors raised by cache backends
#[derive(Error, Debug)]
pub enum CacheError {
    /// Cache file exists but does not hold a valid record
    #[error("Corrupt cache record {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Filesystem error
    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be serialized
    #[error("Cache serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors raised while writing the alert snapshot
#[derive(Error, Debug)]
pub enum PersistError {
    /// Filesystem error at the given path
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Alerts could not be serialized
    #[error("Failed to serialize alerts: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Existing snapshot is not a valid alert list
    #[error("Corrupt snapshot {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

impl PersistError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
