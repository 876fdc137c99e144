//! Unified error handling for the newswatch crate
//!
//! This module provides a unified error type that consolidates all stage
//! errors into a single `Error` enum, while keeping the stage-specific errors
//! available where callers need to match on them.
//!
//! # Architecture
//!
//! - [`NewswatchErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all stage errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use newswatch::error::{Error, NewswatchErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         tracing::warn!(category = %err.category(), "will retry next cycle: {err}");
//!     } else {
//!         tracing::error!("fatal: {err}");
//!     }
//! }
//! ```

use std::fmt;
use std::io;
use thiserror::Error;

pub use crate::utils::error::{CacheError, FetchError, LocationError, ParseError, PersistError};

/// Common trait for all newswatch error types
pub trait NewswatchErrorTrait: std::error::Error {
    /// Check if this error is recoverable (a later attempt or cycle may succeed)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, unavailable source)
    Network,
    /// Payload parsing errors
    Parsing,
    /// Gazetteer lookups
    Location,
    /// Cache backend errors
    Cache,
    /// Snapshot and filesystem errors
    Storage,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Location => "location",
            Self::Cache => "cache",
            Self::Storage => "storage",
            Self::Config => "config",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

impl NewswatchErrorTrait for FetchError {
    fn is_recoverable(&self) -> bool {
        // An unavailable source is retried on the next cycle.
        self.is_retryable() || matches!(self, Self::Unavailable { .. })
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Network
    }
}

impl NewswatchErrorTrait for ParseError {
    fn is_recoverable(&self) -> bool {
        false
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Parsing
    }
}

impl NewswatchErrorTrait for LocationError {
    fn is_recoverable(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound(_) => ErrorCategory::Location,
            Self::InvalidGazetteer { .. } => ErrorCategory::Config,
        }
    }
}

impl NewswatchErrorTrait for CacheError {
    fn is_recoverable(&self) -> bool {
        // Corrupt records are purged and refetched.
        matches!(self, Self::Corrupt { .. } | Self::Io(_))
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Cache
    }
}

impl NewswatchErrorTrait for PersistError {
    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Storage
    }
}

/// Unified error type for the newswatch crate
#[derive(Error, Debug)]
pub enum Error {
    /// Fetch-specific errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Parse-specific errors
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Location resolution errors
    #[error("Location error: {0}")]
    Location(#[from] LocationError),

    /// Cache backend errors
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Snapshot persistence errors
    #[error("Persist error: {0}")]
    Persist(#[from] PersistError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl NewswatchErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_recoverable(),
            Self::Parse(e) => e.is_recoverable(),
            Self::Location(e) => e.is_recoverable(),
            Self::Cache(e) => e.is_recoverable(),
            Self::Persist(e) => e.is_recoverable(),
            Self::Io(_) => true,
            Self::Json(_) => false,
            Self::Config(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch(e) => e.category(),
            Self::Parse(e) => e.category(),
            Self::Location(e) => e.category(),
            Self::Cache(e) => e.category(),
            Self::Persist(e) => e.category(),
            Self::Io(_) => ErrorCategory::Storage,
            Self::Json(_) => ErrorCategory::Parsing,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: format!("{err:#}"),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
