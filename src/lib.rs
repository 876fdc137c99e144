//! newswatch - London security alert feed pipeline
//!
//! Pulls police, news and government feeds, keeps the security-relevant
//! items, attaches a place and coordinates, and publishes a ranked alert
//! snapshot for a map front end.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`feeds`] - Feed sources (RSS, Atom, scraped HTML) and the HTTP fetcher
//! - [`cache`] - TTL payload cache (file or in-memory)
//! - [`parser`] - HTML listing extraction, date parsing, text sanitizing
//! - [`classifier`] - Security relevance classifiers
//! - [`location`] - Gazetteer and location resolution
//! - [`alerts`] - Alert assembly and snapshot persistence
//! - [`pipeline`] - Cycle orchestration
//! - [`models`] - Core data structures and types
//! - [`utils`] - Retry, rate limiting, shutdown and helpers
//!
//! # Example
//!
//! ```no_run
//! use newswatch::config::Config;
//! use newswatch::pipeline::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let orchestrator = Orchestrator::from_config(config)?;
//!     let ok = orchestrator.run_single_cycle().await;
//!     println!("cycle succeeded: {ok}");
//!     Ok(())
//! }
//! ```

pub mod alerts;
pub mod cache;
pub mod classifier;
pub mod config;
pub mod error;
pub mod feeds;
pub mod location;
pub mod metrics;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::alerts::{AlertAssembler, SnapshotStore};
    pub use crate::cache::{CacheStore, FileCache, MemoryCache};
    pub use crate::classifier::{AdvancedClassifier, ContentClassifier, KeywordClassifier};
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, NewswatchErrorTrait, Result};
    pub use crate::feeds::{FeedSource, HttpFetcher};
    pub use crate::location::LocationResolver;
    pub use crate::models::{Alert, ClassifiedEntry, Entry, LocatedEntry, SourceKind};
    pub use crate::pipeline::{Orchestrator, ShutdownHandle, SystemStats};
}

// Direct re-exports for convenience
pub use models::{Alert, Entry, SecurityCategory, SourceKind};
pub use pipeline::Orchestrator;
