//! Feed sources
//!
//! Every provider implements [`FeedSource`]: fetch the raw payload, then
//! parse it into [`Entry`] values. Syndication feeds (RSS and Atom) share
//! [`SyndicationSource`]; scraped listing pages use [`HtmlSource`].

pub mod fetcher;
pub mod headers;
pub mod html;
pub mod syndication;

pub use fetcher::{FetcherSettings, HttpFetcher};
pub use html::HtmlSource;
pub use syndication::SyndicationSource;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use url::Url;

use crate::cache::CacheStats;
use crate::config::{Config, SourceConfig};
use crate::error::{Error, Result};
use crate::metrics;
use crate::models::{Entry, PayloadFormat, SourceKind};
use crate::utils::error::{FetchError, ParseError};

/// Snapshot of one source for `get_system_stats`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedStats {
    pub id: String,
    pub name: String,
    pub url: String,
    pub kind: SourceKind,
    pub format: PayloadFormat,
    pub cache_stats: CacheStats,
}

#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Configured source id, written into every entry
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    fn kind(&self) -> SourceKind;

    fn url(&self) -> &str;

    fn format(&self) -> PayloadFormat;

    /// Raw payload for the configured endpoint
    async fn fetch(&self) -> std::result::Result<String, FetchError>;

    /// Map a payload into entries; unusable items are skipped
    fn parse(&self, payload: &str) -> std::result::Result<Vec<Entry>, ParseError>;

    fn stats(&self) -> FeedStats;

    /// Fetch and parse, isolating failures: any error yields no entries.
    async fn entries(&self) -> Vec<Entry> {
        let payload = match self.fetch().await {
            Ok(payload) => payload,
            Err(FetchError::Cancelled) => {
                info!(source = %self.id(), "Fetch cancelled");
                return Vec::new();
            }
            Err(e) => {
                error!(source = %self.id(), error = %e, "Failed to fetch source");
                return Vec::new();
            }
        };

        match self.parse(&payload) {
            Ok(entries) => {
                info!(source = %self.id(), entries = entries.len(), "Parsed source entries");
                metrics::record_entries_parsed(self.id(), entries.len());
                entries
            }
            Err(e) => {
                warn!(source = %self.id(), error = %e, "Failed to parse source payload");
                Vec::new()
            }
        }
    }
}

/// Identity shared by all source implementations
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    pub id: String,
    pub name: String,
    pub url: String,
    pub kind: SourceKind,
    pub format: PayloadFormat,
}

impl SourceDescriptor {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        url: impl Into<String>,
        kind: SourceKind,
        format: PayloadFormat,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            kind,
            format,
        }
    }

    fn stats(&self, cache_stats: CacheStats) -> FeedStats {
        FeedStats {
            id: self.id.clone(),
            name: self.name.clone(),
            url: self.url.clone(),
            kind: self.kind,
            format: self.format,
            cache_stats,
        }
    }
}

impl From<&SourceConfig> for SourceDescriptor {
    fn from(config: &SourceConfig) -> Self {
        Self::new(&config.id, &config.name, &config.url, config.kind, config.format)
    }
}

/// Build one source from its configuration
pub fn build_source(config: &SourceConfig, fetcher: Arc<HttpFetcher>) -> Result<Arc<dyn FeedSource>> {
    let descriptor = SourceDescriptor::from(config);
    let source: Arc<dyn FeedSource> = match config.format {
        PayloadFormat::Rss | PayloadFormat::Atom => {
            Arc::new(SyndicationSource::new(descriptor, fetcher))
        }
        PayloadFormat::Html => {
            let base = match &config.base_url {
                Some(base) => Url::parse(base),
                None => Url::parse(&config.url).and_then(|u| u.join("/")),
            }
            .map_err(|e| Error::config(format!("invalid base URL for {}: {e}", config.id)))?;
            Arc::new(HtmlSource::new(descriptor, base, fetcher))
        }
    };
    Ok(source)
}

/// Sources for every enabled entry in the configuration, in configured order
pub fn build_sources(config: &Config, fetcher: Arc<HttpFetcher>) -> Result<Vec<Arc<dyn FeedSource>>> {
    config
        .enabled_sources()
        .map(|source| build_source(source, Arc::clone(&fetcher)))
        .collect()
}
