//! RSS and Atom sources, parsed with `feed-rs`

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use super::{FeedSource, FeedStats, HttpFetcher, SourceDescriptor};
use crate::models::{Entry, PayloadFormat, SourceKind};
use crate::parser::sanitize::sanitize_text;
use crate::utils::error::{FetchError, ParseError};

/// A syndication feed (RSS 0.9x/1.0/2.0 or Atom)
pub struct SyndicationSource {
    descriptor: SourceDescriptor,
    fetcher: Arc<HttpFetcher>,
}

impl SyndicationSource {
    pub fn new(descriptor: SourceDescriptor, fetcher: Arc<HttpFetcher>) -> Self {
        Self {
            descriptor,
            fetcher,
        }
    }
}

/// Map a feed document into entries for `source`
///
/// - title: the item title, sanitized
/// - link: the `alternate` link, else the first link
/// - description: summary, else the content body, sanitized
/// - published: `published`, else `updated`, else now
///
/// Items with neither a title nor a link are skipped.
pub fn parse_feed(payload: &str, source: &str, kind: SourceKind) -> Result<Vec<Entry>, ParseError> {
    let feed = feed_rs::parser::parse(payload.as_bytes())
        .map_err(|e| ParseError::Feed(e.to_string()))?;

    let total = feed.entries.len();
    let entries: Vec<Entry> = feed
        .entries
        .into_iter()
        .filter_map(|item| {
            let title = item
                .title
                .map(|t| sanitize_text(&t.content))
                .unwrap_or_default();
            let link = item
                .links
                .iter()
                .find(|l| l.rel.as_deref() == Some("alternate"))
                .or_else(|| item.links.first())
                .map(|l| l.href.trim().to_string())
                .unwrap_or_default();

            if title.is_empty() && link.is_empty() {
                debug!(source = %source, id = %item.id, "Skipping item without title or link");
                return None;
            }

            let description = item
                .summary
                .map(|s| s.content)
                .or_else(|| item.content.and_then(|c| c.body))
                .map(|raw| sanitize_text(&raw))
                .unwrap_or_default();
            let published = item.published.or(item.updated).unwrap_or_else(Utc::now);

            Some(Entry::new(source, kind, title, link, description, published))
        })
        .collect();

    debug!(source = %source, total, kept = entries.len(), "Parsed syndication feed");
    Ok(entries)
}

#[async_trait]
impl FeedSource for SyndicationSource {
    fn id(&self) -> &str {
        &self.descriptor.id
    }

    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn kind(&self) -> SourceKind {
        self.descriptor.kind
    }

    fn url(&self) -> &str {
        &self.descriptor.url
    }

    fn format(&self) -> PayloadFormat {
        self.descriptor.format
    }

    async fn fetch(&self) -> Result<String, FetchError> {
        self.fetcher
            .fetch(&self.descriptor.id, &self.descriptor.url, self.descriptor.format)
            .await
    }

    fn parse(&self, payload: &str) -> Result<Vec<Entry>, ParseError> {
        parse_feed(payload, &self.descriptor.id, self.descriptor.kind)
    }

    fn stats(&self) -> FeedStats {
        self.descriptor.stats(self.fetcher.cache_stats())
    }
}
