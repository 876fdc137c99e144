//! Scraped news listing pages

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use url::Url;

use super::{FeedSource, FeedStats, HttpFetcher, SourceDescriptor};
use crate::models::{Entry, PayloadFormat, SourceKind};
use crate::parser::ListingParser;
use crate::utils::error::{FetchError, ParseError};

/// A news website without a feed, read through [`ListingParser`]
pub struct HtmlSource {
    descriptor: SourceDescriptor,
    parser: ListingParser,
    fetcher: Arc<HttpFetcher>,
}

impl HtmlSource {
    /// `base_url` resolves relative article links
    pub fn new(descriptor: SourceDescriptor, base_url: Url, fetcher: Arc<HttpFetcher>) -> Self {
        Self {
            descriptor,
            parser: ListingParser::new(Some(base_url)),
            fetcher,
        }
    }
}

#[async_trait]
impl FeedSource for HtmlSource {
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
        PayloadFormat::Html
    }

    async fn fetch(&self) -> Result<String, FetchError> {
        self.fetcher
            .fetch(&self.descriptor.id, &self.descriptor.url, PayloadFormat::Html)
            .await
    }

    fn parse(&self, payload: &str) -> Result<Vec<Entry>, ParseError> {
        let entries = self
            .parser
            .parse(payload)?
            .into_iter()
            .map(|item| {
                Entry::new(
                    &self.descriptor.id,
                    self.descriptor.kind,
                    item.title,
                    item.link,
                    item.description,
                    item.published.unwrap_or_else(Utc::now),
                )
            })
            .collect();
        Ok(entries)
    }

    fn stats(&self) -> FeedStats {
        self.descriptor.stats(self.fetcher.cache_stats())
    }
}
