//! HTTP fetcher shared by all feed sources
//!
//! One fetch goes through:
//! - the payload cache (a fresh record skips the network entirely)
//! - the per-source sliding-window limiter
//! - the process-wide `governor` politeness quota
//! - a GET with the configured timeout and headers
//! - charset-aware decoding
//!
//! Network attempts are wrapped in the retry policy; cancellation is honoured
//! between attempts.

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use regex::bytes::Regex;
use reqwest::{header::CONTENT_TYPE, Client, Response};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::{CacheStats, CacheStore};
use crate::config::Config;
use crate::feeds::headers::build_feed_headers;
use crate::metrics::{self, FetchOutcome};
use crate::models::PayloadFormat;
use crate::utils::error::FetchError;
use crate::utils::rate_limit::{SourceRateLimiter, WindowQuota};
use crate::utils::retry::{with_retry_until, RetryPolicy};
use crate::utils::shutdown::ShutdownSignal;

/// `encoding="..."` in an XML prolog or `charset=...` in an HTML meta tag
static DECLARED_CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:encoding|charset)\s*=\s*["']?([A-Za-z0-9_\-:.]+)"#)
        .expect("Invalid regex pattern")
});

/// Settings for [`HttpFetcher`]
#[derive(Debug, Clone)]
pub struct FetcherSettings {
    pub timeout: Duration,
    pub user_agent: String,
    pub global_requests_per_second: u32,
    pub retry: RetryPolicy,
    pub default_quota: WindowQuota,
    pub source_quotas: Vec<(String, WindowQuota)>,
}

impl FetcherSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.request_timeout(),
            user_agent: config.http.user_agent.clone(),
            global_requests_per_second: config.http.global_requests_per_second,
            retry: config.retry.to_policy(),
            default_quota: config.rate_limit.to_quota(),
            source_quotas: config
                .sources
                .iter()
                .filter_map(|s| s.rate_limit.map(|q| (s.id.clone(), q.to_quota())))
                .collect(),
        }
    }
}

impl Default for FetcherSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Cached, rate-limited, retrying HTTP GET for source payloads
pub struct HttpFetcher {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// Process-wide quota across all sources
    global_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,

    /// Per-source windows
    source_limiter: SourceRateLimiter,

    cache: Arc<dyn CacheStore>,

    retry: RetryPolicy,

    user_agent: String,

    shutdown: ShutdownSignal,
}

impl HttpFetcher {
    /// Create a fetcher
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(
        settings: FetcherSettings,
        cache: Arc<dyn CacheStore>,
        shutdown: ShutdownSignal,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .gzip(true)
            .build()?;

        let rate = NonZeroU32::new(settings.global_requests_per_second).unwrap_or(NonZeroU32::MIN);
        let global_limiter = RateLimiter::direct(Quota::per_second(rate));

        let source_limiter = settings
            .source_quotas
            .into_iter()
            .fold(SourceRateLimiter::new(settings.default_quota), |limiter, (id, quota)| {
                limiter.with_quota(id, quota)
            });

        Ok(Self {
            client,
            global_limiter,
            source_limiter,
            cache,
            retry: settings.retry,
            user_agent: settings.user_agent,
            shutdown,
        })
    }

    /// Build from the application configuration
    pub fn from_config(
        config: &Config,
        cache: Arc<dyn CacheStore>,
        shutdown: ShutdownSignal,
    ) -> Result<Self, FetchError> {
        Self::new(FetcherSettings::from_config(config), cache, shutdown)
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Fetch the payload for `source_id` at `url`.
    ///
    /// # Errors
    ///
    /// `FetchError::Unavailable` once attempts are exhausted or a
    /// non-retryable failure occurs; `FetchError::Cancelled` when shutdown
    /// interrupted the retries; `FetchError::InvalidUrl` for a bad URL.
    pub async fn fetch(
        &self,
        source_id: &str,
        url: &str,
        format: PayloadFormat,
    ) -> Result<String, FetchError> {
        if let Some(body) = self.cache.get(url, None) {
            info!(source = %source_id, "Using cached payload");
            metrics::record_fetch(source_id, FetchOutcome::Cache);
            return Ok(body);
        }

        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;

        let attempts = AtomicU32::new(0);
        let result = with_retry_until(
            &self.retry,
            &self.shutdown,
            || {
                attempts.fetch_add(1, Ordering::Relaxed);
                self.fetch_once(source_id, &parsed, format)
            },
            FetchError::is_retryable,
        )
        .await;
        let attempts = attempts.load(Ordering::Relaxed);

        match result {
            Ok(body) => {
                if let Err(e) = self.cache.set(url, None, &body, None) {
                    warn!(source = %source_id, error = %e, "Failed to cache payload");
                }
                info!(source = %source_id, bytes = body.len(), attempts, "Fetched payload");
                metrics::record_fetch(source_id, FetchOutcome::Network);
                Ok(body)
            }
            Err(_) if self.shutdown.is_cancelled() => {
                debug!(source = %source_id, "Fetch abandoned on shutdown");
                Err(FetchError::Cancelled)
            }
            Err(e) => {
                metrics::record_fetch(source_id, FetchOutcome::Error);
                Err(FetchError::Unavailable {
                    source_id: source_id.to_string(),
                    attempts,
                    last: e.to_string(),
                })
            }
        }
    }

    /// One network attempt behind both limiters
    async fn fetch_once(
        &self,
        source_id: &str,
        url: &Url,
        format: PayloadFormat,
    ) -> Result<String, FetchError> {
        self.source_limiter.wait_for_source(source_id).await;
        self.global_limiter.until_ready().await;

        let headers = build_feed_headers(&self.user_agent, format)?;
        debug!(source = %source_id, url = %url, "Sending request");

        let response = self
            .client
            .get(url.clone())
            .headers(headers)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::ServerError(status.as_u16()));
        }

        decode_response(response).await
    }
}

async fn decode_response(response: Response) -> Result<String, FetchError> {
    // Get Content-Type header and convert to owned String before consuming response
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_default();

    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Http(e)
        }
    })?;

    Ok(decode_bytes(&bytes, &content_type))
}

/// Decode a payload to text
///
/// This tries, in order:
/// 1. The charset named in the Content-Type header
/// 2. A byte order mark, then strict UTF-8
/// 3. The encoding declared in the XML prolog or an HTML meta tag
/// 4. windows-1252, which accepts any byte sequence
///
/// Malformed bytes under a header charset other than UTF-8 become
/// replacement characters rather than failing the source.
pub fn decode_bytes(bytes: &[u8], content_type: &str) -> String {
    if let Some(encoding) = charset_from_content_type(content_type) {
        let (text, _, had_errors) = encoding.decode(bytes);
        if had_errors && encoding == UTF_8 {
            debug!("Payload is not valid UTF-8 despite the header; falling back");
        } else {
            if had_errors {
                warn!(
                    charset = encoding.name(),
                    "Malformed bytes in payload; decoded with replacement characters"
                );
            }
            return text.into_owned();
        }
    }

    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return text.into_owned();
    }

    if let Some(text) = UTF_8.decode_without_bom_handling_and_without_replacement(bytes) {
        return text.into_owned();
    }

    let head = &bytes[..bytes.len().min(1024)];
    if let Some(encoding) = DECLARED_CHARSET
        .captures(head)
        .and_then(|caps| caps.get(1))
        .and_then(|m| Encoding::for_label(m.as_bytes()))
        .filter(|e| *e != UTF_8)
    {
        let (text, _, _) = encoding.decode(bytes);
        return text.into_owned();
    }

    let (text, _, _) = WINDOWS_1252.decode(bytes);
    text.into_owned()
}

fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    content_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
        .and_then(|(_, value)| Encoding::for_label(value.trim().trim_matches('"').as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8() {
        let text = "Croydon – café";
        let decoded = decode_bytes(text.as_bytes(), "application/rss+xml; charset=utf-8");
        assert_eq!(decoded, text);
    }

    #[test]
    fn test_decode_header_charset() {
        // "café" in ISO-8859-1
        let bytes: &[u8] = &[0x63, 0x61, 0x66, 0xe9];
        let decoded = decode_bytes(bytes, "text/html; charset=ISO-8859-1");
        assert_eq!(decoded, "café");
    }

    #[test]
    fn test_decode_windows_1252_fallback() {
        // "£5" with a windows-1252 pound sign and no charset anywhere
        let bytes: &[u8] = &[0xa3, 0x35];
        assert_eq!(decode_bytes(bytes, "text/html"), "£5");
    }

    #[test]
    fn test_decode_declared_encoding() {
        let mut bytes = br#"<?xml version="1.0" encoding="ISO-8859-1"?><rss>"#.to_vec();
        bytes.push(0xe9);
        bytes.extend_from_slice(b"</rss>");
        let decoded = decode_bytes(&bytes, "");
        assert!(decoded.contains("<rss>é</rss>"));
    }

    #[test]
    fn test_decode_header_charset_with_stray_byte() {
        let mut bytes = b"<rss><title>".to_vec();
        bytes.push(0x82);
        bytes.extend_from_slice(b"</title></rss>");
        let decoded = decode_bytes(&bytes, "application/rss+xml; charset=shift_jis");
        assert!(decoded.starts_with("<rss><title>"));
        assert!(decoded.ends_with("</title></rss>"));
        assert!(decoded.contains('\u{fffd}'));
    }

    #[test]
    fn test_decode_bom() {
        let mut bytes = vec![0xef, 0xbb, 0xbf];
        bytes.extend_from_slice("Riot".as_bytes());
        assert_eq!(decode_bytes(&bytes, ""), "Riot");
    }

    #[test]
    fn test_wrong_utf8_header_falls_back() {
        let bytes: &[u8] = &[0xa3, 0x35];
        assert_eq!(decode_bytes(bytes, "text/html; charset=utf-8"), "£5");
    }

    #[test]
    fn test_charset_parsing() {
        assert_eq!(
            charset_from_content_type("text/xml; Charset=\"UTF-8\""),
            Some(UTF_8)
        );
        assert_eq!(charset_from_content_type("text/xml"), None);
    }
}
