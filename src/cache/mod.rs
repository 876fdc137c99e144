//! TTL cache for raw source payloads
//!
//! Payloads are keyed by a SHA-256 of the request URL and its optional
//! parameters. A record is served only while `now - timestamp < ttl`;
//! stale or corrupt records are evicted on access or by
//! [`CacheStore::clear_expired`].
//!
//! Two backends implement [`CacheStore`]:
//! - [`FileCache`]: one JSON record per key under a cache directory
//! - [`MemoryCache`]: in-process map, for tests and simple deployments
//!
//! # Example
//!
//! ```rust,ignore
//! use newswatch::cache::{CacheStore, FileCache};
//!
//! let cache = FileCache::new("cache", 300)?;
//! cache.set("https://feeds.bbci.co.uk/news/rss.xml", None, &body, None)?;
//! let cached = cache.get("https://feeds.bbci.co.uk/news/rss.xml", None);
//! ```

mod file;
mod memory;

pub use file::FileCache;
pub use memory::MemoryCache;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{CacheBackend, CacheSettings};
use crate::utils::error::CacheError;

/// Default record lifetime in seconds
pub const DEFAULT_TTL_SECS: u64 = 300;

/// Optional request parameters folded into the cache key
pub type CacheParams = BTreeMap<String, String>;

/// One cached payload as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub url: String,
    pub params: Option<CacheParams>,
    pub data: String,
    pub timestamp: DateTime<Utc>,
    /// Lifetime in seconds
    pub ttl: u64,
}

impl CacheRecord {
    pub fn new(url: &str, params: Option<&CacheParams>, data: &str, ttl: u64) -> Self {
        Self {
            url: url.to_string(),
            params: params.cloned(),
            data: data.to_string(),
            timestamp: Utc::now(),
            ttl,
        }
    }

    pub fn key(&self) -> String {
        cache_key(&self.url, self.params.as_ref())
    }

    /// Whether the record may still be served at `now`
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.timestamp);
        let ttl_ms = i64::try_from(self.ttl).unwrap_or(i64::MAX).saturating_mul(1000);
        age.num_milliseconds() < ttl_ms
    }

    pub fn is_fresh(&self) -> bool {
        self.is_fresh_at(Utc::now())
    }
}

/// Hash a URL and its parameters into a cache key (hex SHA-256)
pub fn cache_key(url: &str, params: Option<&CacheParams>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    if let Some(params) = params {
        // BTreeMap keeps parameter order stable.
        for (k, v) in params {
            hasher.update(b"\0");
            hasher.update(k.as_bytes());
            hasher.update(b"=");
            hasher.update(v.as_bytes());
        }
    }
    format!("{:x}", hasher.finalize())
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub total_size_bytes: u64,
    pub expired_entries: usize,
    pub valid_entries: usize,
    /// Backend location (directory path or `memory`)
    pub location: String,
    /// Lookups served from cache since startup
    pub hits: u64,
    /// Lookups that missed since startup
    pub misses: u64,
}

impl CacheStats {
    /// Calculate hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Key-value payload store with per-record TTL
pub trait CacheStore: Send + Sync {
    /// Payload for `url` if a fresh record exists; stale and corrupt records are evicted
    fn get(&self, url: &str, params: Option<&CacheParams>) -> Option<String>;

    /// Store `data`, overwriting any existing record. `ttl` defaults to the store's default.
    fn set(
        &self,
        url: &str,
        params: Option<&CacheParams>,
        data: &str,
        ttl: Option<u64>,
    ) -> Result<(), CacheError>;

    /// Remove the record for `url`; returns whether one existed
    fn delete(&self, url: &str, params: Option<&CacheParams>) -> Result<bool, CacheError>;

    /// Evict every stale or corrupt record, returning how many were removed
    fn clear_expired(&self) -> usize;

    fn stats(&self) -> CacheStats;
}

/// Build the configured backend
pub fn from_settings(settings: &CacheSettings) -> Result<Arc<dyn CacheStore>, CacheError> {
    let store: Arc<dyn CacheStore> = match settings.backend {
        CacheBackend::File => Arc::new(FileCache::new(&settings.dir, settings.default_ttl_secs)?),
        CacheBackend::Memory => Arc::new(MemoryCache::new(settings.default_ttl_secs)),
    };
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_stable_hex() {
        let a = cache_key("https://example.com/rss", None);
        let b = cache_key("https://example.com/rss", None);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_cache_key_includes_params() {
        let mut params = CacheParams::new();
        params.insert("page".into(), "2".into());
        let plain = cache_key("https://example.com/news", None);
        let paged = cache_key("https://example.com/news", Some(&params));
        assert_ne!(plain, paged);
    }

    #[test]
    fn test_record_freshness_window() {
        let mut record = CacheRecord::new("u", None, "payload", 300);
        let now = record.timestamp;
        assert!(record.is_fresh_at(now));
        assert!(record.is_fresh_at(now + chrono::Duration::seconds(299)));
        assert!(!record.is_fresh_at(now + chrono::Duration::seconds(300)));

        record.ttl = 0;
        assert!(!record.is_fresh_at(now));
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
    }
}
