//! In-memory cache backend

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use super::{cache_key, CacheParams, CacheRecord, CacheStats, CacheStore};
use crate::metrics;
use crate::utils::error::CacheError;

#[derive(Debug)]
pub struct MemoryCache {
    default_ttl: u64,
    records: Mutex<HashMap<String, CacheRecord>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryCache {
    pub fn new(default_ttl: u64) -> Self {
        Self {
            default_ttl,
            records: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn records(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert a fully-formed record
    pub fn put_record(&self, record: CacheRecord) {
        self.records().insert(record.key(), record);
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, url: &str, params: Option<&CacheParams>) -> Option<String> {
        let key = cache_key(url, params);
        let mut records = self.records();

        let fresh = records.get(&key).map(CacheRecord::is_fresh);
        let hit = match fresh {
            Some(true) => records.get(&key).map(|r| r.data.clone()),
            Some(false) => {
                records.remove(&key);
                None
            }
            None => None,
        };

        if hit.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        metrics::record_cache_lookup(hit.is_some());
        hit
    }

    fn set(
        &self,
        url: &str,
        params: Option<&CacheParams>,
        data: &str,
        ttl: Option<u64>,
    ) -> Result<(), CacheError> {
        self.put_record(CacheRecord::new(
            url,
            params,
            data,
            ttl.unwrap_or(self.default_ttl),
        ));
        Ok(())
    }

    fn delete(&self, url: &str, params: Option<&CacheParams>) -> Result<bool, CacheError> {
        Ok(self.records().remove(&cache_key(url, params)).is_some())
    }

    fn clear_expired(&self) -> usize {
        let mut records = self.records();
        let before = records.len();
        records.retain(|_, record| record.is_fresh());
        before - records.len()
    }

    fn stats(&self) -> CacheStats {
        let records = self.records();
        let valid = records.values().filter(|r| r.is_fresh()).count();
        CacheStats {
            total_entries: records.len(),
            total_size_bytes: records.values().map(|r| r.data.len() as u64).sum(),
            expired_entries: records.len() - valid,
            valid_entries: valid,
            location: "memory".to_string(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
