//! File-per-key cache backend

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use super::{cache_key, CacheParams, CacheRecord, CacheStats, CacheStore};
use crate::metrics;
use crate::utils::error::CacheError;
use crate::utils::write_atomic;

/// Stores each record as `{key}.json` under a directory
#[derive(Debug)]
pub struct FileCache {
    dir: PathBuf,
    default_ttl: u64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl FileCache {
    /// Open (creating if needed) a cache directory
    pub fn new(dir: impl AsRef<Path>, default_ttl: u64) -> Result<Self, CacheError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            default_ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn default_ttl(&self) -> u64 {
        self.default_ttl
    }

    /// Path of the record for `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn read_record(&self, path: &Path) -> Result<Option<CacheRecord>, CacheError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| CacheError::Corrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    /// Write a fully-formed record, replacing any existing one
    pub fn put_record(&self, record: &CacheRecord) -> Result<(), CacheError> {
        let path = self.path_for(&record.key());
        let bytes = serde_json::to_vec_pretty(record)?;
        write_atomic(&path, &bytes)?;
        Ok(())
    }

    fn evict(&self, path: &Path) {
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Failed to evict cache record");
            }
        }
    }

    fn record_paths(&self) -> Vec<PathBuf> {
        match fs::read_dir(&self.dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                .collect(),
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Failed to list cache directory");
                Vec::new()
            }
        }
    }

    fn miss(&self) -> Option<String> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::record_cache_lookup(false);
        None
    }
}

impl CacheStore for FileCache {
    fn get(&self, url: &str, params: Option<&CacheParams>) -> Option<String> {
        let path = self.path_for(&cache_key(url, params));

        let record = match self.read_record(&path) {
            Ok(Some(record)) => record,
            Ok(None) => return self.miss(),
            Err(e) => {
                warn!(url = %url, error = %e, "Purging unreadable cache record");
                self.evict(&path);
                return self.miss();
            }
        };

        if !record.is_fresh() {
            debug!(url = %url, "Cache record expired");
            self.evict(&path);
            return self.miss();
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        metrics::record_cache_lookup(true);
        debug!(url = %url, "Cache hit");
        Some(record.data)
    }

    fn set(
        &self,
        url: &str,
        params: Option<&CacheParams>,
        data: &str,
        ttl: Option<u64>,
    ) -> Result<(), CacheError> {
        let record = CacheRecord::new(url, params, data, ttl.unwrap_or(self.default_ttl));
        self.put_record(&record)?;
        debug!(url = %url, ttl = record.ttl, bytes = data.len(), "Cached payload");
        Ok(())
    }

    fn delete(&self, url: &str, params: Option<&CacheParams>) -> Result<bool, CacheError> {
        let path = self.path_for(&cache_key(url, params));
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn clear_expired(&self) -> usize {
        let mut removed = 0;
        for path in self.record_paths() {
            let stale = match self.read_record(&path) {
                Ok(Some(record)) => !record.is_fresh(),
                Ok(None) => false,
                Err(_) => true,
            };
            if stale && fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, dir = %self.dir.display(), "Cleared expired cache records");
        }
        removed
    }

    fn stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            location: self.dir.display().to_string(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            ..Default::default()
        };

        for path in self.record_paths() {
            stats.total_entries += 1;
            stats.total_size_bytes += fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            match self.read_record(&path) {
                Ok(Some(record)) if record.is_fresh() => stats.valid_entries += 1,
                Ok(None) => stats.total_entries -= 1,
                _ => stats.expired_entries += 1,
            }
        }
        stats
    }
}
