//! Sliding-window request limiting per source
//!
//! Each source gets at most `max_requests` requests in any window of
//! `window` length. Waiters sleep until the oldest request in the window
//! ages out.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Window parameters for one source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowQuota {
    pub max_requests: u32,
    pub window: Duration,
}

impl WindowQuota {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
        }
    }

    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }
}

impl Default for WindowQuota {
    fn default() -> Self {
        Self::per_minute(6)
    }
}

/// Sliding-window limiter for a single key
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    quota: WindowQuota,
    requests: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    pub fn new(quota: WindowQuota) -> Self {
        Self {
            quota,
            requests: Mutex::new(VecDeque::with_capacity(quota.max_requests as usize)),
        }
    }

    pub fn quota(&self) -> WindowQuota {
        self.quota
    }

    /// Record a request if a slot is free, otherwise return how long until one frees up.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        let now = Instant::now();
        let mut requests = self
            .requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        while let Some(&oldest) = requests.front() {
            if now.duration_since(oldest) >= self.quota.window {
                requests.pop_front();
            } else {
                break;
            }
        }

        if requests.len() < self.quota.max_requests as usize {
            requests.push_back(now);
            return Ok(());
        }

        let oldest = requests.front().copied().unwrap_or(now);
        Err(self.quota.window.saturating_sub(now.duration_since(oldest)))
    }

    /// Block until a slot is free, then record the request.
    pub async fn wait_if_needed(&self) {
        loop {
            match self.try_acquire() {
                Ok(()) => return,
                Err(wait) => {
                    debug!(wait_ms = wait.as_millis() as u64, "Rate limit reached, waiting");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Requests currently counted in the window
    pub fn in_window(&self) -> usize {
        let now = Instant::now();
        let requests = self
            .requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        requests
            .iter()
            .filter(|&&t| now.duration_since(t) < self.quota.window)
            .count()
    }
}

/// Per-source limiters, created on first use
///
/// Sources without an explicit quota get the default one.
#[derive(Debug)]
pub struct SourceRateLimiter {
    default_quota: WindowQuota,
    quotas: HashMap<String, WindowQuota>,
    limiters: Mutex<HashMap<String, Arc<SlidingWindowLimiter>>>,
}

impl SourceRateLimiter {
    pub fn new(default_quota: WindowQuota) -> Self {
        Self {
            default_quota,
            quotas: HashMap::new(),
            limiters: Mutex::new(HashMap::new()),
        }
    }

    /// Set an explicit quota for a source
    pub fn with_quota(mut self, source: impl Into<String>, quota: WindowQuota) -> Self {
        self.quotas.insert(source.into(), quota);
        self
    }

    pub fn quota_for(&self, source: &str) -> WindowQuota {
        self.quotas.get(source).copied().unwrap_or(self.default_quota)
    }

    fn limiter(&self, source: &str) -> Arc<SlidingWindowLimiter> {
        let mut limiters = self
            .limiters
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(
            limiters
                .entry(source.to_string())
                .or_insert_with(|| Arc::new(SlidingWindowLimiter::new(self.quota_for(source)))),
        )
    }

    /// Block until `source` may issue another request
    pub async fn wait_for_source(&self, source: &str) {
        let limiter = self.limiter(source);
        limiter.wait_if_needed().await;
    }

    /// Non-blocking check-and-record for `source`
    pub fn try_acquire(&self, source: &str) -> Result<(), Duration> {
        self.limiter(source).try_acquire()
    }
}

impl Default for SourceRateLimiter {
    fn default() -> Self {
        Self::new(WindowQuota::default())
    }
}
