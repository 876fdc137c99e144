//! Cycle orchestration
//!
//! One cycle runs every stage in order:
//!
//! ```text
//! sources ──fetch/parse──▶ entries ──classify──▶ locate ──assemble──▶ snapshot
//! ```
//!
//! A failing source contributes no entries and the cycle carries on. A
//! cycle only fails when the snapshot cannot be written, or when a stage
//! panics. [`Orchestrator::run`] repeats cycles on a fixed interval until
//! the [`ShutdownHandle`] fires.

use futures::{FutureExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::alerts::{AlertAssembler, SnapshotStore};
use crate::cache::{self, CacheStats, CacheStore};
use crate::classifier::{self, ContentClassifier};
use crate::config::Config;
use crate::error::Result;
use crate::feeds::{self, FeedSource, FeedStats, HttpFetcher};
use crate::location::LocationResolver;
use crate::metrics;
use crate::models::{Alert, Entry};
use crate::utils::rate_limit::{SlidingWindowLimiter, WindowQuota};
use crate::utils::shutdown;

pub use crate::utils::shutdown::{ShutdownHandle, ShutdownSignal};

const HOUR: Duration = Duration::from_secs(3600);

/// Host-facing view of the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStats {
    pub feeds: Vec<FeedStats>,
    pub cache_stats: CacheStats,
    pub running: bool,
    pub cycles_completed: u64,
}

/// Owns every stage and the state shared between cycles
pub struct Orchestrator {
    config: Config,
    sources: Vec<Arc<dyn FeedSource>>,
    classifier: Arc<dyn ContentClassifier>,
    resolver: LocationResolver,
    assembler: AlertAssembler,
    snapshot: SnapshotStore,
    cache: Arc<dyn CacheStore>,
    cycle_guard: Mutex<()>,
    cycle_budget: Option<SlidingWindowLimiter>,
    running: AtomicBool,
    cycles_completed: AtomicU64,
    shutdown: ShutdownHandle,
}

impl Orchestrator {
    /// Assemble an orchestrator from already-built stages.
    ///
    /// The sources' fetcher should hold a signal from `shutdown` so retries
    /// stop when it fires.
    pub fn new(
        config: Config,
        sources: Vec<Arc<dyn FeedSource>>,
        classifier: Arc<dyn ContentClassifier>,
        resolver: LocationResolver,
        cache: Arc<dyn CacheStore>,
        shutdown: ShutdownHandle,
    ) -> Self {
        let snapshot = SnapshotStore::new(&config.app.output_file);
        let cycle_budget = config
            .app
            .max_cycles_per_hour
            .map(|max| SlidingWindowLimiter::new(WindowQuota::new(max, HOUR)));

        Self {
            config,
            sources,
            classifier,
            resolver,
            assembler: AlertAssembler::new(),
            snapshot,
            cache,
            cycle_guard: Mutex::new(()),
            cycle_budget,
            running: AtomicBool::new(false),
            cycles_completed: AtomicU64::new(0),
            shutdown,
        }
    }

    /// Build every stage from configuration
    pub fn from_config(config: Config) -> Result<Self> {
        let (handle, signal) = shutdown::channel();

        let cache = cache::from_settings(&config.cache)?;
        let fetcher = Arc::new(HttpFetcher::from_config(&config, Arc::clone(&cache), signal)?);
        let sources = feeds::build_sources(&config, fetcher)?;
        let classifier = classifier::from_settings(&config.classifier)?;
        let resolver = LocationResolver::from_settings(&config.location)?;

        info!(
            sources = sources.len(),
            classifier = classifier.name(),
            output = %config.app.output_file.display(),
            "Orchestrator initialized"
        );

        Ok(Self::new(config, sources, classifier, resolver, cache, handle))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn snapshot(&self) -> &SnapshotStore {
        &self.snapshot
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Run one complete cycle.
    ///
    /// Returns `false` when persisting fails, when any stage panics, or when
    /// another cycle is still in flight. Never propagates errors.
    pub async fn run_single_cycle(&self) -> bool {
        let Ok(_guard) = self.cycle_guard.try_lock() else {
            warn!("Previous cycle still in flight, skipping");
            return false;
        };

        let cycle_id = Uuid::new_v4();
        let _timer = metrics::start_cycle_timer();

        let outcome = AssertUnwindSafe(self.execute_cycle(cycle_id))
            .catch_unwind()
            .await;

        let success = match outcome {
            Ok(Ok(persisted)) => {
                info!(cycle = %cycle_id, alerts = persisted, "Cycle completed");
                true
            }
            Ok(Err(e)) => {
                error!(cycle = %cycle_id, error = %e, "Cycle failed");
                false
            }
            Err(panic) => {
                error!(cycle = %cycle_id, panic = %panic_message(&*panic), "Cycle panicked");
                false
            }
        };

        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        metrics::record_cycle(success);
        success
    }

    #[instrument(name = "cycle", skip_all, fields(id = %cycle_id))]
    async fn execute_cycle(&self, cycle_id: Uuid) -> Result<usize> {
        let entries = self.fetch_all_feeds().await;
        let alerts = self.process_entries(entries);
        metrics::set_alerts_emitted(alerts.len());

        if alerts.is_empty() && !self.config.app.persist_empty {
            info!("No alerts this cycle, keeping previous snapshot");
            return Ok(0);
        }

        if self.config.app.backup_snapshot {
            if let Err(e) = self.snapshot.backup() {
                warn!(error = %e, "Snapshot backup failed");
            }
        }

        self.snapshot.save(&alerts)?;
        Ok(alerts.len())
    }

    /// Entries from every source, in configured source order.
    ///
    /// Up to `fetch_concurrency` sources are in flight at once.
    pub async fn fetch_all_feeds(&self) -> Vec<Entry> {
        let concurrency = self.config.app.fetch_concurrency.max(1);

        let fetches: Vec<_> = self.sources.iter().map(|source| source.entries()).collect();
        let batches: Vec<Vec<Entry>> = futures::stream::iter(fetches)
            .buffered(concurrency)
            .collect()
            .await;

        let entries: Vec<Entry> = batches.into_iter().flatten().collect();
        info!(sources = self.sources.len(), entries = entries.len(), "Fetched all feeds");
        entries
    }

    /// Classify, locate and assemble a batch of raw entries
    pub fn process_entries(&self, entries: Vec<Entry>) -> Vec<Alert> {
        let classified = self.classifier.filter_entries(entries, None);
        let located = self.resolver.process_entries(classified);
        self.assembler.assemble(&located)
    }

    /// Repeat cycles every polling interval until shutdown.
    ///
    /// Expired cache records are swept every `cache_cleanup_every` cycles.
    /// With an hourly budget configured, ticks beyond it are skipped.
    pub async fn run(&self) {
        self.running.store(true, Ordering::SeqCst);
        let mut shutdown = self.shutdown.subscribe();
        let mut ticker = interval(self.config.polling_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let cleanup_every = u64::from(self.config.app.cache_cleanup_every);
        let mut started: u64 = 0;

        info!(
            interval_secs = self.config.app.polling_interval_secs,
            sources = self.sources.len(),
            "Starting cycle loop"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if let Some(budget) = &self.cycle_budget {
                if let Err(wait) = budget.try_acquire() {
                    warn!(wait_secs = wait.as_secs(), "Hourly cycle budget exhausted, skipping tick");
                    continue;
                }
            }

            self.run_single_cycle().await;
            started += 1;

            if cleanup_every > 0 && started % cleanup_every == 0 {
                self.cleanup_cache();
            }

            if shutdown.is_cancelled() {
                break;
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!(cycles = started, "Cycle loop stopped");
    }

    pub fn get_system_stats(&self) -> SystemStats {
        SystemStats {
            feeds: self.sources.iter().map(|s| s.stats()).collect(),
            cache_stats: self.cache.stats(),
            running: self.is_running(),
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
        }
    }

    /// Evict expired cache records, returning how many were removed
    pub fn cleanup_cache(&self) -> usize {
        let evicted = self.cache.clear_expired();
        debug!(evicted, "Cache cleanup finished");
        evicted
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
