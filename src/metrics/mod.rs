//! Prometheus metrics for the feed pipeline
//!
//! This module provides metrics tracking for:
//! - Fetching: outcomes per source, cache hits and misses
//! - Processing: entries parsed, entries classified, alerts emitted
//! - Cycles: outcomes and duration
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails or is skipped, metrics operations become no-ops.

use prometheus::{
    register_counter_vec, register_gauge, register_histogram, CounterVec, Encoder, Gauge,
    Histogram, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for all pipeline metrics
struct PipelineMetrics {
    fetches: CounterVec,
    cache_lookups: CounterVec,
    entries_parsed: CounterVec,
    entries_classified: CounterVec,
    alerts_emitted: Gauge,
    cycles: CounterVec,
    cycle_duration: Histogram,
}

/// Global storage for pipeline metrics
static PIPELINE_METRICS: OnceLock<PipelineMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// This function should be called once at application startup.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = newswatch::metrics::init_metrics() {
///     eprintln!("Warning: Metrics initialization failed: {}", e);
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let metrics = PipelineMetrics {
        fetches: register_counter_vec!(
            "newswatch_fetches_total",
            "Source fetches by outcome (network, cache, error)",
            &["source", "outcome"]
        )?,
        cache_lookups: register_counter_vec!(
            "newswatch_cache_lookups_total",
            "Payload cache lookups by result",
            &["result"]
        )?,
        entries_parsed: register_counter_vec!(
            "newswatch_entries_parsed_total",
            "Entries parsed per source",
            &["source"]
        )?,
        entries_classified: register_counter_vec!(
            "newswatch_entries_classified_total",
            "Entries that passed the classifier, by category",
            &["category"]
        )?,
        alerts_emitted: register_gauge!(
            "newswatch_alerts_emitted",
            "Alerts in the most recent snapshot"
        )?,
        cycles: register_counter_vec!(
            "newswatch_cycles_total",
            "Pipeline cycles by outcome",
            &["outcome"]
        )?,
        cycle_duration: register_histogram!(
            "newswatch_cycle_duration_seconds",
            "Wall time of one fetch/classify/locate/assemble cycle",
            vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]
        )?,
    };

    PIPELINE_METRICS
        .set(metrics)
        .map_err(|_| "Pipeline metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    PIPELINE_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Outcome of one source fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Network,
    Cache,
    Error,
}

impl FetchOutcome {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Cache => "cache",
            Self::Error => "error",
        }
    }
}

pub fn record_fetch(source: &str, outcome: FetchOutcome) {
    if let Some(m) = PIPELINE_METRICS.get() {
        m.fetches
            .with_label_values(&[source, outcome.as_str()])
            .inc();
    }
}

pub fn record_cache_lookup(hit: bool) {
    if let Some(m) = PIPELINE_METRICS.get() {
        let result = if hit { "hit" } else { "miss" };
        m.cache_lookups.with_label_values(&[result]).inc();
    }
}

pub fn record_entries_parsed(source: &str, count: usize) {
    if let Some(m) = PIPELINE_METRICS.get() {
        m.entries_parsed
            .with_label_values(&[source])
            .inc_by(count as f64);
    }
}

pub fn record_classified(category: &str) {
    if let Some(m) = PIPELINE_METRICS.get() {
        m.entries_classified.with_label_values(&[category]).inc();
    }
}

pub fn set_alerts_emitted(count: usize) {
    if let Some(m) = PIPELINE_METRICS.get() {
        m.alerts_emitted.set(count as f64);
    }
}

pub fn record_cycle(success: bool) {
    if let Some(m) = PIPELINE_METRICS.get() {
        let outcome = if success { "success" } else { "failure" };
        m.cycles.with_label_values(&[outcome]).inc();
    }
}

/// Histogram timer guard that records duration on drop
pub struct MetricsTimer {
    timer: Option<prometheus::HistogramTimer>,
}

impl MetricsTimer {
    /// Create a no-op timer when metrics are not initialized
    fn noop() -> Self {
        Self { timer: None }
    }
}

impl Drop for MetricsTimer {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop_and_record();
        }
    }
}

/// Start a cycle timer (records on drop)
pub fn start_cycle_timer() -> MetricsTimer {
    match PIPELINE_METRICS.get() {
        Some(m) => MetricsTimer {
            timer: Some(m.cycle_duration.start_timer()),
        },
        None => MetricsTimer::noop(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent_and_recorders_work() {
        init_metrics().unwrap();
        init_metrics().unwrap();
        assert!(metrics_initialized());

        record_fetch("bbc", FetchOutcome::Network);
        record_cache_lookup(true);
        record_entries_parsed("bbc", 3);
        record_classified("violent_crime");
        set_alerts_emitted(2);
        record_cycle(true);
        drop(start_cycle_timer());

        let text = encode_metrics().unwrap();
        assert!(text.contains("newswatch_fetches_total"));
        assert!(text.contains("newswatch_alerts_emitted"));
    }
}
