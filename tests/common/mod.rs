//! Common test utilities

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use newswatch::cache::MemoryCache;
use newswatch::config::{CacheBackend, Config, RetrySettings, SourceConfig};
use newswatch::feeds::{FetcherSettings, HttpFetcher};
use newswatch::models::{Entry, PayloadFormat, SourceKind};
use newswatch::utils::retry::RetryPolicy;
use newswatch::utils::shutdown::ShutdownSignal;

pub const RSS_PATH: &str = "/news/rss.xml";
pub const HTML_PATH: &str = "/news";
pub const ATOM_PATH: &str = "/foreign-travel-advice.atom";

/// Contents of a file under `tests/fixtures`
pub fn fixture(relative: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(relative);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("missing fixture {}: {e}", path.display()))
}

/// Retry policy with millisecond delays and no jitter
pub fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy::with_delays(max_retries, 5, 20).without_jitter()
}

pub fn fast_fetcher_settings(max_retries: u32) -> FetcherSettings {
    FetcherSettings {
        timeout: Duration::from_secs(5),
        global_requests_per_second: 100,
        retry: fast_retry(max_retries),
        ..FetcherSettings::default()
    }
}

/// Fetcher over a fresh in-memory cache
pub fn memory_fetcher(max_retries: u32) -> HttpFetcher {
    HttpFetcher::new(
        fast_fetcher_settings(max_retries),
        Arc::new(MemoryCache::new(300)),
        ShutdownSignal::never(),
    )
    .expect("fetcher should build")
}

pub fn source(id: &str, url: String, kind: SourceKind, format: PayloadFormat) -> SourceConfig {
    SourceConfig {
        id: id.to_string(),
        name: id.to_string(),
        url,
        kind,
        format,
        base_url: None,
        rate_limit: None,
        enabled: true,
    }
}

/// Configuration pointing the three fixture sources at `server`
pub fn test_config(server: &MockServer, dir: &Path) -> Config {
    let mut config = Config::default();
    config.app.output_file = dir.join("alerts.json");
    config.cache.backend = CacheBackend::Memory;
    config.http.global_requests_per_second = 100;
    config.retry = RetrySettings {
        max_retries: 1,
        base_delay_ms: 5,
        max_delay_ms: 20,
        jitter_ratio: 0.0,
    };
    config.sources = vec![
        source(
            "bbc",
            format!("{}{RSS_PATH}", server.uri()),
            SourceKind::News,
            PayloadFormat::Rss,
        ),
        source(
            "met_police",
            format!("{}{HTML_PATH}", server.uri()),
            SourceKind::Police,
            PayloadFormat::Html,
        ),
        source(
            "govuk",
            format!("{}{ATOM_PATH}", server.uri()),
            SourceKind::Government,
            PayloadFormat::Atom,
        ),
    ];
    config
}

/// Serve the RSS, HTML and Atom fixtures
pub async fn mount_fixtures(server: &MockServer) {
    mount(server, RSS_PATH, "rss/bbc.xml", "application/rss+xml; charset=utf-8").await;
    mount(server, HTML_PATH, "html/met_police.html", "text/html; charset=utf-8").await;
    mount(server, ATOM_PATH, "atom/govuk.xml", "application/atom+xml").await;
}

pub async fn mount(server: &MockServer, route: &str, fixture_path: &str, content_type: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(fixture(fixture_path).into_bytes(), content_type),
        )
        .mount(server)
        .await;
}

pub fn snapshot_path(dir: &Path) -> PathBuf {
    dir.join("alerts.json")
}

/// Entry dated 2025-01-`day` 10:00 UTC
pub fn entry(kind: SourceKind, title: &str, description: &str, day: u32) -> Entry {
    Entry::new(
        "test",
        kind,
        title,
        format!("https://example.com/{}", title.len()),
        description,
        Utc.with_ymd_and_hms(2025, 1, day, 10, 0, 0).unwrap(),
    )
}
