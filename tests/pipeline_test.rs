//! End-to-end cycle tests: mock feeds in, alert snapshot out

mod common;

use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use newswatch::config::ClassifierMode;
use newswatch::models::AlertType;
use newswatch::pipeline::Orchestrator;

#[tokio::test]
async fn test_full_cycle_from_fixtures() {
    let server = MockServer::start().await;
    common::mount_fixtures(&server).await;
    let dir = TempDir::new().unwrap();

    let orchestrator = Orchestrator::from_config(common::test_config(&server, dir.path())).unwrap();
    assert!(orchestrator.run_single_cycle().await);

    let alerts = orchestrator.snapshot().load().unwrap();
    let titles: Vec<&str> = alerts.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "France travel advice",
            "Man arrested after assault in Hackney",
            "Protest outside Parliament Square ends in arrests",
            "Teenager injured in Croydon stabbing",
            "Two arrested after Dagenham robbery",
        ]
    );

    let france = &alerts[0];
    assert_eq!(france.alert_type, AlertType::Emergency);
    assert_eq!(france.source, "govuk");
    assert!(france.location.is_none() && france.lat.is_none());
    assert_eq!(france.time, "2025-01-08T10:00:00Z");

    let hackney = &alerts[1];
    assert_eq!(hackney.alert_type, AlertType::Crime);
    assert_eq!(hackney.location.as_deref(), Some("hackney"));
    assert_eq!(hackney.lat, Some(51.5450));
    assert_eq!(
        hackney.link,
        format!(
            "{}/news/metropolitan-police/news/2025/january/arrest-hackney-assault",
            server.uri()
        )
    );
    assert!(hackney.matched_keywords.contains(&"assault".to_string()));

    let protest = &alerts[2];
    assert_eq!(protest.alert_type, AlertType::News);
    assert_eq!(protest.location.as_deref(), Some("parliament square"));
    assert_eq!(
        protest.description,
        "Officers made twelve arrests as demonstrators blocked the road."
    );

    let dagenham = &alerts[4];
    assert_eq!(dagenham.location.as_deref(), Some("barking and dagenham"));
    assert_eq!(dagenham.time, "2025-01-06T00:00:00Z");
}

#[tokio::test]
async fn test_snapshot_uses_external_field_names() {
    let server = MockServer::start().await;
    common::mount_fixtures(&server).await;
    let dir = TempDir::new().unwrap();

    let orchestrator = Orchestrator::from_config(common::test_config(&server, dir.path())).unwrap();
    assert!(orchestrator.run_single_cycle().await);

    let raw = std::fs::read_to_string(common::snapshot_path(dir.path())).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let first = &json.as_array().unwrap()[0];
    for field in [
        "type",
        "location",
        "time",
        "lat",
        "lon",
        "title",
        "link",
        "source",
        "description",
        "matched_keywords",
    ] {
        assert!(first.get(field).is_some(), "missing field {field}");
    }
    assert_eq!(first["type"], "emergency");
}

#[tokio::test]
async fn test_failing_source_does_not_fail_cycle() {
    let server = MockServer::start().await;
    common::mount(&server, common::RSS_PATH, "rss/bbc.xml", "application/rss+xml").await;
    Mock::given(method("GET"))
        .and(path(common::HTML_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(common::ATOM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not a feed</html>"))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();

    let orchestrator = Orchestrator::from_config(common::test_config(&server, dir.path())).unwrap();
    assert!(orchestrator.run_single_cycle().await);

    let alerts = orchestrator.snapshot().load().unwrap();
    assert_eq!(alerts.len(), 2);
    assert!(alerts.iter().all(|a| a.source == "bbc"));
}

#[tokio::test]
async fn test_basic_filter_keeps_keyword_matches_only() {
    let server = MockServer::start().await;
    common::mount_fixtures(&server).await;
    let dir = TempDir::new().unwrap();

    let mut config = common::test_config(&server, dir.path());
    config.classifier.mode = ClassifierMode::Basic;
    let orchestrator = Orchestrator::from_config(config).unwrap();
    assert!(orchestrator.run_single_cycle().await);

    let alerts = orchestrator.snapshot().load().unwrap();
    assert!(alerts.iter().all(|a| !a.matched_keywords.is_empty()));
    assert!(!alerts.iter().any(|a| a.title.starts_with("Heatwave")));
    assert!(!alerts.iter().any(|a| a.title.starts_with("Recruitment")));
}

#[tokio::test]
async fn test_persist_failure_reports_failure() {
    let server = MockServer::start().await;
    common::mount_fixtures(&server).await;
    let dir = TempDir::new().unwrap();

    // The snapshot's parent is a regular file, so every write fails
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();
    let mut config = common::test_config(&server, dir.path());
    config.app.output_file = blocker.join("alerts.json");

    let orchestrator = Orchestrator::from_config(config).unwrap();
    assert!(!orchestrator.run_single_cycle().await);
    assert_eq!(std::fs::read_to_string(&blocker).unwrap(), "not a directory");
}

#[tokio::test]
async fn test_failed_persist_keeps_previous_snapshot() {
    let server = MockServer::start().await;
    common::mount_fixtures(&server).await;
    let dir = TempDir::new().unwrap();

    // The snapshot name fits the filesystem limit but its temp sibling does not
    let output = dir.path().join(format!("{}.json", "a".repeat(245)));
    let previous = r#"[{"type":"crime","title":"Earlier alert"}]"#;
    std::fs::write(&output, previous).unwrap();

    let mut config = common::test_config(&server, dir.path());
    config.app.output_file = output.clone();

    let orchestrator = Orchestrator::from_config(config).unwrap();
    assert!(!orchestrator.run_single_cycle().await);
    assert_eq!(std::fs::read_to_string(&output).unwrap(), previous);

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test]
async fn test_second_cycle_is_served_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(common::RSS_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(
                common::fixture("rss/bbc.xml").into_bytes(),
                "application/rss+xml",
            ),
        )
        .expect(1)
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();

    let mut config = common::test_config(&server, dir.path());
    config.sources.truncate(1);
    let orchestrator = Orchestrator::from_config(config).unwrap();

    assert!(orchestrator.run_single_cycle().await);
    assert!(orchestrator.run_single_cycle().await);

    let stats = orchestrator.get_system_stats();
    assert_eq!(stats.feeds.len(), 1);
    assert_eq!(stats.cache_stats.hits, 1);
    assert_eq!(stats.cycles_completed, 2);
}

#[tokio::test]
async fn test_overlapping_cycle_returns_false() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(common::RSS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(common::fixture("rss/bbc.xml").into_bytes(), "application/rss+xml")
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();

    let mut config = common::test_config(&server, dir.path());
    config.sources.truncate(1);
    let orchestrator = Orchestrator::from_config(config).unwrap();

    let (first, second) = tokio::join!(
        orchestrator.run_single_cycle(),
        orchestrator.run_single_cycle()
    );
    assert!(first);
    assert!(!second);
}

#[tokio::test]
async fn test_concurrent_fetch_keeps_source_order() {
    let server = MockServer::start().await;
    common::mount_fixtures(&server).await;
    let dir = TempDir::new().unwrap();

    let mut config = common::test_config(&server, dir.path());
    config.app.fetch_concurrency = 3;
    let orchestrator = Orchestrator::from_config(config).unwrap();

    let sources: Vec<String> = orchestrator
        .fetch_all_feeds()
        .await
        .into_iter()
        .map(|e| e.source)
        .collect();

    let first_met = sources.iter().position(|s| s == "met_police").unwrap();
    let first_gov = sources.iter().position(|s| s == "govuk").unwrap();
    assert!(sources[..first_met].iter().all(|s| s == "bbc"));
    assert!(first_met < first_gov);
    assert_eq!(sources.len(), 4 + 3 + 2);
}
