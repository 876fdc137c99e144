//! Alert assembly and snapshot persistence

mod common;

use tempfile::TempDir;

use newswatch::alerts::{AlertAssembler, SnapshotStore};
use newswatch::location::LocationResolver;
use newswatch::models::{Alert, AlertType, ClassifiedEntry, SecurityCategory, SourceKind};

fn located(kind: SourceKind, title: &str, day: u32) -> newswatch::models::LocatedEntry {
    LocationResolver::london().resolve(ClassifiedEntry {
        entry: common::entry(kind, title, "", day),
        matched_keywords: vec!["arrest".into()],
        category: SecurityCategory::PoliceActivity,
        relevance_score: 0.6,
    })
}

fn alert_with_time(title: &str, time: &str) -> Alert {
    let mut alert = AlertAssembler::new().format(&located(SourceKind::News, title, 1));
    alert.time = time.to_string();
    alert
}

#[test]
fn test_later_timestamp_sorts_first() {
    let sorted = AlertAssembler::new().sort_by_time(vec![
        alert_with_time("earlier", "2025-01-01T10:00"),
        alert_with_time("later", "2025-01-02T10:00"),
    ]);
    assert_eq!(sorted[0].time, "2025-01-02T10:00");
    assert_eq!(sorted[1].time, "2025-01-01T10:00");
}

#[test]
fn test_identical_title_and_location_collapse() {
    let assembler = AlertAssembler::new();
    let alerts = assembler.assemble(&[
        located(SourceKind::Police, "Arrest in Soho", 3),
        located(SourceKind::News, "Arrest in Soho", 2),
        located(SourceKind::News, "Arrest in Camden", 1),
    ]);

    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[0].title, "Arrest in Soho");
    assert_eq!(alerts[0].alert_type, AlertType::Crime);
    assert_eq!(alerts[1].location.as_deref(), Some("camden"));
}

#[test]
fn test_snapshot_round_trip_and_backup() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(common::snapshot_path(dir.path()));
    let alerts = AlertAssembler::new().assemble(&[
        located(SourceKind::Government, "Evacuation advised near Heathrow", 4),
    ]);

    store.save(&alerts).unwrap();
    assert!(store.backup().unwrap());

    let loaded = store.load().unwrap();
    assert_eq!(loaded, alerts);
    assert_eq!(loaded[0].alert_type, AlertType::Emergency);
    assert_eq!(loaded[0].location.as_deref(), Some("heathrow"));
    assert_eq!(SnapshotStore::new(store.backup_path()).load().unwrap(), alerts);
}
