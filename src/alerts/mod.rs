//! Alert assembly: format, deduplicate, sort

pub mod snapshot;

pub use snapshot::SnapshotStore;

use chrono::SecondsFormat;
use std::collections::HashSet;
use tracing::{debug, error, info};

use crate::models::{Alert, LocatedEntry};
use crate::parser::date::parse_datetime;

const UNTITLED: &str = "No title";

/// Turns located entries into the alert list clients read
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertAssembler;

impl AlertAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Map one located entry to an alert
    pub fn format(&self, located: &LocatedEntry) -> Alert {
        let entry = located.entry();
        let coordinates = located.coordinates();
        let title = if entry.title.trim().is_empty() {
            UNTITLED.to_string()
        } else {
            entry.title.clone()
        };

        Alert {
            alert_type: entry.source_kind.alert_type(),
            location: located.location().map(str::to_string),
            time: entry.published.to_rfc3339_opts(SecondsFormat::Secs, true),
            lat: coordinates.map(|c| c.lat),
            lon: coordinates.map(|c| c.lon),
            title,
            link: entry.link.clone(),
            source: entry.source.clone(),
            description: entry.description.clone(),
            matched_keywords: located.classified.matched_keywords.clone(),
        }
    }

    pub fn format_alerts(&self, entries: &[LocatedEntry]) -> Vec<Alert> {
        let alerts: Vec<Alert> = entries.iter().map(|e| self.format(e)).collect();
        info!(entries = entries.len(), alerts = alerts.len(), "Formatted alerts");
        alerts
    }

    /// Keep the first alert for each `title_location` key, preserving order
    pub fn deduplicate(&self, alerts: Vec<Alert>) -> Vec<Alert> {
        let total = alerts.len();
        let mut seen = HashSet::new();
        let unique: Vec<Alert> = alerts
            .into_iter()
            .filter(|alert| {
                let fresh = seen.insert(alert.dedupe_key());
                if !fresh {
                    debug!(title = %alert.title, "Dropping duplicate alert");
                }
                fresh
            })
            .collect();
        info!(total, unique = unique.len(), "Deduplicated alerts");
        unique
    }

    /// Newest first by the `time` string.
    ///
    /// Every time must parse as a timestamp; otherwise the input is returned
    /// unchanged.
    pub fn sort_by_time(&self, mut alerts: Vec<Alert>) -> Vec<Alert> {
        if let Some(bad) = alerts.iter().find(|a| parse_datetime(&a.time).is_err()) {
            error!(time = %bad.time, title = %bad.title, "Cannot sort alerts: unparsable time");
            return alerts;
        }
        alerts.sort_by(|a, b| b.time.cmp(&a.time));
        debug!(alerts = alerts.len(), "Sorted alerts by time");
        alerts
    }

    /// Format, deduplicate and sort
    pub fn assemble(&self, entries: &[LocatedEntry]) -> Vec<Alert> {
        let alerts = self.format_alerts(entries);
        let alerts = self.deduplicate(alerts);
        self.sort_by_time(alerts)
    }
}
