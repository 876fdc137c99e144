// Core data structures for the newswatch pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::parser::sanitize::normalize_whitespace;

/// Kind of organisation behind a feed; drives the alert type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Police,
    #[default]
    News,
    Government,
    #[serde(other)]
    Other,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Police => "police",
            Self::News => "news",
            Self::Government => "government",
            Self::Other => "other",
        }
    }

    /// Parse a configured kind; unrecognised kinds map to `Other`
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "police" => Self::Police,
            "news" => Self::News,
            "government" | "gov" => Self::Government,
            _ => Self::Other,
        }
    }

    /// Fixed source-kind to alert-type table
    pub fn alert_type(&self) -> AlertType {
        match self {
            Self::Police => AlertType::Crime,
            Self::News => AlertType::News,
            Self::Government => AlertType::Emergency,
            Self::Other => AlertType::News,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload shape served by a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    Rss,
    Atom,
    Html,
}

impl PayloadFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rss => "rss",
            Self::Atom => "atom",
            Self::Html => "html",
        }
    }
}

impl fmt::Display for PayloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized feed item before classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub title: String,
    pub link: String,
    pub description: String,
    /// Lowercased `"{title} {description}"`
    pub content: String,
    pub published: DateTime<Utc>,
    /// Id of the configured source that produced this entry
    pub source: String,
    pub source_kind: SourceKind,
}

impl Entry {
    pub fn new(
        source: impl Into<String>,
        source_kind: SourceKind,
        title: impl Into<String>,
        link: impl Into<String>,
        description: impl Into<String>,
        published: DateTime<Utc>,
    ) -> Self {
        let title = normalize_whitespace(&title.into());
        let description = normalize_whitespace(&description.into());
        let content = format!("{title} {description}").trim().to_lowercase();
        Self {
            title,
            link: link.into().trim().to_string(),
            description,
            content,
            published,
            source: source.into(),
            source_kind,
        }
    }

    /// Text the classifier scores: title followed by content
    pub fn classification_text(&self) -> String {
        format!("{} {}", self.title, self.content)
    }
}

/// Security category assigned by the advanced classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SecurityCategory {
    ViolentCrime,
    PublicDisorder,
    Terrorism,
    Emergency,
    PoliceActivity,
    #[default]
    Unknown,
}

impl SecurityCategory {
    /// Scored categories in tie-breaking order
    pub const SCORED: [SecurityCategory; 5] = [
        Self::ViolentCrime,
        Self::PublicDisorder,
        Self::Terrorism,
        Self::Emergency,
        Self::PoliceActivity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViolentCrime => "violent_crime",
            Self::PublicDisorder => "public_disorder",
            Self::Terrorism => "terrorism",
            Self::Emergency => "emergency",
            Self::PoliceActivity => "police_activity",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "violent_crime" => Some(Self::ViolentCrime),
            "public_disorder" => Some(Self::PublicDisorder),
            "terrorism" => Some(Self::Terrorism),
            "emergency" => Some(Self::Emergency),
            "police_activity" => Some(Self::PoliceActivity),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for SecurityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry that passed a classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedEntry {
    pub entry: Entry,
    pub matched_keywords: Vec<String>,
    pub category: SecurityCategory,
    /// Always within `[0, 1]`
    pub relevance_score: f64,
}

/// Latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Resolved place: a gazetteer name together with its coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub coordinates: Coordinates,
}

/// Classified entry plus an optional place.
///
/// A name is only kept when coordinates were found for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatedEntry {
    pub classified: ClassifiedEntry,
    pub place: Option<Place>,
}

impl LocatedEntry {
    pub fn unlocated(classified: ClassifiedEntry) -> Self {
        Self {
            classified,
            place: None,
        }
    }

    pub fn located(classified: ClassifiedEntry, name: impl Into<String>, coordinates: Coordinates) -> Self {
        Self {
            classified,
            place: Some(Place {
                name: name.into(),
                coordinates,
            }),
        }
    }

    pub fn entry(&self) -> &Entry {
        &self.classified.entry
    }

    pub fn location(&self) -> Option<&str> {
        self.place.as_ref().map(|p| p.name.as_str())
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.place.as_ref().map(|p| p.coordinates)
    }
}

/// Alert type shown to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Crime,
    News,
    Emergency,
}

/// Externally visible alert record, one element of the persisted snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub location: Option<String>,
    /// ISO-8601 timestamp
    pub time: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub title: String,
    pub link: String,
    pub source: String,
    pub description: String,
    pub matched_keywords: Vec<String>,
}

impl Alert {
    /// Key used to collapse duplicates within one batch
    pub fn dedupe_key(&self) -> String {
        format!("{}_{}", self.title, self.location.as_deref().unwrap_or(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_entry_content_is_lowercase_title_and_description() {
        let entry = Entry::new(
            "bbc",
            SourceKind::News,
            "  Major Fire in  Camden ",
            "https://example.com/a",
            "Crews attended the SCENE",
            ts(),
        );
        assert_eq!(entry.title, "Major Fire in Camden");
        assert_eq!(entry.content, "major fire in camden crews attended the scene");
    }

    #[test]
    fn test_source_kind_parse_defaults_to_other() {
        assert_eq!(SourceKind::parse("Police"), SourceKind::Police);
        assert_eq!(SourceKind::parse("gov"), SourceKind::Government);
        assert_eq!(SourceKind::parse("blog"), SourceKind::Other);
    }

    #[test]
    fn test_alert_type_table() {
        assert_eq!(SourceKind::Police.alert_type(), AlertType::Crime);
        assert_eq!(SourceKind::News.alert_type(), AlertType::News);
        assert_eq!(SourceKind::Government.alert_type(), AlertType::Emergency);
        assert_eq!(SourceKind::Other.alert_type(), AlertType::News);
    }

    #[test]
    fn test_unknown_kind_deserializes_as_other() {
        let kind: SourceKind = serde_json::from_str("\"weather\"").unwrap();
        assert_eq!(kind, SourceKind::Other);
    }

    #[test]
    fn test_alert_serializes_type_field() {
        let alert = Alert {
            alert_type: AlertType::Crime,
            location: None,
            time: "2025-01-01T10:00:00Z".into(),
            lat: None,
            lon: None,
            title: "Stabbing".into(),
            link: String::new(),
            source: "met_police".into(),
            description: String::new(),
            matched_keywords: vec!["stabbing".into()],
        };
        let json = serde_json::to_value(&alert).unwrap();
        assert_eq!(json["type"], "crime");
        assert!(json["location"].is_null());
        assert!(json["lat"].is_null());
        assert_eq!(alert.dedupe_key(), "Stabbing_");
    }

    #[test]
    fn test_located_entry_keeps_name_and_coordinates_together() {
        let classified = ClassifiedEntry {
            entry: Entry::new("bbc", SourceKind::News, "t", "", "", ts()),
            matched_keywords: vec![],
            category: SecurityCategory::Unknown,
            relevance_score: 0.0,
        };
        let unlocated = LocatedEntry::unlocated(classified.clone());
        assert!(unlocated.location().is_none());
        assert!(unlocated.coordinates().is_none());

        let located = LocatedEntry::located(classified, "soho", Coordinates::new(51.5136, -0.1365));
        assert_eq!(located.location(), Some("soho"));
        assert_eq!(located.coordinates().map(|c| c.lat), Some(51.5136));
    }
}
