//! Built-in deployment: London feeds, keyword list, directional areas

use super::{DirectionalArea, RateLimitSettings, SourceConfig};
use crate::models::{PayloadFormat, SourceKind};

pub const DEFAULT_USER_AGENT: &str = "NewsWatch/0.1 (London Intelligence Map)";

/// Security keywords matched as whole words, case-insensitively
pub const DEFAULT_SECURITY_KEYWORDS: &[&str] = &[
    "stabbing", "knife", "attack", "assault", "murder", "homicide",
    "protest", "demonstration", "riot", "unrest", "disorder",
    "terror", "terrorism", "bomb", "explosion", "fire",
    "shooting", "gun", "firearm", "weapon",
    "emergency", "evacuation", "lockdown", "alert",
    "crime", "criminal", "arrest", "police", "officer",
    "incident", "accident", "collision", "crash",
];

pub fn default_sources() -> Vec<SourceConfig> {
    vec![
        SourceConfig {
            id: "bbc".into(),
            name: "BBC News".into(),
            url: "https://feeds.bbci.co.uk/news/rss.xml".into(),
            kind: SourceKind::News,
            format: PayloadFormat::Rss,
            base_url: None,
            rate_limit: Some(RateLimitSettings::per_minute(5)),
            enabled: true,
        },
        SourceConfig {
            id: "met_police".into(),
            name: "Metropolitan Police".into(),
            url: "https://news.met.police.uk/news".into(),
            kind: SourceKind::Police,
            format: PayloadFormat::Html,
            base_url: Some("https://news.met.police.uk".into()),
            rate_limit: Some(RateLimitSettings::per_minute(10)),
            enabled: true,
        },
        SourceConfig {
            id: "govuk".into(),
            name: "GOV.UK Travel Advice".into(),
            url: "https://www.gov.uk/foreign-travel-advice.atom".into(),
            kind: SourceKind::Government,
            format: PayloadFormat::Atom,
            base_url: None,
            rate_limit: Some(RateLimitSettings::per_minute(8)),
            enabled: true,
        },
        SourceConfig {
            id: "evening_standard".into(),
            name: "Evening Standard".into(),
            url: "https://www.standard.co.uk/rss".into(),
            kind: SourceKind::News,
            format: PayloadFormat::Rss,
            base_url: None,
            rate_limit: None,
            enabled: true,
        },
    ]
}

pub(super) fn region_terms() -> Vec<String> {
    ["london", "south london", "east london", "north london", "west london"]
        .iter()
        .map(|t| t.to_string())
        .collect()
}

pub(super) fn directional_areas() -> Vec<DirectionalArea> {
    let area = |keywords: &[&str], area: &str| DirectionalArea {
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        area: area.to_string(),
    };
    vec![
        area(&["south", "south-east", "south east"], "southwark"),
        area(&["east", "east london"], "newham"),
        area(&["north", "north london"], "camden"),
        area(&["west", "west london"], "chelsea"),
        area(&["central", "central london"], "soho"),
    ]
}
