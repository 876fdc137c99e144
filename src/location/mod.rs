//! Location resolution for classified entries
//!
//! A location name is extracted with an ordered chain of strategies; the
//! first one that produces a name wins:
//!
//! 1. [`MatchStrategy::Gazetteer`]: a gazetteer name appears as a whole word
//!    in title, description or content (earliest in the text, longest at the
//!    same position)
//! 2. [`MatchStrategy::Structural`]: phrases such as "X station", "X road",
//!    "X borough" or "in/at/near X", looked up after folding spelling variants
//! 3. [`MatchStrategy::SourceHeuristic`]: police items naming a borough by a
//!    short form in the title; news items about the region mapped from a
//!    directional keyword to a fixed area
//!
//! The name is then mapped to coordinates. A name without coordinates
//! leaves the entry unlocated; there is never a default position.

pub mod gazetteer;

pub use gazetteer::{normalize_place, Gazetteer, GazetteerEntry, PlaceKind};

use regex::{Regex, RegexBuilder};
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::config::{DirectionalArea, LocationSettings};
use crate::models::{ClassifiedEntry, Coordinates, Entry, LocatedEntry, SourceKind};
use crate::utils::error::LocationError;

/// Which strategy produced a location name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    Gazetteer,
    Structural,
    SourceHeuristic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationMatch {
    pub name: String,
    pub strategy: MatchStrategy,
}

impl LocationMatch {
    fn new(name: impl Into<String>, strategy: MatchStrategy) -> Self {
        Self {
            name: name.into(),
            strategy,
        }
    }
}

const PLACE_WORD: &str = r"[\w'’&.\-]+";

/// "X borough", "X station", "X road", ...; up to four words before the suffix
static SUFFIX_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"(?i)\b({w}(?:\s+{w}){{0,3}})\s+(borough|council|area|district|station|street|road|lane)\b",
        w = PLACE_WORD
    );
    Regex::new(&pattern).expect("valid suffix regex")
});

/// "in X", "at X", "near X"; up to four words after the preposition
static PREPOSITION_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        r"(?i)\b(?:in|at|near)\s+({w}(?:\s+{w}){{0,3}})",
        w = PLACE_WORD
    );
    Regex::new(&pattern).expect("valid preposition regex")
});

/// Suffixes that are part of some place names ("liverpool street")
const NAME_BEARING_SUFFIXES: &[&str] = &["station", "street", "road", "lane"];

fn whole_word_alternation<'a>(terms: impl Iterator<Item = &'a str>) -> Option<Regex> {
    let mut terms: Vec<&str> = terms.filter(|t| !t.trim().is_empty()).collect();
    if terms.is_empty() {
        return None;
    }
    // Longest first so that at one position "oxford circus" beats "oxford".
    terms.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    terms.dedup();
    let alternation = terms
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&format!(r"\b(?:{alternation})\b"))
        .case_insensitive(true)
        .size_limit(1 << 24)
        .build()
        .ok()
}

/// Extracts a location name from entry text and maps it to coordinates
#[derive(Debug, Clone)]
pub struct LocationResolver {
    gazetteer: Gazetteer,
    name_matcher: Option<Regex>,
    borough_aliases: Vec<(String, String)>,
    alias_matcher: Option<Regex>,
    region_matcher: Option<Regex>,
    directions: Vec<(Regex, String)>,
}

impl LocationResolver {
    pub fn new(gazetteer: Gazetteer, settings: &LocationSettings) -> Self {
        let name_matcher = whole_word_alternation(gazetteer.entries().map(|e| e.name.as_str()));
        let borough_aliases = gazetteer.borough_aliases();
        let alias_matcher = whole_word_alternation(borough_aliases.iter().map(|(a, _)| a.as_str()));
        let region_matcher =
            whole_word_alternation(settings.region_terms.iter().map(String::as_str));
        let directions = settings
            .directional_areas
            .iter()
            .filter_map(|DirectionalArea { keywords, area }| {
                whole_word_alternation(keywords.iter().map(String::as_str))
                    .map(|re| (re, area.to_lowercase()))
            })
            .collect();

        Self {
            gazetteer,
            name_matcher,
            borough_aliases,
            alias_matcher,
            region_matcher,
            directions,
        }
    }

    /// Resolver over the built-in London gazetteer
    pub fn london() -> Self {
        Self::new(Gazetteer::london(), &LocationSettings::default())
    }

    /// Build from settings, loading the gazetteer file if one is configured
    pub fn from_settings(settings: &LocationSettings) -> Result<Self, LocationError> {
        let gazetteer = match &settings.gazetteer_path {
            Some(path) => Gazetteer::from_file(path)?,
            None => Gazetteer::london(),
        };
        info!(places = gazetteer.len(), "Gazetteer loaded");
        Ok(Self::new(gazetteer, settings))
    }

    pub fn gazetteer(&self) -> &Gazetteer {
        &self.gazetteer
    }

    /// Gazetteer coordinates for `name`
    pub fn get_coordinates(&self, name: &str) -> Result<Coordinates, LocationError> {
        self.gazetteer
            .lookup(name)
            .map(|e| e.coordinates)
            .ok_or_else(|| LocationError::NotFound(name.to_string()))
    }

    /// Run the strategy chain over one entry
    pub fn extract_location(&self, entry: &Entry) -> Option<LocationMatch> {
        let text = format!("{} {} {}", entry.title, entry.description, entry.content);

        self.match_gazetteer(&text)
            .map(|name| LocationMatch::new(name, MatchStrategy::Gazetteer))
            .or_else(|| {
                self.match_structural(&text)
                    .map(|name| LocationMatch::new(name, MatchStrategy::Structural))
            })
            .or_else(|| {
                self.match_source_heuristic(entry)
                    .map(|name| LocationMatch::new(name, MatchStrategy::SourceHeuristic))
            })
    }

    fn match_gazetteer(&self, text: &str) -> Option<String> {
        let found = self.name_matcher.as_ref()?.find(text)?;
        self.gazetteer
            .lookup(found.as_str())
            .map(|e| e.name.clone())
    }

    fn match_structural(&self, text: &str) -> Option<String> {
        let mut best: Option<(usize, String)> = None;
        let mut consider = |start: usize, name: String| {
            if best.as_ref().map_or(true, |(s, _)| start < *s) {
                best = Some((start, name));
            }
        };

        for caps in SUFFIX_PHRASE.captures_iter(text) {
            let (Some(words), Some(suffix)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            if let Some(name) = self.lookup_suffix_phrase(words.as_str(), suffix.as_str()) {
                consider(words.start(), name);
                break;
            }
        }

        for caps in PREPOSITION_PHRASE.captures_iter(text) {
            let Some(words) = caps.get(1) else {
                continue;
            };
            if let Some(name) = self.lookup_prefixes(words.as_str()) {
                consider(words.start(), name);
                break;
            }
        }

        best.map(|(_, name)| name)
    }

    /// Try the trailing 4..1 words before the suffix, with and without it
    fn lookup_suffix_phrase(&self, words: &str, suffix: &str) -> Option<String> {
        let words: Vec<&str> = words.split_whitespace().collect();
        let suffix = suffix.to_lowercase();
        let keep_suffix = NAME_BEARING_SUFFIXES.contains(&suffix.as_str());

        for len in (1..=words.len()).rev() {
            let candidate = words[words.len() - len..].join(" ");
            if keep_suffix {
                if let Some(entry) = self.gazetteer.lookup_normalized(&format!("{candidate} {suffix}")) {
                    return Some(entry.name.clone());
                }
            }
            if let Some(entry) = self.gazetteer.lookup_normalized(&candidate) {
                return Some(entry.name.clone());
            }
        }
        None
    }

    /// Try the leading 4..1 words after a preposition
    fn lookup_prefixes(&self, words: &str) -> Option<String> {
        let words: Vec<&str> = words.split_whitespace().collect();
        (1..=words.len())
            .rev()
            .find_map(|len| self.gazetteer.lookup_normalized(&words[..len].join(" ")))
            .map(|e| e.name.clone())
    }

    fn match_source_heuristic(&self, entry: &Entry) -> Option<String> {
        match entry.source_kind {
            SourceKind::Police => {
                let found = self.alias_matcher.as_ref()?.find(&entry.title)?;
                let alias = found.as_str().to_lowercase();
                self.borough_aliases
                    .iter()
                    .find(|(a, _)| *a == alias)
                    .map(|(_, borough)| borough.clone())
            }
            SourceKind::News | SourceKind::Other => {
                self.region_matcher.as_ref()?.find(&entry.title)?;
                let text = format!("{} {}", entry.title, entry.description);
                self.directions
                    .iter()
                    .find(|(re, _)| re.is_match(&text))
                    .map(|(_, area)| area.clone())
            }
            SourceKind::Government => None,
        }
    }

    /// Attach a place to one entry
    pub fn resolve(&self, classified: ClassifiedEntry) -> LocatedEntry {
        let Some(found) = self.extract_location(&classified.entry) else {
            debug!(title = %classified.entry.title, "No location found");
            return LocatedEntry::unlocated(classified);
        };

        match self.get_coordinates(&found.name) {
            Ok(coordinates) => {
                debug!(
                    title = %classified.entry.title,
                    location = %found.name,
                    strategy = ?found.strategy,
                    "Location resolved"
                );
                LocatedEntry::located(classified, found.name, coordinates)
            }
            Err(e) => {
                debug!(title = %classified.entry.title, error = %e, "Location has no coordinates");
                LocatedEntry::unlocated(classified)
            }
        }
    }

    /// Attach places to a batch, preserving order
    pub fn process_entries(&self, entries: Vec<ClassifiedEntry>) -> Vec<LocatedEntry> {
        let total = entries.len();
        let located: Vec<LocatedEntry> = entries.into_iter().map(|e| self.resolve(e)).collect();
        let with_place = located.iter().filter(|e| e.place.is_some()).count();
        info!(total, located = with_place, "Processed entries with location data");
        located
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SecurityCategory;
    use chrono::Utc;

    fn entry(kind: SourceKind, title: &str, description: &str) -> Entry {
        Entry::new("test", kind, title, "https://example.com", description, Utc::now())
    }

    fn classified(kind: SourceKind, title: &str) -> ClassifiedEntry {
        ClassifiedEntry {
            entry: entry(kind, title, ""),
            matched_keywords: vec![],
            category: SecurityCategory::Unknown,
            relevance_score: 0.5,
        }
    }

    #[test]
    fn test_longest_name_wins_at_same_position() {
        let resolver = LocationResolver::london();
        let found = resolver
            .extract_location(&entry(SourceKind::Police, "Police arrest suspect in Oxford Circus stabbing", ""))
            .unwrap();
        assert_eq!(found.name, "oxford circus");
        assert_eq!(found.strategy, MatchStrategy::Gazetteer);
    }

    #[test]
    fn test_earliest_mention_wins() {
        let resolver = LocationResolver::london();
        let found = resolver
            .extract_location(&entry(SourceKind::News, "Brixton man charged over Soho attack", ""))
            .unwrap();
        assert_eq!(found.name, "brixton");
    }

    #[test]
    fn test_structural_folds_spelling_variants() {
        let resolver = LocationResolver::london();
        let found = resolver
            .extract_location(&entry(SourceKind::News, "Evacuation at Kings Cross station", ""))
            .unwrap();
        assert_eq!(found.name, "king's cross");
        assert_eq!(found.strategy, MatchStrategy::Structural);
    }

    #[test]
    fn test_preposition_phrase_uses_leading_words() {
        let resolver = LocationResolver::london();
        let found = resolver
            .extract_location(&entry(SourceKind::News, "Disorder near Barking & Dagenham town hall", ""))
            .unwrap();
        assert_eq!(found.name, "barking and dagenham");
        assert_eq!(found.strategy, MatchStrategy::Structural);
    }

    #[test]
    fn test_police_title_borough_alias() {
        let resolver = LocationResolver::london();
        let found = resolver
            .extract_location(&entry(SourceKind::Police, "Two arrested after Dagenham robbery", ""))
            .unwrap();
        assert_eq!(found.name, "barking and dagenham");
        assert_eq!(found.strategy, MatchStrategy::SourceHeuristic);
    }

    #[test]
    fn test_news_directional_mapping_requires_region_term() {
        let resolver = LocationResolver::london();
        let found = resolver
            .extract_location(&entry(SourceKind::News, "Stabbing in south London", ""))
            .unwrap();
        assert_eq!(found.name, "southwark");

        assert!(resolver
            .extract_location(&entry(SourceKind::News, "Storm heads north overnight", ""))
            .is_none());
    }

    #[test]
    fn test_government_items_get_no_heuristic() {
        let resolver = LocationResolver::london();
        assert!(resolver
            .extract_location(&entry(SourceKind::Government, "Travel advice for east London", ""))
            .is_none());
    }

    #[test]
    fn test_no_location_means_no_coordinates() {
        let resolver = LocationResolver::london();
        let located = resolver.resolve(classified(SourceKind::News, "Weather forecast for the weekend"));
        assert!(located.location().is_none());
        assert!(located.coordinates().is_none());
    }

    #[test]
    fn test_get_coordinates_unknown_name() {
        let resolver = LocationResolver::london();
        assert_eq!(
            resolver.get_coordinates("atlantis"),
            Err(LocationError::NotFound("atlantis".into()))
        );
        assert_eq!(
            resolver.get_coordinates("London Bridge").unwrap(),
            Coordinates::new(51.5055, -0.0864)
        );
    }

    #[test]
    fn test_directional_area_missing_from_gazetteer_stays_unlocated() {
        let gazetteer = Gazetteer::from_entries([("camden", Coordinates::new(51.5455, -0.1627), PlaceKind::Borough)]);
        let resolver = LocationResolver::new(gazetteer, &LocationSettings::default());

        let found = resolver
            .extract_location(&entry(SourceKind::News, "Riot in south London", ""))
            .unwrap();
        assert_eq!(found.name, "southwark");

        let located = resolver.resolve(classified(SourceKind::News, "Riot in south London"));
        assert!(located.place.is_none());
    }
}
