//! Weighted multi-category classifier
//!
//! Relevance is built from four parts and capped at 1.0:
//!
//! - `min(0.2 * matched, 0.6)` where `matched` counts distinct keyword and
//!   pattern matches
//! - `0.1` for each context bucket (locale, urgency, severity) present
//! - `0.2` when any category pattern matched
//! - `0.1` when the text is longer than 100 characters
//!
//! The category is the family with the most raw hits; ties go to the
//! earlier family in [`SecurityCategory::SCORED`].

use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

use super::keyword::KeywordSet;
use super::patterns::{builtin_families, families_with_custom, PatternFamily, CONTEXT_BUCKETS};
use super::ContentClassifier;
use crate::config::ClassifierSettings;
use crate::error::{Error, Result};
use crate::metrics;
use crate::models::{ClassifiedEntry, Entry, SecurityCategory};

const KEYWORD_WEIGHT: f64 = 0.2;
const KEYWORD_CAP: f64 = 0.6;
const CONTEXT_WEIGHT: f64 = 0.1;
const CATEGORY_BONUS: f64 = 0.2;
const LENGTH_BONUS: f64 = 0.1;
const LENGTH_THRESHOLD: usize = 100;

pub const DEFAULT_MIN_RELEVANCE: f64 = 0.3;

/// Result of scoring one text
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub matched_keywords: Vec<String>,
    pub category: SecurityCategory,
    pub relevance_score: f64,
}

#[derive(Debug, Clone)]
pub struct AdvancedClassifier {
    keywords: KeywordSet,
    families: Vec<PatternFamily>,
    min_relevance: f64,
}

impl Default for AdvancedClassifier {
    fn default() -> Self {
        Self {
            keywords: KeywordSet::default(),
            families: builtin_families(),
            min_relevance: DEFAULT_MIN_RELEVANCE,
        }
    }
}

impl AdvancedClassifier {
    pub fn new<S: AsRef<str>>(keywords: &[S], min_relevance: f64) -> Self {
        Self {
            keywords: KeywordSet::new(keywords),
            families: builtin_families(),
            min_relevance: min_relevance.clamp(0.0, 1.0),
        }
    }

    /// Add configured patterns to the built-in families
    pub fn with_custom_patterns(mut self, custom: &BTreeMap<String, Vec<String>>) -> Result<Self> {
        if !custom.is_empty() {
            self.families = families_with_custom(custom).map_err(Error::config)?;
        }
        Ok(self)
    }

    pub fn from_settings(settings: &ClassifierSettings) -> Result<Self> {
        Self::new(&settings.keywords, settings.min_relevance)
            .with_custom_patterns(&settings.custom_patterns)
    }

    pub fn min_relevance(&self) -> f64 {
        self.min_relevance
    }

    /// Category with the most pattern hits
    pub fn security_category(&self, text: &str) -> SecurityCategory {
        let mut best = (SecurityCategory::Unknown, 0usize);
        for family in &self.families {
            let hits = family.hits(text);
            // Strictly greater keeps the earlier family on ties.
            if hits > best.1 {
                best = (family.category, hits);
            }
        }
        best.0
    }

    pub fn relevance_score(&self, text: &str) -> f64 {
        self.assess(text).relevance_score
    }

    pub fn assess(&self, text: &str) -> Assessment {
        if text.trim().is_empty() {
            return Assessment {
                matched_keywords: Vec::new(),
                category: SecurityCategory::Unknown,
                relevance_score: 0.0,
            };
        }

        let matched_keywords = self.collect_matches(text);
        let category = self.security_category(text);

        let mut score = (KEYWORD_WEIGHT * matched_keywords.len() as f64).min(KEYWORD_CAP);

        let lowered = text.to_lowercase();
        for (_, terms) in CONTEXT_BUCKETS {
            if terms.iter().any(|t| lowered.contains(t)) {
                score += CONTEXT_WEIGHT;
            }
        }

        if category != SecurityCategory::Unknown {
            score += CATEGORY_BONUS;
        }

        if text.chars().count() > LENGTH_THRESHOLD {
            score += LENGTH_BONUS;
        }

        Assessment {
            matched_keywords,
            category,
            relevance_score: score.clamp(0.0, 1.0),
        }
    }

    /// Keyword matches followed by first pattern hits, deduplicated
    fn collect_matches(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.keywords
            .matches(text)
            .into_iter()
            .chain(self.families.iter().flat_map(|f| f.first_matches(text)))
            .filter(|m| seen.insert(m.clone()))
            .collect()
    }
}

impl ContentClassifier for AdvancedClassifier {
    fn name(&self) -> &'static str {
        "advanced"
    }

    fn contains_security_keywords(&self, text: &str) -> bool {
        !text.is_empty()
            && (self.keywords.is_match(text) || self.families.iter().any(|f| f.is_match(text)))
    }

    fn matched_keywords(&self, text: &str) -> Vec<String> {
        self.collect_matches(text)
    }

    fn filter_entries(&self, entries: Vec<Entry>, min_relevance: Option<f64>) -> Vec<ClassifiedEntry> {
        let threshold = min_relevance.unwrap_or(self.min_relevance);
        let total = entries.len();

        let mut filtered: Vec<ClassifiedEntry> = entries
            .into_iter()
            .filter_map(|entry| {
                let text = entry.classification_text();
                if !self.contains_security_keywords(&text) {
                    return None;
                }
                let assessment = self.assess(&text);
                if assessment.relevance_score < threshold {
                    return None;
                }
                debug!(
                    title = %entry.title,
                    category = %assessment.category,
                    score = assessment.relevance_score,
                    "Matched entry"
                );
                metrics::record_classified(assessment.category.as_str());
                Some(ClassifiedEntry {
                    entry,
                    matched_keywords: assessment.matched_keywords,
                    category: assessment.category,
                    relevance_score: assessment.relevance_score,
                })
            })
            .collect();

        // Stable: equal scores keep input order.
        filtered.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));

        info!(
            classifier = self.name(),
            total,
            kept = filtered.len(),
            min_relevance = threshold,
            "Filtered entries for security relevance"
        );
        filtered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceKind;
    use chrono::Utc;
    use proptest::prelude::*;

    fn entry(title: &str, description: &str) -> Entry {
        Entry::new("bbc", SourceKind::News, title, "https://example.com", description, Utc::now())
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_empty_text_scores_zero() {
        let classifier = AdvancedClassifier::default();
        let a = classifier.assess("");
        assert_eq!(a.relevance_score, 0.0);
        assert_eq!(a.category, SecurityCategory::Unknown);
        assert!(!classifier.contains_security_keywords(""));
    }

    #[test]
    fn test_score_components() {
        let classifier = AdvancedClassifier::default();
        // keywords: stabbing; pattern hit "stabbing" (deduplicated)
        // 0.2 + london 0.1 + category 0.2
        let a = classifier.assess("Stabbing in south London");
        assert_eq!(a.matched_keywords, vec!["stabbing"]);
        assert_eq!(a.category, SecurityCategory::ViolentCrime);
        assert!(approx(a.relevance_score, 0.5), "{}", a.relevance_score);
    }

    #[test]
    fn test_keyword_part_is_capped() {
        let classifier = AdvancedClassifier::default();
        let a = classifier.assess("riot protest arrest murder");
        assert_eq!(a.matched_keywords.len(), 4);
        // 0.6 cap + category 0.2
        assert!(approx(a.relevance_score, 0.8), "{}", a.relevance_score);
    }

    #[test]
    fn test_score_clipped_to_one() {
        let classifier = AdvancedClassifier::default();
        let text = "Breaking: serious stabbing and shooting in central London, police appeal \
                    for witness after major incident and evacuation of the area near the station";
        let a = classifier.assess(text);
        assert!(approx(a.relevance_score, 1.0));
    }

    #[test]
    fn test_category_by_hit_count() {
        let classifier = AdvancedClassifier::default();
        assert_eq!(
            classifier.security_category("protest and riot, one arrest"),
            SecurityCategory::PublicDisorder
        );
        assert_eq!(
            classifier.security_category("weather forecast"),
            SecurityCategory::Unknown
        );
    }

    #[test]
    fn test_category_tie_goes_to_earlier_family() {
        let classifier = AdvancedClassifier::default();
        // "alert" scores once for terrorism and once for emergency
        assert_eq!(classifier.security_category("alert"), SecurityCategory::Terrorism);
        assert_eq!(
            classifier.security_category("murder arrest"),
            SecurityCategory::ViolentCrime
        );
    }

    #[test]
    fn test_pattern_match_counts_toward_keywords() {
        let classifier = AdvancedClassifier::new(&["police"], 0.3);
        let matched = classifier.matched_keywords("Police Operation in Soho");
        assert_eq!(matched, vec!["police", "police operation"]);
        assert!(classifier.contains_security_keywords("a witness came forward"));
    }

    #[test]
    fn test_filter_threshold_and_order() {
        let classifier = AdvancedClassifier::default();
        let entries = vec![
            entry("Weather forecast for London", "Rain later"),
            entry("Arrest made", ""),
            entry(
                "Breaking: serious stabbing in south London",
                "Police appeal for witness after the attack",
            ),
        ];

        let kept = classifier.filter_entries(entries, None);
        assert_eq!(kept.len(), 2);
        assert!(kept[0].entry.title.starts_with("Breaking"));
        assert!(kept[0].relevance_score >= kept[1].relevance_score);
        assert_eq!(kept[1].category, SecurityCategory::PoliceActivity);

        let strict = AdvancedClassifier::default().filter_entries(
            vec![entry("Arrest made", "")],
            Some(0.9),
        );
        assert!(strict.is_empty());
    }

    #[test]
    fn test_equal_scores_keep_input_order() {
        let classifier = AdvancedClassifier::default();
        let kept = classifier.filter_entries(
            vec![entry("Riot one", ""), entry("Riot two", "")],
            Some(0.0),
        );
        assert_eq!(kept[0].entry.title, "Riot one");
        assert_eq!(kept[1].entry.title, "Riot two");
    }

    #[test]
    fn test_from_settings_uses_custom_patterns() {
        let mut settings = ClassifierSettings::default();
        settings
            .custom_patterns
            .insert("terrorism".into(), vec![r"\bsuspicious\s+package\b".into()]);
        let classifier = AdvancedClassifier::from_settings(&settings).unwrap();
        assert_eq!(
            classifier.security_category("Suspicious package found"),
            SecurityCategory::Terrorism
        );

        settings.custom_patterns.insert("weather".into(), vec!["rain".into()]);
        assert!(AdvancedClassifier::from_settings(&settings).is_err());
    }

    proptest! {
        #[test]
        fn prop_score_in_unit_interval(text in "\\PC{0,300}") {
            let classifier = AdvancedClassifier::default();
            let score = classifier.relevance_score(&text);
            prop_assert!((0.0..=1.0).contains(&score));
        }

        #[test]
        fn prop_assessment_is_idempotent(
            words in proptest::collection::vec(
                prop_oneof![
                    Just("riot"), Just("london"), Just("arrest"), Just("alert"),
                    Just("breaking"), Just("calm"), Just("market"), Just("severe"),
                ],
                0..30,
            )
        ) {
            let classifier = AdvancedClassifier::default();
            let text = words.join(" ");
            prop_assert_eq!(classifier.assess(&text), classifier.assess(&text));
        }
    }
}
