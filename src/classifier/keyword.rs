//! Basic keyword classifier

use regex::{Regex, RegexBuilder};
use tracing::{debug, info};

use super::ContentClassifier;
use crate::config::DEFAULT_SECURITY_KEYWORDS;
use crate::models::{ClassifiedEntry, Entry, SecurityCategory};

/// Keyword list compiled to whole-word, case-insensitive matchers
#[derive(Debug, Clone)]
pub struct KeywordSet {
    keywords: Vec<(String, Regex)>,
}

impl KeywordSet {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        let keywords = keywords
            .iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .filter_map(|k| {
                let pattern = format!(r"\b{}\b", regex::escape(&k));
                RegexBuilder::new(&pattern)
                    .case_insensitive(true)
                    .build()
                    .ok()
                    .map(|re| (k, re))
            })
            .collect();
        Self { keywords }
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.keywords.iter().any(|(_, re)| re.is_match(text))
    }

    /// Keywords present in `text`, in list order
    pub fn matches(&self, text: &str) -> Vec<String> {
        self.keywords
            .iter()
            .filter(|(_, re)| re.is_match(text))
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

impl Default for KeywordSet {
    fn default() -> Self {
        Self::new(DEFAULT_SECURITY_KEYWORDS)
    }
}

/// Pass/fail keyword filter.
///
/// Every passing entry gets relevance 1.0 and category `unknown`; input
/// order is kept and `min_relevance` has no effect.
#[derive(Debug, Clone, Default)]
pub struct KeywordClassifier {
    keywords: KeywordSet,
}

impl KeywordClassifier {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        Self {
            keywords: KeywordSet::new(keywords),
        }
    }
}

impl ContentClassifier for KeywordClassifier {
    fn name(&self) -> &'static str {
        "basic"
    }

    fn contains_security_keywords(&self, text: &str) -> bool {
        self.keywords.is_match(text)
    }

    fn matched_keywords(&self, text: &str) -> Vec<String> {
        self.keywords.matches(text)
    }

    fn filter_entries(&self, entries: Vec<Entry>, _min_relevance: Option<f64>) -> Vec<ClassifiedEntry> {
        let total = entries.len();
        let filtered: Vec<ClassifiedEntry> = entries
            .into_iter()
            .filter_map(|entry| {
                let matched = self.keywords.matches(&entry.classification_text());
                if matched.is_empty() {
                    return None;
                }
                debug!(title = %entry.title, keywords = ?matched, "Matched entry");
                Some(ClassifiedEntry {
                    entry,
                    matched_keywords: matched,
                    category: SecurityCategory::Unknown,
                    relevance_score: 1.0,
                })
            })
            .collect();

        info!(
            classifier = self.name(),
            total,
            kept = filtered.len(),
            "Filtered entries for security relevance"
        );
        filtered
    }
}
