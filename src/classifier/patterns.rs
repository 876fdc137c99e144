//! Regex families for the advanced classifier

use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::models::SecurityCategory;

const VIOLENT_CRIME: &[&str] = &[
    r"\bstabbing\b",
    r"\bknife\s+attack\b",
    r"\bassault\b",
    r"\bmurder\b",
    r"\bhomicide\b",
    r"\bshooting\b",
    r"\bgun\s+crime\b",
    r"\bweapon\b",
];

const PUBLIC_DISORDER: &[&str] = &[
    r"\bprotest\b",
    r"\bdemonstration\b",
    r"\briot\b",
    r"\bunrest\b",
    r"\bdisorder\b",
    r"\bdisturbance\b",
    r"\bclash\b",
    r"\bconfrontation\b",
];

const TERRORISM: &[&str] = &[
    r"\bterror\b",
    r"\bterrorism\b",
    r"\bbomb\b",
    r"\bexplosion\b",
    r"\bthreat\b",
    r"\balert\b",
    r"\bsecurity\s+alert\b",
];

const EMERGENCY: &[&str] = &[
    r"\bemergency\b",
    r"\bevacuation\b",
    r"\blockdown\b",
    r"\balert\b",
    r"\bincident\b",
    r"\baccident\b",
    r"\bcollision\b",
    r"\bcrash\b",
];

const POLICE_ACTIVITY: &[&str] = &[
    r"\barrest\b",
    r"\bpolice\s+operation\b",
    r"\bofficer\b",
    r"\bdetective\b",
    r"\binvestigation\b",
    r"\bappeal\b",
    r"\bwitness\b",
];

/// Built-in regex sources for a scored category
pub fn builtin_patterns(category: SecurityCategory) -> &'static [&'static str] {
    match category {
        SecurityCategory::ViolentCrime => VIOLENT_CRIME,
        SecurityCategory::PublicDisorder => PUBLIC_DISORDER,
        SecurityCategory::Terrorism => TERRORISM,
        SecurityCategory::Emergency => EMERGENCY,
        SecurityCategory::PoliceActivity => POLICE_ACTIVITY,
        SecurityCategory::Unknown => &[],
    }
}

/// Context buckets; each bucket present adds to the relevance score once
pub const CONTEXT_BUCKETS: &[(&str, &[&str])] = &[
    (
        "london",
        &[
            "london",
            "greater london",
            "central london",
            "south london",
            "east london",
            "north london",
            "west london",
        ],
    ),
    ("urgency", &["urgent", "immediate", "breaking", "latest", "developing"]),
    ("severity", &["serious", "major", "significant", "critical", "severe"]),
];

/// Compiled patterns of one category
#[derive(Debug, Clone)]
pub struct PatternFamily {
    pub category: SecurityCategory,
    patterns: Vec<Regex>,
}

impl PatternFamily {
    fn compile<'a>(
        category: SecurityCategory,
        sources: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, regex::Error> {
        let patterns = sources
            .into_iter()
            .map(|p| RegexBuilder::new(p).case_insensitive(true).build())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { category, patterns })
    }

    /// Total number of non-overlapping hits across the family
    pub fn hits(&self, text: &str) -> usize {
        self.patterns.iter().map(|re| re.find_iter(text).count()).sum()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(text))
    }

    /// First hit of each matching pattern, lowercased
    pub fn first_matches<'t>(&'t self, text: &'t str) -> impl Iterator<Item = String> + 't {
        self.patterns
            .iter()
            .filter_map(move |re| re.find(text))
            .map(|m| m.as_str().to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

static BUILTIN_FAMILIES: LazyLock<Vec<PatternFamily>> = LazyLock::new(|| {
    SecurityCategory::SCORED
        .iter()
        .map(|&category| {
            PatternFamily::compile(category, builtin_patterns(category).iter().copied())
                .expect("built-in security patterns are valid")
        })
        .collect()
});

/// Built-in families in tie-breaking order
pub fn builtin_families() -> Vec<PatternFamily> {
    BUILTIN_FAMILIES.clone()
}

/// Built-in families with extra patterns appended per category name.
///
/// Unknown category names and invalid regexes are errors.
pub fn families_with_custom(
    custom: &BTreeMap<String, Vec<String>>,
) -> Result<Vec<PatternFamily>, String> {
    for name in custom.keys() {
        match SecurityCategory::parse(name) {
            Some(SecurityCategory::Unknown) | None => {
                return Err(format!("unknown security category: {name}"));
            }
            Some(_) => {}
        }
    }

    SecurityCategory::SCORED
        .iter()
        .map(|&category| {
            let extra = custom
                .iter()
                .filter(|(name, _)| SecurityCategory::parse(name) == Some(category))
                .flat_map(|(_, patterns)| patterns.iter().map(String::as_str));
            let sources = builtin_patterns(category).iter().copied().chain(extra);
            PatternFamily::compile(category, sources)
                .map_err(|e| format!("invalid pattern for {category}: {e}"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_families_in_scored_order() {
        let families = builtin_families();
        let order: Vec<_> = families.iter().map(|f| f.category).collect();
        assert_eq!(order, SecurityCategory::SCORED.to_vec());
        assert_eq!(families[0].len(), 8);
        assert_eq!(families[4].len(), 7);
    }

    #[test]
    fn test_hits_count_every_occurrence() {
        let families = builtin_families();
        let violent = &families[0];
        assert_eq!(violent.hits("Stabbing, then another stabbing and a MURDER"), 3);
        assert_eq!(violent.hits("stabbings"), 0);
    }

    #[test]
    fn test_multi_word_patterns() {
        let families = builtin_families();
        let terror = &families[2];
        let found: Vec<_> = terror.first_matches("Security  Alert issued").collect();
        assert_eq!(found, vec!["alert", "security  alert"]);
    }

    #[test]
    fn test_custom_patterns_merged() {
        let mut custom = BTreeMap::new();
        custom.insert("violent_crime".to_string(), vec![r"\bmachete\b".to_string()]);
        let families = families_with_custom(&custom).unwrap();
        assert_eq!(families[0].len(), 9);
        assert!(families[0].is_match("Machete found"));
    }

    #[test]
    fn test_custom_patterns_rejected() {
        let mut custom = BTreeMap::new();
        custom.insert("cyber".to_string(), vec![r"\bhack\b".to_string()]);
        assert!(families_with_custom(&custom).is_err());

        let mut custom = BTreeMap::new();
        custom.insert("terrorism".to_string(), vec!["(unclosed".to_string()]);
        assert!(families_with_custom(&custom).is_err());
    }
}
