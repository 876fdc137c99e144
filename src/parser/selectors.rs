//! CSS selectors for scraped news listing pages
//!
//! Each list is tried in order; the first selector that yields something
//! usable wins.

use lazy_static::lazy_static;
use regex::Regex;
use scraper::Selector;

// Helper macro to parse selectors safely at compile time
macro_rules! parse_selector {
    ($s:expr) => {
        Selector::parse($s).expect(concat!("Invalid CSS selector: ", $s))
    };
}

lazy_static! {
    // Item containers
    static ref CONTAINERS: Vec<Selector> = vec![
        parse_selector!("article.news-item"),
        parse_selector!("div.news-item"),
        parse_selector!("div.article"),
        parse_selector!("div.news-article"),
        parse_selector!(r#"div[class*="news"]"#),
        parse_selector!(r#"div[class*="article"]"#),
        parse_selector!(r#"div[class*="story"]"#),
        parse_selector!("li.news-item"),
        parse_selector!("div.news-list-item"),
    ];

    static ref TITLE: Vec<Selector> = vec![
        parse_selector!("h1"),
        parse_selector!("h2"),
        parse_selector!("h3"),
        parse_selector!("h4"),
        parse_selector!("h5"),
        parse_selector!(".title"),
        parse_selector!(".headline"),
        parse_selector!(".news-title"),
        parse_selector!(r#"a[href*="/news/"]"#),
        parse_selector!("a.news-link"),
    ];

    static ref DESCRIPTION: Vec<DescriptionSelector> = vec![
        DescriptionSelector::any(parse_selector!(".summary")),
        DescriptionSelector::any(parse_selector!(".description")),
        DescriptionSelector::any(parse_selector!(".excerpt")),
        DescriptionSelector::any(parse_selector!(".content")),
        DescriptionSelector::any(parse_selector!(".news-summary")),
        DescriptionSelector::any(parse_selector!(".article-summary")),
        DescriptionSelector::any(parse_selector!(".news-content")),
        DescriptionSelector::link_free(parse_selector!("p")),
        DescriptionSelector::any(parse_selector!(r#"div[class*="summary"]"#)),
        DescriptionSelector::any(parse_selector!(r#"div[class*="content"]"#)),
    ];

    static ref DATE: Vec<Selector> = vec![
        parse_selector!(".date"),
        parse_selector!(".published"),
        parse_selector!(".news-date"),
        parse_selector!(".article-date"),
        parse_selector!(".timestamp"),
        parse_selector!(".time"),
        parse_selector!("[datetime]"),
        parse_selector!(".meta-date"),
        parse_selector!("time"),
    ];

    static ref ANCHOR: Selector = parse_selector!("a[href]");

    static ref ANY_DIV: Selector = parse_selector!("div[class]");

    /// Class names that mark an item when no container selector matched
    static ref FALLBACK_CLASS: Regex =
        Regex::new(r"(?i)item|entry|news|article").expect("Invalid regex pattern");
}

/// Summary selector; `link_free` skips matches that contain an anchor
pub struct DescriptionSelector {
    pub selector: Selector,
    pub link_free: bool,
}

impl DescriptionSelector {
    fn any(selector: Selector) -> Self {
        Self {
            selector,
            link_free: false,
        }
    }

    fn link_free(selector: Selector) -> Self {
        Self {
            selector,
            link_free: true,
        }
    }
}

/// Selector sets for one listing page layout
pub struct ListingSelectors {
    pub containers: &'static [Selector],
    pub title: &'static [Selector],
    pub description: &'static [DescriptionSelector],
    pub date: &'static [Selector],
    pub anchor: &'static Selector,
    pub any_div: &'static Selector,
    pub fallback_class: &'static Regex,
}

impl ListingSelectors {
    pub fn new() -> Self {
        Self {
            containers: &CONTAINERS,
            title: &TITLE,
            description: &DESCRIPTION,
            date: &DATE,
            anchor: &ANCHOR,
            any_div: &ANY_DIV,
            fallback_class: &FALLBACK_CLASS,
        }
    }
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_lists_compile() {
        let s = ListingSelectors::new();
        assert_eq!(s.containers.len(), 9);
        assert_eq!(s.title.len(), 10);
        assert_eq!(s.description.len(), 10);
        assert_eq!(s.description.iter().filter(|d| d.link_free).count(), 1);
        assert_eq!(s.date.len(), 9);
    }

    #[test]
    fn test_fallback_class_pattern() {
        let s = ListingSelectors::new();
        assert!(s.fallback_class.is_match("press-release-item"));
        assert!(s.fallback_class.is_match("Entry"));
        assert!(!s.fallback_class.is_match("sidebar"));
    }
}
