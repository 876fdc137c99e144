//! News listing page parser with selector fallback
//!
//! A listing page is a set of item containers, each holding a headline, an
//! optional summary and an optional date. Container selectors are tried in
//! order and the first one that matches anything wins; when none does, any
//! `div` whose class name looks like a news item is used instead.

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html};
use tracing::{debug, info};
use url::Url;

use crate::parser::date::parse_datetime;
use crate::parser::sanitize::sanitize_text;
use crate::parser::selectors::ListingSelectors;
use crate::utils::error::ParseError;

/// Items read from one page at most
pub const MAX_LISTING_ITEMS: usize = 30;

/// Summaries this short are navigation noise
const MIN_DESCRIPTION_CHARS: usize = 10;

/// One headline read from a listing page
#[derive(Debug, Clone, PartialEq)]
pub struct ListingItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub published: Option<DateTime<Utc>>,
}

pub struct ListingParser {
    selectors: ListingSelectors,
    base_url: Option<Url>,
    max_items: usize,
}

impl ListingParser {
    #[must_use]
    pub fn new(base_url: Option<Url>) -> Self {
        Self {
            selectors: ListingSelectors::new(),
            base_url,
            max_items: MAX_LISTING_ITEMS,
        }
    }

    #[must_use]
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    /// Parse a listing page.
    ///
    /// Containers without a headline are skipped. A page with no containers
    /// at all is an error.
    pub fn parse(&self, html: &str) -> Result<Vec<ListingItem>, ParseError> {
        let document = Html::parse_document(html);
        let containers = self.find_containers(&document);
        if containers.is_empty() {
            return Err(ParseError::Html("no news item containers found".into()));
        }

        let items: Vec<ListingItem> = containers
            .into_iter()
            .take(self.max_items)
            .filter_map(|container| self.parse_item(container))
            .collect();

        info!(items = items.len(), "Parsed listing page");
        Ok(items)
    }

    fn find_containers<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        for selector in self.selectors.containers {
            let found: Vec<_> = document.select(selector).collect();
            if !found.is_empty() {
                debug!(count = found.len(), "Item containers matched selector");
                return found;
            }
        }

        let found: Vec<_> = document
            .select(self.selectors.any_div)
            .filter(|el| {
                el.value()
                    .attr("class")
                    .is_some_and(|class| self.selectors.fallback_class.is_match(class))
            })
            .collect();
        debug!(count = found.len(), "Fallback: class-name item containers");
        found
    }

    fn parse_item(&self, container: ElementRef<'_>) -> Option<ListingItem> {
        let (title, href) = self.extract_title_and_link(container)?;

        Some(ListingItem {
            title,
            link: self.resolve_link(&href),
            description: self.extract_description(container).unwrap_or_default(),
            published: self.extract_date(container),
        })
    }

    /// First title selector with non-empty text, plus its link
    fn extract_title_and_link(&self, container: ElementRef<'_>) -> Option<(String, String)> {
        for selector in self.selectors.title {
            let Some(element) = container.select(selector).next() else {
                continue;
            };
            let title = sanitize_text(&element.text().collect::<String>());
            if title.is_empty() {
                continue;
            }
            let href = self.link_for(element).unwrap_or_default();
            return Some((title, href));
        }
        None
    }

    /// The element itself if it is an anchor, else an enclosing or nested one
    fn link_for(&self, element: ElementRef<'_>) -> Option<String> {
        if element.value().name() == "a" {
            return element.value().attr("href").map(str::to_string);
        }

        element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "a")
            .and_then(|a| a.value().attr("href"))
            .or_else(|| {
                element
                    .select(self.selectors.anchor)
                    .next()
                    .and_then(|a| a.value().attr("href"))
            })
            .map(str::to_string)
    }

    fn resolve_link(&self, href: &str) -> String {
        let href = href.trim();
        if href.is_empty() || href.starts_with("http://") || href.starts_with("https://") {
            return href.to_string();
        }
        match &self.base_url {
            Some(base) => base
                .join(href)
                .map(|u| u.to_string())
                .unwrap_or_else(|_| href.to_string()),
            None => href.to_string(),
        }
    }

    fn extract_description(&self, container: ElementRef<'_>) -> Option<String> {
        for candidate in self.selectors.description {
            let mut matches = container.select(&candidate.selector);
            let element = if candidate.link_free {
                matches.find(|el| el.select(self.selectors.anchor).next().is_none())
            } else {
                matches.next()
            };

            let Some(element) = element else {
                continue;
            };
            let text = sanitize_text(&element.text().collect::<String>());
            if text.chars().count() > MIN_DESCRIPTION_CHARS {
                return Some(text);
            }
        }
        None
    }

    /// First date element that parses; `datetime` attribute before text
    fn extract_date(&self, container: ElementRef<'_>) -> Option<DateTime<Utc>> {
        for selector in self.selectors.date {
            let Some(element) = container.select(selector).next() else {
                continue;
            };
            if let Some(dt) = element
                .value()
                .attr("datetime")
                .and_then(|attr| parse_datetime(attr).ok())
            {
                return Some(dt);
            }
            let text = sanitize_text(&element.text().collect::<String>());
            if let Ok(dt) = parse_datetime(&text) {
                return Some(dt);
            }
        }
        None
    }
}

impl Default for ListingParser {
    fn default() -> Self {
        Self::new(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn parser() -> ListingParser {
        ListingParser::new(Some(Url::parse("https://news.met.police.uk").unwrap()))
    }

    #[test]
    fn test_primary_container_selector() {
        let html = r#"
            <html><body>
              <article class="news-item">
                <h3><a href="/news/stabbing-in-brixton-123">Man charged after stabbing in Brixton</a></h3>
                <p class="summary">A 24-year-old man has been charged following a stabbing.</p>
                <time datetime="2025-03-03T09:15:00Z">3 March 2025</time>
              </article>
              <article class="news-item">
                <h3><a href="https://news.met.police.uk/news/appeal-456">Appeal for witnesses</a></h3>
                <span class="date">2 March 2025</span>
              </article>
            </body></html>
        "#;

        let items = parser().parse(html).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Man charged after stabbing in Brixton");
        assert_eq!(
            items[0].link,
            "https://news.met.police.uk/news/stabbing-in-brixton-123"
        );
        assert!(items[0].description.starts_with("A 24-year-old man"));
        assert_eq!(items[0].published.unwrap().day(), 3);

        assert_eq!(items[1].link, "https://news.met.police.uk/news/appeal-456");
        assert_eq!(items[1].description, "");
        assert_eq!(items[1].published.unwrap().day(), 2);
    }

    #[test]
    fn test_enclosing_anchor_link() {
        let html = r#"
            <div class="news-item">
              <a href="/news/road-closure"><h2>Road closed in Camden</h2></a>
            </div>
        "#;
        let items = parser().parse(html).unwrap();
        assert_eq!(items[0].link, "https://news.met.police.uk/news/road-closure");
    }

    #[test]
    fn test_class_name_fallback() {
        let html = r#"
            <div class="press-release-entry">
              <span class="headline">Officers attend disorder in Croydon</span>
            </div>
            <div class="sidebar"><span class="headline">Ignore me</span></div>
        "#;
        let items = parser().parse(html).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Officers attend disorder in Croydon");
        assert_eq!(items[0].link, "");
        assert!(items[0].published.is_none());
    }

    #[test]
    fn test_paragraph_with_link_skipped() {
        let html = r#"
            <article class="news-item">
              <h2>Arrest made in Hackney</h2>
              <p>Read more <a href="/x">here</a> about this case</p>
              <p>Detectives have arrested a man on suspicion of burglary.</p>
            </article>
        "#;
        let items = parser().parse(html).unwrap();
        assert_eq!(
            items[0].description,
            "Detectives have arrested a man on suspicion of burglary."
        );
    }

    #[test]
    fn test_short_description_ignored() {
        let html = r#"
            <article class="news-item">
              <h2>Appeal</h2>
              <div class="summary">Read more</div>
            </article>
        "#;
        let items = parser().parse(html).unwrap();
        assert_eq!(items[0].description, "");
    }

    #[test]
    fn test_item_limit_and_missing_titles() {
        let mut html = String::from("<html><body>");
        for i in 0..40 {
            html.push_str(&format!(
                r#"<article class="news-item"><h2>Item {i}</h2></article>"#
            ));
        }
        html.push_str(r#"<article class="news-item"><span>no title</span></article>"#);
        html.push_str("</body></html>");

        let items = parser().parse(&html).unwrap();
        assert_eq!(items.len(), MAX_LISTING_ITEMS);

        let untitled = r#"<article class="news-item"><span>no title</span></article>"#;
        assert!(parser().parse(untitled).unwrap().is_empty());
    }

    #[test]
    fn test_no_containers_is_error() {
        let err = parser().parse("<html><body><p>Nothing here</p></body></html>");
        assert!(matches!(err, Err(ParseError::Html(_))));
    }
}
