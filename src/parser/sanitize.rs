//! Text sanitization for feed titles and summaries
//!
//! Feed payloads carry markup inside text fields (RSS descriptions are often
//! escaped HTML). These helpers turn such fields into a single line of plain
//! text.

use regex::Regex;
use std::sync::LazyLock;

// Pre-compiled regex patterns for performance
static TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("Invalid regex pattern"));

static BLOCK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|noscript)\b[^>]*>.*?</(script|style|noscript)\s*>")
        .expect("Invalid regex pattern")
});

static WHITESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid regex pattern"));

/// Clean a text field extracted from a feed or page
///
/// Steps:
/// 1. Drop script/style blocks and strip remaining tags
/// 2. Decode HTML entities
/// 3. Remove zero-width and control characters
/// 4. Collapse whitespace to single spaces
///
/// # Examples
///
/// ```
/// use newswatch::parser::sanitize::sanitize_text;
///
/// let dirty = "<p>Road&nbsp;closed after <b>crash</b></p>\u{200B}";
/// assert_eq!(sanitize_text(dirty), "Road closed after crash");
/// ```
pub fn sanitize_text(text: &str) -> String {
    let stripped = strip_html_tags(text);
    // Entities may encode markup ("&lt;p&gt;"); strip again after decoding.
    let decoded = decode_html_entities(&stripped);
    let stripped = strip_html_tags(&decoded);
    let visible = remove_control_chars(&remove_zero_width(&stripped));
    normalize_whitespace(&visible)
}

/// Remove zero-width spaces, direction marks and the byte order mark
///
/// # Examples
///
/// ```
/// use newswatch::parser::sanitize::remove_zero_width;
///
/// assert_eq!(remove_zero_width("Soho\u{200B}\u{FEFF}"), "Soho");
/// ```
pub fn remove_zero_width(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(*c, '\u{200B}'..='\u{200F}' | '\u{2028}'..='\u{202F}' | '\u{FEFF}'))
        .collect()
}

/// Remove control characters except newline and tab
pub fn remove_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

/// Decode named and numeric HTML entities
///
/// # Examples
///
/// ```
/// use newswatch::parser::sanitize::decode_html_entities;
///
/// assert_eq!(decode_html_entities("Kensington &amp; Chelsea"), "Kensington & Chelsea");
/// ```
pub fn decode_html_entities(text: &str) -> String {
    html_escape::decode_html_entities(text)
        .replace('\u{a0}', " ")
}

/// Collapse any whitespace run (including newlines) to one space
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_REGEX.replace_all(text.trim(), " ").to_string()
}

/// Extract plain text from HTML, removing all tags
///
/// Tags are replaced by a space so adjacent blocks do not run together.
pub fn strip_html_tags(html: &str) -> String {
    let without_blocks = BLOCK_REGEX.replace_all(html, " ");
    TAG_REGEX.replace_all(&without_blocks, " ").to_string()
}

/// Check if text contains meaningful content
pub fn has_content(text: &str) -> bool {
    !text.trim().is_empty()
}
