use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};

use crate::models::PayloadFormat;
use crate::utils::error::FetchError;

/// Accept header for each payload shape
pub fn accept_for(format: PayloadFormat) -> &'static str {
    match format {
        PayloadFormat::Rss => {
            "application/rss+xml,application/xml;q=0.9,text/xml;q=0.8,*/*;q=0.5"
        }
        PayloadFormat::Atom => {
            "application/atom+xml,application/xml;q=0.9,text/xml;q=0.8,*/*;q=0.5"
        }
        PayloadFormat::Html => {
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
        }
    }
}

/// Build request headers for a source fetch
///
/// # Examples
///
/// ```
/// use newswatch::feeds::headers::build_feed_headers;
/// use newswatch::models::PayloadFormat;
///
/// let headers = build_feed_headers("NewsWatch/0.1", PayloadFormat::Rss).unwrap();
/// assert_eq!(headers["user-agent"], "NewsWatch/0.1");
/// ```
pub fn build_feed_headers(user_agent: &str, format: PayloadFormat) -> Result<HeaderMap, FetchError> {
    let mut headers = HeaderMap::new();

    let user_agent = HeaderValue::from_str(user_agent)
        .map_err(|e| FetchError::InvalidUrl(format!("invalid user agent header: {e}")))?;
    headers.insert(USER_AGENT, user_agent);
    headers.insert(ACCEPT, HeaderValue::from_static(accept_for(format)));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-GB,en;q=0.9"),
    );

    Ok(headers)
}
