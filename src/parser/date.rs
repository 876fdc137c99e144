//! Timestamp parsing for feed and page dates

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::utils::error::ParseError;

/// Date-time layouts tried after RFC 3339 and RFC 2822
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Date-only layouts; the time is midnight UTC
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d %B %Y", "%d %b %Y", "%B %d, %Y", "%b %d, %Y"];

/// Parse a published/updated value as UTC
///
/// Accepts RFC 3339, RFC 2822, ISO-like local times (taken as UTC) and the
/// day-month-year forms used on news listing pages ("3 March 2025").
pub fn parse_datetime(raw: &str) -> Result<DateTime<Utc>, ParseError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ParseError::InvalidDate(raw.to_string()));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt.and_utc());
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            if let Some(dt) = date.and_hms_opt(0, 0, 0) {
                return Ok(dt.and_utc());
            }
        }
    }

    Err(ParseError::InvalidDate(raw.to_string()))
}
