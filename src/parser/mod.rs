//! Payload parsing helpers
//!
//! This module handles the pieces shared by feed sources: listing-page
//! scraping, timestamp parsing and text cleanup. Syndication formats are
//! parsed by `feed-rs` in [`crate::feeds::syndication`].

pub mod date;
pub mod html;
pub mod sanitize;
pub mod selectors;

pub use date::parse_datetime;
pub use html::{ListingItem, ListingParser, MAX_LISTING_ITEMS};
pub use sanitize::sanitize_text;
