//! Security relevance classification
//!
//! Two interchangeable strategies share the [`ContentClassifier`] contract:
//!
//! - [`KeywordClassifier`]: whole-word keyword pass/fail
//! - [`AdvancedClassifier`]: keyword and regex-family scoring with a
//!   relevance threshold and a category

pub mod advanced;
pub mod keyword;
pub mod patterns;

pub use advanced::{AdvancedClassifier, Assessment};
pub use keyword::{KeywordClassifier, KeywordSet};

use std::sync::Arc;

use crate::config::{ClassifierMode, ClassifierSettings};
use crate::error::Result;
use crate::models::{ClassifiedEntry, Entry};

pub trait ContentClassifier: Send + Sync {
    /// Short name used in logs and stats
    fn name(&self) -> &'static str;

    fn contains_security_keywords(&self, text: &str) -> bool;

    fn matched_keywords(&self, text: &str) -> Vec<String>;

    /// Keep the security-relevant entries.
    ///
    /// `min_relevance` overrides the configured threshold for this call;
    /// strategies without a score ignore it.
    fn filter_entries(&self, entries: Vec<Entry>, min_relevance: Option<f64>) -> Vec<ClassifiedEntry>;
}

/// Build the configured classifier
pub fn from_settings(settings: &ClassifierSettings) -> Result<Arc<dyn ContentClassifier>> {
    let classifier: Arc<dyn ContentClassifier> = match settings.mode {
        ClassifierMode::Basic => Arc::new(KeywordClassifier::new(&settings.keywords)),
        ClassifierMode::Advanced => Arc::new(AdvancedClassifier::from_settings(settings)?),
    };
    Ok(classifier)
}
