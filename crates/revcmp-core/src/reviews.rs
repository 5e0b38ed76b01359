use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label assigned to text that was empty or could not be classified.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Source tag for records built from search-result snippets.
pub const SNIPPET_SOURCE: &str = "snippet";

/// A single search request: query text, result count, and country code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    text: String,
    result_count: u32,
    country: String,
}

impl Query {
    #[must_use]
    pub fn new(text: impl Into<String>, result_count: u32, country: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            result_count,
            country: country.into(),
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn result_count(&self) -> u32 {
        self.result_count
    }

    #[must_use]
    pub fn country(&self) -> &str {
        &self.country
    }
}

/// One organic search hit.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: Option<String>,
    pub snippet: String,
    pub link: Option<String>,
}

impl SearchResult {
    /// The link, if present and not blank.
    #[must_use]
    pub fn usable_link(&self) -> Option<&str> {
        self.link
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }
}

/// A review snippet collected for one (brand, product) pair, not yet persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub brand: String,
    pub product: String,
    pub source: String,
    pub title: String,
    pub snippet: String,
    pub link: String,
    pub fetched_at: DateTime<Utc>,
}

/// A persisted review with its surrogate key and optional sentiment label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReview {
    pub id: i64,
    pub brand: String,
    pub product: String,
    pub source: String,
    pub title: String,
    pub snippet: String,
    pub link: Option<String>,
    pub label: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

/// Number of reviews of one brand that received a given label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCount {
    pub brand: String,
    pub label: String,
    pub count: usize,
}
