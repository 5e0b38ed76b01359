//! Web search collaborators: the `SerpAPI` client and the optional
//! full-page review text fetcher.

pub mod client;
pub mod error;
pub mod fulltext;

pub use client::{extract_items, SerpApiClient, DEFAULT_RESULTS_PER_QUERY};
pub use error::SearchError;
pub use fulltext::{extract_review_text, PageFetcher};
