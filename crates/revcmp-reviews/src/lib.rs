//! Review collection and sentiment analysis.
//!
//! Collects review snippets from web search with retries and pacing,
//! infers brands when none are given, labels snippets with a sentiment
//! classifier, and aggregates label counts per brand.

pub mod backends;
pub mod brands;
pub mod cancel;
pub mod collector;
pub mod error;
pub mod labeling;
pub mod pipeline;
pub mod retry;

#[cfg(test)]
mod test_support;

pub use backends::{FullTextSource, LlmClient, SearchBackend, SentimentClassifier};
pub use brands::{candidate_tokens, BrandInferrer, DEFAULT_TOP_K};
pub use cancel::CancelFlag;
pub use collector::{build_queries, SnippetCollector};
pub use error::AnalysisError;
pub use labeling::{label_unlabeled, LabelingSummary};
pub use pipeline::{
    label_counts, parse_brand_list, AnalysisReport, AnalysisRequest, AnalysisSettings, Analyzer,
    BrandCollection, DEFAULT_MAX_SNIPPETS, MAX_SNIPPETS, MIN_SNIPPETS,
};
pub use retry::{call, RetryOutcome};
