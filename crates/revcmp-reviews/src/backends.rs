//! Seams between the analysis logic and the remote services it calls.
//!
//! The production clients implement these traits directly; tests supply
//! scripted fakes.

use async_trait::async_trait;

use revcmp_core::{Query, SearchResult};
use revcmp_inference::{HfClassifier, InferenceError, MistralClient};
use revcmp_search::{PageFetcher, SearchError, SerpApiClient};

#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &Query) -> Result<Vec<SearchResult>, SearchError>;
}

#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    /// Top label for `text`; blank text is `"unknown"`.
    async fn classify(&self, text: &str) -> Result<String, InferenceError>;
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn ask(&self, prompt: &str) -> Result<String, InferenceError>;
}

#[async_trait]
pub trait FullTextSource: Send + Sync {
    /// Review text behind `link`, or `""` when it cannot be fetched.
    async fn fetch_full_text(&self, link: &str) -> String;
}

#[async_trait]
impl SearchBackend for SerpApiClient {
    async fn search(&self, query: &Query) -> Result<Vec<SearchResult>, SearchError> {
        self.search_items(query).await
    }
}

#[async_trait]
impl SentimentClassifier for HfClassifier {
    async fn classify(&self, text: &str) -> Result<String, InferenceError> {
        HfClassifier::classify(self, text).await
    }
}

#[async_trait]
impl LlmClient for MistralClient {
    async fn ask(&self, prompt: &str) -> Result<String, InferenceError> {
        MistralClient::ask(self, prompt).await
    }
}

#[async_trait]
impl FullTextSource for PageFetcher {
    async fn fetch_full_text(&self, link: &str) -> String {
        PageFetcher::fetch_full_text(self, link).await
    }
}
