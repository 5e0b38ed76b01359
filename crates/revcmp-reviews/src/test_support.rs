//! Scripted fakes shared by the unit tests in this crate.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use revcmp_core::{
    Notice, NoticeLevel, Notifier, Query, ReviewRecord, ReviewStore, SearchResult, StoreError,
    StoredReview,
};
use revcmp_inference::InferenceError;
use revcmp_search::SearchError;

use crate::backends::{FullTextSource, LlmClient, SearchBackend, SentimentClassifier};
use crate::cancel::CancelFlag;

pub(crate) fn item(title: &str, snippet: &str, link: &str) -> SearchResult {
    SearchResult {
        title: Some(title.to_string()),
        snippet: snippet.to_string(),
        link: Some(link.to_string()),
    }
}

pub(crate) fn items(prefix: &str, links: &[&str]) -> Vec<SearchResult> {
    links
        .iter()
        .map(|l| item(&format!("{prefix} {l}"), &format!("snippet for {l}"), l))
        .collect()
}

/// Search backend answering from a per-query script. Unscripted queries
/// return no results.
#[derive(Default)]
pub(crate) struct ScriptedSearch {
    script: Mutex<HashMap<String, VecDeque<Result<Vec<SearchResult>, SearchError>>>>,
    issued: Mutex<Vec<String>>,
    cancel_after_first: Option<CancelFlag>,
}

impl ScriptedSearch {
    /// Raises `flag` once the first query has been answered.
    pub(crate) fn cancelling(mut self, flag: &CancelFlag) -> Self {
        self.cancel_after_first = Some(flag.clone());
        self
    }

    pub(crate) fn respond(self, query: &str, result: Result<Vec<SearchResult>, SearchError>) -> Self {
        self.script
            .lock()
            .unwrap()
            .entry(query.to_string())
            .or_default()
            .push_back(result);
        self
    }

    pub(crate) fn issued(&self) -> Vec<String> {
        self.issued.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchBackend for ScriptedSearch {
    async fn search(&self, query: &Query) -> Result<Vec<SearchResult>, SearchError> {
        self.issued.lock().unwrap().push(query.text().to_string());
        if let Some(flag) = &self.cancel_after_first {
            flag.cancel();
        }
        self.script
            .lock()
            .unwrap()
            .get_mut(query.text())
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

/// Classifier that labels by keyword and can be told to fail.
#[derive(Default)]
pub(crate) struct KeywordClassifier {
    pub(crate) fail_with_status: Option<u16>,
    pub(crate) calls: Mutex<Vec<String>>,
}

#[async_trait]
impl SentimentClassifier for KeywordClassifier {
    async fn classify(&self, text: &str) -> Result<String, InferenceError> {
        self.calls.lock().unwrap().push(text.to_string());
        if let Some(status) = self.fail_with_status {
            return Err(InferenceError::Status {
                service: "huggingface",
                status,
                body: String::new(),
            });
        }
        let label = if text.trim().is_empty() {
            "unknown"
        } else if text.contains("bad") {
            "negative"
        } else if text.contains("great") {
            "positive"
        } else {
            "neutral"
        };
        Ok(label.to_string())
    }
}

/// LLM that answers "Yes" for a fixed set of words found in the prompt.
#[derive(Default)]
pub(crate) struct ScriptedLlm {
    pub(crate) brands: Vec<String>,
    pub(crate) prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub(crate) fn knowing(brands: &[&str]) -> Self {
        Self {
            brands: brands.iter().map(|b| (*b).to_string()).collect(),
            prompts: Mutex::default(),
        }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn ask(&self, prompt: &str) -> Result<String, InferenceError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let known = self
            .brands
            .iter()
            .any(|b| prompt.contains(&format!("'{b}'")));
        Ok(if known { "Yes." } else { "No" }.to_string())
    }
}

pub(crate) struct FixedPages(pub(crate) HashMap<String, String>);

#[async_trait]
impl FullTextSource for FixedPages {
    async fn fetch_full_text(&self, link: &str) -> String {
        self.0.get(link).cloned().unwrap_or_default()
    }
}

/// In-memory `ReviewStore`.
#[derive(Default)]
pub(crate) struct MemoryStore {
    pub(crate) rows: Mutex<Vec<StoredReview>>,
    pub(crate) fail_updates: bool,
}

impl MemoryStore {
    pub(crate) fn seed(&self, brand: &str, product: &str, snippet: &str, label: Option<&str>) {
        let mut rows = self.rows.lock().unwrap();
        let id = i64::try_from(rows.len()).unwrap() + 1;
        rows.push(StoredReview {
            id,
            brand: brand.to_string(),
            product: product.to_string(),
            source: "snippet".to_string(),
            title: String::new(),
            snippet: snippet.to_string(),
            link: Some(format!("https://example.com/seed/{id}")),
            label: label.map(str::to_string),
            fetched_at: Utc::now(),
        });
    }

    pub(crate) fn rows(&self) -> Vec<StoredReview> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn insert_reviews(&self, records: &[ReviewRecord]) -> Result<u64, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        for r in records {
            let id = i64::try_from(rows.len()).unwrap() + 1;
            rows.push(StoredReview {
                id,
                brand: r.brand.clone(),
                product: r.product.clone(),
                source: r.source.clone(),
                title: r.title.clone(),
                snippet: r.snippet.clone(),
                link: Some(r.link.clone()),
                label: None,
                fetched_at: r.fetched_at,
            });
        }
        Ok(records.len() as u64)
    }

    async fn fetch_reviews(
        &self,
        brand: &str,
        product: &str,
    ) -> Result<Vec<StoredReview>, StoreError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.brand == brand && r.product == product)
            .cloned()
            .collect())
    }

    async fn update_label(&self, id: i64, label: &str) -> Result<(), StoreError> {
        if self.fail_updates {
            return Err(StoreError::Backend("disk full".to_string()));
        }
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::Backend(format!("no review {id}")))?;
        row.label = Some(label.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotifier(Mutex<Vec<Notice>>);

impl RecordingNotifier {
    pub(crate) fn messages(&self, level: NoticeLevel) -> Vec<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.level == level)
            .map(|n| n.message.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.0.lock().unwrap().push(notice);
    }
}
