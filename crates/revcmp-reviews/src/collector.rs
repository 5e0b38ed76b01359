//! Deduplicating review-snippet collection for one (product, brand) pair.

use std::collections::HashSet;

use chrono::Utc;

use revcmp_core::{Notifier, PacingPolicy, Query, RetryPolicy, ReviewRecord, SNIPPET_SOURCE};
use revcmp_search::{SearchError, DEFAULT_RESULTS_PER_QUERY};

use crate::backends::SearchBackend;
use crate::cancel::CancelFlag;
use crate::retry::{self, RetryOutcome};

/// Query templates in the order they are issued. Marketplace-scoped
/// searches come first because their snippets are mostly actual reviews.
const QUERY_TEMPLATES: [&str; 3] = [
    "{product} {brand} reviews site:amazon.in",
    "{product} {brand} reviews site:flipkart.com",
    "{product} {brand} reviews",
];

/// Builds the query strings for `(product, brand)` in issue order.
#[must_use]
pub fn build_queries(product: &str, brand: &str) -> Vec<String> {
    QUERY_TEMPLATES
        .iter()
        .map(|t| t.replace("{product}", product).replace("{brand}", brand))
        .collect()
}

/// Issues search queries and accumulates unique-link snippets up to a quota.
pub struct SnippetCollector<'a> {
    search: &'a dyn SearchBackend,
    retry: RetryPolicy,
    pacing: PacingPolicy,
    country: String,
    cancel: &'a CancelFlag,
    notifier: &'a dyn Notifier,
}

impl<'a> SnippetCollector<'a> {
    pub fn new(
        search: &'a dyn SearchBackend,
        cancel: &'a CancelFlag,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            search,
            retry: RetryPolicy::search(),
            pacing: PacingPolicy::default(),
            country: "in".to_string(),
            cancel,
            notifier,
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_pacing(mut self, pacing: PacingPolicy) -> Self {
        self.pacing = pacing;
        self
    }

    #[must_use]
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    /// Collects at most `max_snippets` records, no two sharing a link.
    ///
    /// Queries are issued in template order and collection stops as soon as
    /// the quota is met, so later templates may never run. A failed query is
    /// skipped. A raised cancel flag returns whatever was gathered so far.
    pub async fn collect(&self, product: &str, brand: &str, max_snippets: usize) -> Vec<ReviewRecord> {
        let mut records: Vec<ReviewRecord> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        if max_snippets == 0 {
            return records;
        }

        for (index, text) in build_queries(product, brand).into_iter().enumerate() {
            if records.len() >= max_snippets {
                break;
            }
            if self.cancel.is_cancelled() {
                tracing::info!(brand, collected = records.len(), "collection cancelled");
                break;
            }
            if index > 0 {
                tokio::time::sleep(self.pacing.delay(rand::random::<f64>())).await;
            }

            let query = Query::new(text, DEFAULT_RESULTS_PER_QUERY, self.country.as_str());
            let what = format!("search '{}'", query.text());
            let outcome = retry::call(
                &what,
                &self.retry,
                SearchError::is_transient,
                self.cancel,
                self.notifier,
                || self.search.search(&query),
            )
            .await;

            let items = match outcome {
                RetryOutcome::Success(items) => items,
                RetryOutcome::Cancelled => break,
                RetryOutcome::ExhaustedRetries | RetryOutcome::Fatal(_) => {
                    tracing::warn!(brand, query = query.text(), "query skipped");
                    continue;
                }
            };

            let fetched_at = Utc::now();
            let before = records.len();
            for item in items {
                if records.len() >= max_snippets {
                    break;
                }
                let Some(link) = item.usable_link() else {
                    continue;
                };
                if !seen.insert(link.to_string()) {
                    continue;
                }
                records.push(ReviewRecord {
                    brand: brand.to_string(),
                    product: product.to_string(),
                    source: SNIPPET_SOURCE.to_string(),
                    title: item.title.clone().unwrap_or_default(),
                    snippet: item.snippet.clone(),
                    link: link.to_string(),
                    fetched_at,
                });
            }
            tracing::debug!(
                brand,
                query = query.text(),
                added = records.len() - before,
                total = records.len(),
                "query processed"
            );
        }

        records
    }
}

#[cfg(test)]
#[path = "collector_test.rs"]
mod tests;
