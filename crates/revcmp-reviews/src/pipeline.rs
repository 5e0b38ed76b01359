//! End-to-end analysis: pick brands, collect and store snippets, label them,
//! and summarise labels per brand.

use std::collections::BTreeMap;

use serde::Serialize;

use revcmp_core::{
    AppConfig, LabelCount, Notifier, PacingPolicy, RetryPolicy, ReviewStore, StoredReview,
    UNKNOWN_LABEL,
};

use crate::backends::{FullTextSource, LlmClient, SearchBackend, SentimentClassifier};
use crate::brands::{BrandInferrer, DEFAULT_TOP_K};
use crate::cancel::CancelFlag;
use crate::collector::SnippetCollector;
use crate::error::AnalysisError;
use crate::labeling::{label_unlabeled, LabelingSummary};

pub const MIN_SNIPPETS: usize = 5;
pub const MAX_SNIPPETS: usize = 100;
pub const DEFAULT_MAX_SNIPPETS: usize = 30;

/// What to analyse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub product: String,
    /// Explicit brands; empty means infer them.
    pub brands: Vec<String>,
    /// Per-brand snippet quota, clamped to `5..=100`.
    pub max_snippets: usize,
    /// Replace snippets with the review page text where it can be fetched.
    pub use_fulltext: bool,
}

impl AnalysisRequest {
    pub fn new(product: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            brands: Vec::new(),
            max_snippets: DEFAULT_MAX_SNIPPETS,
            use_fulltext: false,
        }
    }
}

/// Splits a comma-separated brand list, trimming entries and dropping blanks.
#[must_use]
pub fn parse_brand_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .map(str::to_string)
        .collect()
}

/// Retry, pacing, and locale settings for one analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSettings {
    pub search_retry: RetryPolicy,
    pub inference_retry: RetryPolicy,
    pub llm_retry: RetryPolicy,
    pub pacing: PacingPolicy,
    pub country: String,
}

impl AnalysisSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            search_retry: config.search_retry,
            inference_retry: config.inference_retry,
            llm_retry: config.llm_retry,
            pacing: config.pacing,
            country: config.search_country.clone(),
        }
    }
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            search_retry: RetryPolicy::search(),
            inference_retry: RetryPolicy::inference(),
            llm_retry: RetryPolicy::llm(),
            pacing: PacingPolicy::default(),
            country: "in".to_string(),
        }
    }
}

/// How one brand's reviews were obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrandCollection {
    pub brand: String,
    /// Rows were already stored, so no search was issued.
    pub cached: bool,
    /// Cached row count, or rows inserted by this run.
    pub reviews: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub product: String,
    pub brands: Vec<String>,
    pub collections: Vec<BrandCollection>,
    pub labeled: usize,
    pub unlabeled: usize,
    pub cancelled: bool,
    pub reviews: Vec<StoredReview>,
    pub counts: Vec<LabelCount>,
}

/// Groups reviews by `(brand, label)`, sorted by brand then label. Rows
/// without a label count as `"unknown"`.
#[must_use]
pub fn label_counts(reviews: &[StoredReview]) -> Vec<LabelCount> {
    let mut grouped: BTreeMap<(&str, &str), usize> = BTreeMap::new();
    for review in reviews {
        let label = review.label.as_deref().unwrap_or(UNKNOWN_LABEL);
        *grouped.entry((review.brand.as_str(), label)).or_default() += 1;
    }
    grouped
        .into_iter()
        .map(|((brand, label), count)| LabelCount {
            brand: brand.to_string(),
            label: label.to_string(),
            count,
        })
        .collect()
}

/// Runs analyses against a set of collaborators.
pub struct Analyzer<'a> {
    store: &'a dyn ReviewStore,
    search: &'a dyn SearchBackend,
    classifier: &'a dyn SentimentClassifier,
    llm: Option<&'a dyn LlmClient>,
    fulltext: Option<&'a dyn FullTextSource>,
    settings: AnalysisSettings,
    cancel: &'a CancelFlag,
    notifier: &'a dyn Notifier,
}

impl<'a> Analyzer<'a> {
    pub fn new(
        store: &'a dyn ReviewStore,
        search: &'a dyn SearchBackend,
        classifier: &'a dyn SentimentClassifier,
        cancel: &'a CancelFlag,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            store,
            search,
            classifier,
            llm: None,
            fulltext: None,
            settings: AnalysisSettings::default(),
            cancel,
            notifier,
        }
    }

    /// LLM used for brand inference; without one, requests must name brands.
    #[must_use]
    pub fn with_llm(mut self, llm: Option<&'a dyn LlmClient>) -> Self {
        self.llm = llm;
        self
    }

    #[must_use]
    pub fn with_fulltext(mut self, fulltext: Option<&'a dyn FullTextSource>) -> Self {
        self.fulltext = fulltext;
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: AnalysisSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Runs one analysis.
    ///
    /// Brands already present in the store are not searched again. Failed
    /// searches and classifications are skipped; only store failures abort.
    ///
    /// # Errors
    ///
    /// - [`AnalysisError::EmptyProduct`] for a blank product name.
    /// - [`AnalysisError::BrandInferenceUnavailable`] when no brands are given
    ///   and no LLM is configured.
    /// - [`AnalysisError::NoBrands`] when inference confirms nothing.
    /// - [`AnalysisError::NoReviews`] when nothing is stored for any brand.
    /// - [`AnalysisError::Store`] on persistence failure.
    pub async fn run_analysis(
        &self,
        request: &AnalysisRequest,
    ) -> Result<AnalysisReport, AnalysisError> {
        let product = request.product.trim();
        if product.is_empty() {
            return Err(AnalysisError::EmptyProduct);
        }
        let max_snippets = request.max_snippets.clamp(MIN_SNIPPETS, MAX_SNIPPETS);

        let brands = self.resolve_brands(product, &request.brands).await?;
        self.notifier
            .success(&format!("Analysis will run for brands: {}", brands.join(", ")));

        let mut collections = Vec::with_capacity(brands.len());
        for brand in &brands {
            if self.cancel.is_cancelled() {
                break;
            }
            collections.push(
                self.collect_brand(product, brand, max_snippets, request.use_fulltext)
                    .await?,
            );
        }

        let reviews = self.load_reviews(product, &brands).await?;
        if reviews.is_empty() {
            self.notifier.warning("No reviews available for analysis.");
            return Err(AnalysisError::NoReviews);
        }

        let summary = if self.cancel.is_cancelled() {
            LabelingSummary::default()
        } else {
            label_unlabeled(
                &reviews,
                self.classifier,
                self.store,
                &self.settings.inference_retry,
                self.cancel,
                self.notifier,
            )
            .await?
        };

        let reviews = if summary.labeled > 0 {
            self.load_reviews(product, &brands).await?
        } else {
            reviews
        };
        let counts = label_counts(&reviews);
        let unlabeled = reviews.iter().filter(|r| r.label.is_none()).count();
        let cancelled = self.cancel.is_cancelled();

        tracing::info!(
            product,
            brands = brands.len(),
            reviews = reviews.len(),
            labeled = summary.labeled,
            unlabeled,
            cancelled,
            "analysis finished"
        );
        if cancelled {
            self.notifier.warning("Analysis cancelled; results are partial.");
        } else {
            self.notifier.success("Done!");
        }

        Ok(AnalysisReport {
            product: product.to_string(),
            brands,
            collections,
            labeled: summary.labeled,
            unlabeled,
            cancelled,
            reviews,
            counts,
        })
    }

    async fn resolve_brands(
        &self,
        product: &str,
        explicit: &[String],
    ) -> Result<Vec<String>, AnalysisError> {
        let explicit: Vec<String> = explicit
            .iter()
            .map(|b| b.trim())
            .filter(|b| !b.is_empty())
            .map(str::to_string)
            .collect();
        if !explicit.is_empty() {
            return Ok(explicit);
        }

        let Some(llm) = self.llm else {
            self.notifier
                .error("Cannot infer brands. MISTRAL_API_KEY is not set.");
            return Err(AnalysisError::BrandInferenceUnavailable);
        };

        let brands = BrandInferrer::new(self.search, llm, self.cancel, self.notifier)
            .with_retry(self.settings.search_retry, self.settings.llm_retry)
            .with_country(self.settings.country.as_str())
            .infer(product, DEFAULT_TOP_K)
            .await;

        if brands.is_empty() {
            self.notifier.warning(
                "Could not determine any brands. Please provide brands manually.",
            );
            return Err(AnalysisError::NoBrands);
        }
        Ok(brands)
    }

    async fn collect_brand(
        &self,
        product: &str,
        brand: &str,
        max_snippets: usize,
        use_fulltext: bool,
    ) -> Result<BrandCollection, AnalysisError> {
        let cached = self.store.fetch_reviews(brand, product).await?;
        if !cached.is_empty() {
            tracing::info!(brand, product, count = cached.len(), "cache hit");
            self.notifier
                .success(&format!("Found {} cached reviews for {brand}.", cached.len()));
            return Ok(BrandCollection {
                brand: brand.to_string(),
                cached: true,
                reviews: cached.len() as u64,
            });
        }

        self.notifier.info(&format!("Fetching snippets for {brand}..."));
        let mut records = SnippetCollector::new(self.search, self.cancel, self.notifier)
            .with_retry(self.settings.search_retry)
            .with_pacing(self.settings.pacing)
            .with_country(self.settings.country.as_str())
            .collect(product, brand, max_snippets)
            .await;

        if use_fulltext {
            match self.fulltext {
                Some(fetcher) => {
                    for record in &mut records {
                        if self.cancel.is_cancelled() {
                            break;
                        }
                        let text = fetcher.fetch_full_text(&record.link).await;
                        if !text.is_empty() {
                            record.snippet = text;
                        }
                    }
                }
                None => tracing::warn!(brand, "full-text fetch requested but no fetcher configured"),
            }
        }

        // A cut-short batch would read as a cache hit on the next run.
        if self.cancel.is_cancelled() {
            tracing::info!(brand, discarded = records.len(), "collection cancelled, batch not stored");
            self.notifier
                .warning(&format!("Collection for {brand} was cancelled; nothing stored."));
            return Ok(BrandCollection {
                brand: brand.to_string(),
                cached: false,
                reviews: 0,
            });
        }

        let inserted = if records.is_empty() {
            self.notifier
                .warning(&format!("No new snippets found for {brand}."));
            0
        } else {
            let n = self.store.insert_reviews(&records).await?;
            self.notifier
                .success(&format!("Stored {n} new reviews for {brand}."));
            n
        };

        Ok(BrandCollection {
            brand: brand.to_string(),
            cached: false,
            reviews: inserted,
        })
    }

    async fn load_reviews(
        &self,
        product: &str,
        brands: &[String],
    ) -> Result<Vec<StoredReview>, AnalysisError> {
        let mut all = Vec::new();
        for brand in brands {
            all.extend(self.store.fetch_reviews(brand, product).await?);
        }
        Ok(all)
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
