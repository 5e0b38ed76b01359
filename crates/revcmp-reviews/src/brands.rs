//! Brand inference: mine capitalised tokens from a broad product search and
//! keep the ones an LLM confirms are brand names.

use std::collections::HashSet;

use revcmp_core::{Notifier, Query, RetryPolicy, SearchResult};
use revcmp_inference::InferenceError;
use revcmp_search::SearchError;

use crate::backends::{LlmClient, SearchBackend};
use crate::cancel::CancelFlag;
use crate::retry::{self, RetryOutcome};

/// Brands confirmed per inference run unless the caller asks otherwise.
pub const DEFAULT_TOP_K: usize = 5;

const DISCOVERY_RESULTS: u32 = 20;
const MAX_CANDIDATES: usize = 15;
const TRIM_CHARS: &[char] = &['.', ',', '!', '?', ':', ';', '(', ')', '[', ']', '{', '}'];

const STOP_WORDS: &[&str] = &[
    "the", "best", "review", "reviews", "for", "and", "with", "top", "new", "guide", "bluetooth",
    "wireless", "wired", "headphone", "headphones", "earbuds", "earphone", "earphones", "audio",
    "sound", "bass", "noise", "cancelling", "tested", "pro", "plus", "ultra", "max", "edition",
];

/// Title-case test: every cased run starts with an uppercase letter and
/// continues in lowercase, and at least one cased letter exists.
/// `Sony` and `Jbl-Tune` pass; `JBL`, `boat` and `1080` do not.
fn is_title_case(word: &str) -> bool {
    let mut previous_cased = false;
    let mut any_cased = false;
    for c in word.chars() {
        if c.is_uppercase() {
            if previous_cased {
                return false;
            }
            previous_cased = true;
            any_cased = true;
        } else if c.is_lowercase() {
            if !previous_cased {
                return false;
            }
            previous_cased = true;
            any_cased = true;
        } else {
            previous_cased = false;
        }
    }
    any_cased
}

/// Ranks brand-like tokens from search results by frequency.
///
/// Ties keep the order in which tokens were first seen. At most 15
/// candidates are returned.
#[must_use]
pub fn candidate_tokens(product: &str, items: &[SearchResult]) -> Vec<String> {
    let product_words: HashSet<String> =
        product.split_whitespace().map(str::to_lowercase).collect();

    let mut counts: Vec<(String, usize)> = Vec::new();
    for item in items {
        let text = format!("{} {}", item.title.as_deref().unwrap_or_default(), item.snippet);
        for raw in text.split_whitespace() {
            let token = raw.trim_matches(TRIM_CHARS);
            if token.chars().count() <= 2 || !is_title_case(token) {
                continue;
            }
            let lower = token.to_lowercase();
            if STOP_WORDS.contains(&lower.as_str()) || product_words.contains(&lower) {
                continue;
            }
            match counts.iter_mut().find(|(t, _)| t == token) {
                Some((_, n)) => *n += 1,
                None => counts.push((token.to_string(), 1)),
            }
        }
    }

    // Stable sort keeps first-seen order among equal counts.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
        .into_iter()
        .take(MAX_CANDIDATES)
        .map(|(token, _)| token)
        .collect()
}

#[must_use]
pub fn brand_prompt(product: &str, candidate: &str) -> String {
    format!(
        "In the context of {product}, is the word '{candidate}' a brand name? \
         Answer with only 'yes' or 'no'."
    )
}

/// Guesses which brands to compare for a product.
pub struct BrandInferrer<'a> {
    search: &'a dyn SearchBackend,
    llm: &'a dyn LlmClient,
    search_retry: RetryPolicy,
    llm_retry: RetryPolicy,
    country: String,
    cancel: &'a CancelFlag,
    notifier: &'a dyn Notifier,
}

impl<'a> BrandInferrer<'a> {
    pub fn new(
        search: &'a dyn SearchBackend,
        llm: &'a dyn LlmClient,
        cancel: &'a CancelFlag,
        notifier: &'a dyn Notifier,
    ) -> Self {
        Self {
            search,
            llm,
            search_retry: RetryPolicy::search(),
            llm_retry: RetryPolicy::llm(),
            country: "in".to_string(),
            cancel,
            notifier,
        }
    }

    #[must_use]
    pub fn with_retry(mut self, search_retry: RetryPolicy, llm_retry: RetryPolicy) -> Self {
        self.search_retry = search_retry;
        self.llm_retry = llm_retry;
        self
    }

    #[must_use]
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    /// Returns up to `top_k` confirmed brands, in candidate rank order.
    ///
    /// A failed discovery search yields no brands. A failed LLM check counts
    /// as "not a brand" for that candidate.
    pub async fn infer(&self, product: &str, top_k: usize) -> Vec<String> {
        self.notifier.info("Inferring brands from search results...");

        let query = Query::new(format!("{product} reviews"), DISCOVERY_RESULTS, self.country.as_str());
        let outcome = retry::call(
            "brand discovery search",
            &self.search_retry,
            SearchError::is_transient,
            self.cancel,
            self.notifier,
            || self.search.search(&query),
        )
        .await;
        let Some(items) = outcome.ok() else {
            return Vec::new();
        };

        let candidates = candidate_tokens(product, &items);
        tracing::info!(product, ?candidates, "brand candidates");
        self.notifier.info(&format!(
            "Generated candidates: {}. Verifying with LLM...",
            candidates.join(", ")
        ));

        let mut confirmed = Vec::new();
        for candidate in candidates {
            if confirmed.len() >= top_k {
                break;
            }
            if self.cancel.is_cancelled() {
                tracing::info!(product, "brand verification cancelled");
                break;
            }
            if self.confirm(product, &candidate).await {
                confirmed.push(candidate);
            }
        }
        confirmed
    }

    async fn confirm(&self, product: &str, candidate: &str) -> bool {
        let prompt = brand_prompt(product, candidate);
        let what = format!("brand check '{candidate}'");
        let outcome = retry::call(
            &what,
            &self.llm_retry,
            InferenceError::is_transient,
            self.cancel,
            self.notifier,
            || self.llm.ask(&prompt),
        )
        .await;

        match outcome {
            RetryOutcome::Success(answer) => {
                let yes = answer.to_lowercase().contains("yes");
                tracing::debug!(candidate, answer = %answer, yes, "brand check");
                yes
            }
            RetryOutcome::ExhaustedRetries | RetryOutcome::Fatal(_) | RetryOutcome::Cancelled => {
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{item, RecordingNotifier, ScriptedLlm, ScriptedSearch};

    #[test]
    fn title_case_follows_cased_runs() {
        assert!(is_title_case("Sony"));
        assert!(is_title_case("Jbl-Tune"));
        assert!(is_title_case("O'Neill"));
        assert!(is_title_case("Sony5"));
        assert!(!is_title_case("JBL"));
        assert!(!is_title_case("boAt"));
        assert!(!is_title_case("boat"));
        assert!(!is_title_case("1080"));
        assert!(!is_title_case("Boat's"));
    }

    #[test]
    fn candidates_filter_and_rank() {
        let items = vec![
            item("Best Sony Headphones 2024", "Sony and Boat compared. The JBL is loud.", "l1"),
            item("Boat Rockerz review", "Boat, Sony, Noise... Apple?", "l2"),
            item("Top Picks", "Sennheiser (Momentum) is great", "l3"),
        ];
        let candidates = candidate_tokens("Headphones", &items);
        assert_eq!(
            candidates,
            vec!["Sony", "Boat", "Rockerz", "Apple", "Picks", "Sennheiser", "Momentum"]
        );
    }

    #[test]
    fn candidates_cap_at_fifteen() {
        let words: Vec<String> = (0..20)
            .map(|i| format!("Brand{}", char::from(b'a' + i)))
            .collect();
        let items = vec![item("", &words.join(" "), "l")];
        assert_eq!(candidate_tokens("tv", &items).len(), 15);
    }

    #[test]
    fn prompt_wording() {
        assert_eq!(
            brand_prompt("headphones", "Sony"),
            "In the context of headphones, is the word 'Sony' a brand name? Answer with only 'yes' or 'no'."
        );
    }

    #[tokio::test]
    async fn infer_keeps_llm_confirmed_candidates() {
        let search = ScriptedSearch::default().respond(
            "headphones reviews",
            Ok(vec![
                item("Sony WH review", "Sony beats Boat on comfort", "l1"),
                item("Boat Rockerz", "Boat budget pick, Great value", "l2"),
            ]),
        );
        let llm = ScriptedLlm::knowing(&["Sony", "Boat"]);
        let cancel = CancelFlag::new();
        let notifier = RecordingNotifier::default();

        let brands = BrandInferrer::new(&search, &llm, &cancel, &notifier)
            .with_retry(RetryPolicy::new(1, 0.0, 0.0), RetryPolicy::new(1, 0.0, 0.0))
            .infer("headphones", DEFAULT_TOP_K)
            .await;

        assert_eq!(brands, vec!["Boat", "Sony"]);
        assert_eq!(search.issued(), vec!["headphones reviews".to_string()]);
    }

    #[tokio::test]
    async fn infer_stops_at_top_k() {
        let search = ScriptedSearch::default().respond(
            "tv reviews",
            Ok(vec![item("Samsung Sony Panasonic", "", "l1")]),
        );
        let llm = ScriptedLlm::knowing(&["Samsung", "Sony", "Panasonic"]);
        let cancel = CancelFlag::new();
        let notifier = RecordingNotifier::default();

        let brands = BrandInferrer::new(&search, &llm, &cancel, &notifier)
            .infer("tv", 2)
            .await;

        assert_eq!(brands, vec!["Samsung", "Sony"]);
        assert_eq!(llm.prompts.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failed_discovery_search_yields_no_brands() {
        let search = ScriptedSearch::default().respond(
            "tv reviews",
            Err(SearchError::Status {
                status: 401,
                body: String::new(),
            }),
        );
        let llm = ScriptedLlm::knowing(&["Sony"]);
        let cancel = CancelFlag::new();
        let notifier = RecordingNotifier::default();

        let brands = BrandInferrer::new(&search, &llm, &cancel, &notifier)
            .infer("tv", 5)
            .await;

        assert!(brands.is_empty());
        assert!(llm.prompts.lock().unwrap().is_empty());
    }
}
