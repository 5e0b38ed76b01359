//! HTTP client for the `SerpAPI` Google search endpoint.
//!
//! Wraps `reqwest` with API key management, status-code classification
//! (429 becomes [`SearchError::RateLimited`]) and extraction of organic
//! results into [`SearchResult`]s.

use std::time::Duration;

use reqwest::{Client, Url};
use serde_json::Value;

use revcmp_core::{Query, SearchResult};

use crate::error::SearchError;

const DEFAULT_BASE_URL: &str = "https://serpapi.com/";

/// Results requested per collection query.
pub const DEFAULT_RESULTS_PER_QUERY: u32 = 10;

/// Client for the `SerpAPI` search endpoint.
///
/// Use [`SerpApiClient::new`] for production or
/// [`SerpApiClient::with_base_url`] to point at a mock server in tests.
pub struct SerpApiClient {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl SerpApiClient {
    /// Creates a client pointed at the production `SerpAPI` host.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::MissingApiKey`] if `api_key` is absent or blank,
    /// or [`SearchError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(api_key: Option<&str>, timeout_secs: u64) -> Result<Self, SearchError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::MissingApiKey`] if `api_key` is absent or blank,
    /// [`SearchError::Http`] if the `reqwest::Client` cannot be built, or
    /// [`SearchError::InvalidBaseUrl`] if `base_url` is not a valid URL.
    pub fn with_base_url(
        api_key: Option<&str>,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, SearchError> {
        let api_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(SearchError::MissingApiKey)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("revcmp/0.1 (review-comparison)")
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised)
            .and_then(|u| u.join("search.json"))
            .map_err(|e| SearchError::InvalidBaseUrl(format!("'{base_url}': {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
        })
    }

    /// Runs one Google search and returns the raw JSON payload.
    ///
    /// # Errors
    ///
    /// - [`SearchError::RateLimited`] on HTTP 429.
    /// - [`SearchError::Status`] on any other non-2xx status.
    /// - [`SearchError::Http`] on network failure.
    /// - [`SearchError::Deserialize`] if the body is not JSON.
    pub async fn search(&self, query: &Query) -> Result<Value, SearchError> {
        let url = self.build_url(query);
        tracing::debug!(query = query.text(), num = query.result_count(), "serpapi search");

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SearchError::RateLimited);
        }
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SearchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = serde_json::from_str(&body).map_err(|e| SearchError::Deserialize {
            context: format!("search(q={})", query.text()),
            source: e,
        })?;

        // SerpAPI reports "no results" as an `error` field on a 200 response.
        if let Some(message) = payload.get("error").and_then(Value::as_str) {
            tracing::debug!(query = query.text(), message, "serpapi returned no organic results");
        }

        Ok(payload)
    }

    /// Runs one search and extracts its organic results.
    ///
    /// # Errors
    ///
    /// See [`SerpApiClient::search`].
    pub async fn search_items(&self, query: &Query) -> Result<Vec<SearchResult>, SearchError> {
        let payload = self.search(query).await?;
        Ok(extract_items(&payload))
    }

    fn build_url(&self, query: &Query) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("engine", "google");
            pairs.append_pair("q", query.text());
            pairs.append_pair("hl", "en");
            pairs.append_pair("gl", query.country());
            pairs.append_pair("num", &query.result_count().to_string());
            pairs.append_pair("api_key", &self.api_key);
        }
        url
    }
}

/// Collects `(title, snippet, link)` from `organic_results`.
///
/// The snippet falls back to `rich_snippet.top.query_preview`, then to `""`.
/// Missing links are kept as `None`; callers decide whether to use them.
#[must_use]
pub fn extract_items(results: &Value) -> Vec<SearchResult> {
    let Some(organic) = results.get("organic_results").and_then(Value::as_array) else {
        return Vec::new();
    };

    organic
        .iter()
        .map(|r| {
            let title = r.get("title").and_then(Value::as_str).map(str::to_owned);
            let snippet = r
                .get("snippet")
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .or_else(|| {
                    r.pointer("/rich_snippet/top/query_preview")
                        .and_then(Value::as_str)
                })
                .unwrap_or_default()
                .to_owned();
            let link = r.get("link").and_then(Value::as_str).map(str::to_owned);
            SearchResult {
                title,
                snippet,
                link,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn test_client(base_url: &str) -> SerpApiClient {
        SerpApiClient::with_base_url(Some("test-key"), 30, base_url)
            .expect("client construction should not fail")
    }

    #[test]
    fn missing_api_key_fails_at_construction() {
        assert!(matches!(
            SerpApiClient::new(None, 30),
            Err(SearchError::MissingApiKey)
        ));
        assert!(matches!(
            SerpApiClient::new(Some("  "), 30),
            Err(SearchError::MissingApiKey)
        ));
    }

    #[test]
    fn build_url_constructs_correct_query_string() {
        let client = test_client("https://serpapi.com");
        let url = client.build_url(&Query::new("headphones Boat reviews", 10, "in"));
        assert_eq!(
            url.as_str(),
            "https://serpapi.com/search.json?engine=google&q=headphones+Boat+reviews&hl=en&gl=in&num=10&api_key=test-key"
        );
    }

    #[test]
    fn build_url_encodes_site_operator() {
        let client = test_client("https://serpapi.com/");
        let url = client.build_url(&Query::new("tv LG reviews site:amazon.in", 10, "in"));
        assert!(
            url.as_str().contains("site%3Aamazon.in"),
            "query param should be percent-encoded: {url}"
        );
    }

    #[test]
    fn extract_items_reads_organic_results() {
        let payload = json!({
            "organic_results": [
                {"title": "Boat Rockerz review", "snippet": "Punchy bass", "link": "https://a.example/1"},
                {"title": "No snippet", "rich_snippet": {"top": {"query_preview": "4.1 stars"}}, "link": "https://a.example/2"},
                {"title": "Bare"}
            ]
        });
        let items = extract_items(&payload);
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].snippet, "Punchy bass");
        assert_eq!(items[0].link.as_deref(), Some("https://a.example/1"));
        assert_eq!(items[1].snippet, "4.1 stars");
        assert_eq!(items[2].snippet, "");
        assert_eq!(items[2].link, None);
        assert_eq!(items[2].title.as_deref(), Some("Bare"));
    }

    #[test]
    fn extract_items_handles_missing_organic_results() {
        let payload = json!({"error": "Google hasn't returned any results for this query."});
        assert!(extract_items(&payload).is_empty());
    }
}
