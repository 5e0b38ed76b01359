//! Optional full-page review text fetch.
//!
//! Marketplaces block scrapers often; every failure degrades to an empty
//! string so the caller keeps the search snippet instead.

use std::time::Duration;

use reqwest::Client;
use scraper::{Html, Selector};

const FETCH_TIMEOUT_SECS: u64 = 8;
const MAX_BODY_CHARS: usize = 2_000;

const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/129.0.0.0 Safari/537.36";

const AMAZON_REVIEW_SELECTOR: &str = "div.review-text-content span";
const FLIPKART_REVIEW_SELECTOR: &str = "div._27M-vq div.t-ZTKy > div";

/// Downloads review pages with a browser-like `User-Agent`.
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    /// # Errors
    ///
    /// Returns [`reqwest::Error`] if the HTTP client cannot be built.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .user_agent(BROWSER_UA)
            .build()?;
        Ok(Self { client })
    }

    /// Fetches `link` and extracts review text; `""` on any failure or non-200.
    pub async fn fetch_full_text(&self, link: &str) -> String {
        let response = match self
            .client
            .get(link)
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(link, error = %e, "full-text fetch failed");
                return String::new();
            }
        };

        if response.status() != reqwest::StatusCode::OK {
            tracing::debug!(link, status = %response.status(), "full-text fetch skipped");
            return String::new();
        }

        match response.text().await {
            Ok(html) => extract_review_text(link, &html),
            Err(e) => {
                tracing::debug!(link, error = %e, "full-text body read failed");
                String::new()
            }
        }
    }
}

/// Extracts review text from a downloaded page.
///
/// Amazon and Flipkart pages use their review-body selectors; when those
/// match nothing, or for any other site, the page body text is returned,
/// cropped to 2000 characters.
#[must_use]
pub fn extract_review_text(link: &str, html: &str) -> String {
    let document = Html::parse_document(html);

    let marketplace_selector = if link.contains("amazon.") {
        Some(AMAZON_REVIEW_SELECTOR)
    } else if link.contains("flipkart.") {
        Some(FLIPKART_REVIEW_SELECTOR)
    } else {
        None
    };

    if let Some(selector) = marketplace_selector.and_then(|s| Selector::parse(s).ok()) {
        let blocks: Vec<String> = document
            .select(&selector)
            .map(|el| collapse(el.text()))
            .filter(|t| !t.is_empty())
            .collect();
        if !blocks.is_empty() {
            return blocks.join("\n");
        }
    }

    let body_text = match Selector::parse("body") {
        Ok(body) => document
            .select(&body)
            .next()
            .map(|el| lines(el.text()))
            .unwrap_or_default(),
        Err(_) => String::new(),
    };
    body_text.chars().take(MAX_BODY_CHARS).collect()
}

fn collapse<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts.map(str::trim).collect::<String>()
}

fn lines<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
