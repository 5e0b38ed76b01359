//! Sentiment classification via the Hugging Face inference API.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use revcmp_core::UNKNOWN_LABEL;

use crate::error::InferenceError;

const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co/";
const SERVICE: &str = "huggingface";

/// Input longer than this many characters is truncated before submission.
pub const MAX_INPUT_CHARS: usize = 512;

#[derive(Serialize)]
struct ClassifyRequest<'a> {
    inputs: &'a str,
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

/// Text-classification client for one hosted model.
pub struct HfClassifier {
    client: Client,
    token: String,
    endpoint: Url,
}

impl HfClassifier {
    /// # Errors
    ///
    /// Returns [`InferenceError::MissingApiKey`] without a token, or
    /// [`InferenceError::Http`] if the HTTP client cannot be built.
    pub fn new(token: Option<&str>, model: &str, timeout_secs: u64) -> Result<Self, InferenceError> {
        Self::with_base_url(token, model, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a classifier against a custom host (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// See [`HfClassifier::new`]; also [`InferenceError::InvalidBaseUrl`].
    pub fn with_base_url(
        token: Option<&str>,
        model: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, InferenceError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(InferenceError::MissingApiKey("HF_API_TOKEN"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&normalised)
            .and_then(|u| u.join(&format!("models/{}", model.trim_matches('/'))))
            .map_err(|e| InferenceError::InvalidBaseUrl(format!("'{base_url}': {e}")))?;

        Ok(Self {
            client,
            token: token.to_owned(),
            endpoint,
        })
    }

    /// Returns the top-scoring label for `text`.
    ///
    /// Empty or whitespace-only text yields [`UNKNOWN_LABEL`] without a
    /// request. Longer text is truncated to [`MAX_INPUT_CHARS`] characters.
    ///
    /// # Errors
    ///
    /// - [`InferenceError::RateLimited`] on HTTP 429.
    /// - [`InferenceError::Status`] on other non-2xx statuses (503 while the
    ///   model loads).
    /// - [`InferenceError::Http`] / [`InferenceError::Deserialize`] on
    ///   transport or body failures.
    pub async fn classify(&self, text: &str) -> Result<String, InferenceError> {
        if text.trim().is_empty() {
            return Ok(UNKNOWN_LABEL.to_string());
        }
        let input: String = text.chars().take(MAX_INPUT_CHARS).collect();

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.token)
            .json(&ClassifyRequest { inputs: &input })
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(InferenceError::RateLimited { service: SERVICE });
        }
        let body = response.text().await?;
        if !status.is_success() {
            return Err(InferenceError::Status {
                service: SERVICE,
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = serde_json::from_str(&body).map_err(|e| InferenceError::Deserialize {
            context: "classification response".to_string(),
            source: e,
        })?;
        top_label(payload)
    }
}

/// Picks the highest-scoring label from either `[[{label, score}]]` or
/// `[{label, score}]`. An empty list yields [`UNKNOWN_LABEL`].
fn top_label(payload: Value) -> Result<String, InferenceError> {
    let scores = match payload {
        Value::Array(mut outer) if matches!(outer.first(), Some(Value::Array(_))) => {
            outer.swap_remove(0)
        }
        other => other,
    };

    let scores: Vec<LabelScore> =
        serde_json::from_value(scores).map_err(|e| InferenceError::Deserialize {
            context: "classification scores".to_string(),
            source: e,
        })?;

    Ok(scores
        .into_iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .map_or_else(|| UNKNOWN_LABEL.to_string(), |s| s.label))
}
