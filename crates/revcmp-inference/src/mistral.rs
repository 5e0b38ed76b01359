//! Minimal Mistral chat-completions client for single-turn questions.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};

use crate::error::InferenceError;

const DEFAULT_BASE_URL: &str = "https://api.mistral.ai/";
const SERVICE: &str = "mistral";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

pub struct MistralClient {
    client: Client,
    api_key: String,
    model: String,
    endpoint: Url,
}

impl MistralClient {
    /// # Errors
    ///
    /// Returns [`InferenceError::MissingApiKey`] without a key, or
    /// [`InferenceError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: Option<&str>, model: &str, timeout_secs: u64) -> Result<Self, InferenceError> {
        Self::with_base_url(api_key, model, timeout_secs, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// See [`MistralClient::new`]; also [`InferenceError::InvalidBaseUrl`].
    pub fn with_base_url(
        api_key: Option<&str>,
        model: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, InferenceError> {
        let api_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(InferenceError::MissingApiKey("MISTRAL_API_KEY"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&normalised)
            .and_then(|u| u.join("v1/chat/completions"))
            .map_err(|e| InferenceError::InvalidBaseUrl(format!("'{base_url}': {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            model: model.to_owned(),
            endpoint,
        })
    }

    /// Sends `prompt` as a single user message and returns the trimmed reply.
    ///
    /// # Errors
    ///
    /// - [`InferenceError::RateLimited`] on HTTP 429.
    /// - [`InferenceError::Status`] on other non-2xx statuses.
    /// - [`InferenceError::EmptyResponse`] when no choice carries content.
    /// - [`InferenceError::Http`] / [`InferenceError::Deserialize`] otherwise.
    pub async fn ask(&self, prompt: &str) -> Result<String, InferenceError> {
        tracing::debug!(model = %self.model, "mistral chat request");

        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
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

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| InferenceError::Deserialize {
                context: "chat completion".to_string(),
                source: e,
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .ok_or(InferenceError::EmptyResponse { service: SERVICE })
    }
}
