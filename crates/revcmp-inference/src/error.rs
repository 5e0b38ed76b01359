use thiserror::Error;

use revcmp_core::mentions_overload;

/// Errors returned by the inference and LLM clients.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The named credential was not configured.
    #[error("{0} is not set")]
    MissingApiKey(&'static str),

    #[error("invalid inference base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} rate limited (HTTP 429)")]
    RateLimited { service: &'static str },

    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{service} returned an empty response")]
    EmptyResponse { service: &'static str },
}

impl InferenceError {
    /// Returns `true` for backend overload worth retrying.
    ///
    /// HTTP 429 is rate limiting; HTTP 503 is how both backends report a
    /// model that is loading or out of capacity. Error text is consulted
    /// only when no status code is available.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            InferenceError::RateLimited { .. } => true,
            InferenceError::Status { status, body, .. } => {
                *status == 429 || *status == 503 || mentions_overload(body)
            }
            InferenceError::Http(e) => match e.status() {
                Some(status) => status.as_u16() == 429 || status.as_u16() == 503,
                None => mentions_overload(&e.to_string()),
            },
            InferenceError::MissingApiKey(_)
            | InferenceError::InvalidBaseUrl(_)
            | InferenceError::Deserialize { .. }
            | InferenceError::EmptyResponse { .. } => false,
        }
    }
}
