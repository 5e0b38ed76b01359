use thiserror::Error;

use revcmp_core::mentions_overload;

/// Errors returned by the `SerpAPI` client.
#[derive(Debug, Error)]
pub enum SearchError {
    /// No API key was configured; raised when the client is constructed.
    #[error("SERPAPI_API_KEY is not set")]
    MissingApiKey,

    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The configured base URL could not be parsed.
    #[error("invalid search base URL: {0}")]
    InvalidBaseUrl(String),

    /// HTTP 429 from the search API.
    #[error("search API rate limited (HTTP 429)")]
    RateLimited,

    /// Any other non-2xx status.
    #[error("search API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be parsed as JSON.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl SearchError {
    /// Returns `true` for backend overload: rate limiting or exhausted capacity.
    ///
    /// Structured signals (status codes) are checked first; error text is
    /// only consulted for variants that carry no status.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            SearchError::RateLimited => true,
            SearchError::Status { status, body } => {
                *status == 429 || *status == 503 || mentions_overload(body)
            }
            SearchError::Http(e) => match e.status() {
                Some(status) => status.as_u16() == 429 || status.as_u16() == 503,
                None => mentions_overload(&e.to_string()),
            },
            SearchError::MissingApiKey
            | SearchError::InvalidBaseUrl(_)
            | SearchError::Deserialize { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_is_transient() {
        assert!(SearchError::RateLimited.is_transient());
    }

    #[test]
    fn service_unavailable_is_transient() {
        let err = SearchError::Status {
            status: 503,
            body: String::new(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn capacity_message_is_transient() {
        let err = SearchError::Status {
            status: 400,
            body: "{\"error\":\"Search capacity exceeded\"}".to_string(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn unauthorized_is_fatal() {
        let err = SearchError::Status {
            status: 401,
            body: "{\"error\":\"Invalid API key\"}".to_string(),
        };
        assert!(!err.is_transient());
    }

    #[test]
    fn missing_key_and_bad_json_are_fatal() {
        assert!(!SearchError::MissingApiKey.is_transient());
        let source = serde_json::from_str::<()>("nope").unwrap_err();
        let err = SearchError::Deserialize {
            context: "test".to_string(),
            source,
        };
        assert!(!err.is_transient());
    }
}
