use std::net::SocketAddr;

use crate::policy::{PacingPolicy, RetryPolicy};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub serpapi_api_key: Option<String>,
    pub mistral_api_key: Option<String>,
    pub hf_api_token: Option<String>,
    pub hf_model: String,
    pub mistral_model: String,
    pub search_country: String,
    pub request_timeout_secs: u64,
    pub default_max_snippets: usize,
    pub pacing: PacingPolicy,
    pub search_retry: RetryPolicy,
    pub inference_retry: RetryPolicy,
    pub llm_retry: RetryPolicy,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &self.database_url)
            .field(
                "serpapi_api_key",
                &self.serpapi_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "mistral_api_key",
                &self.mistral_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "hf_api_token",
                &self.hf_api_token.as_ref().map(|_| "[redacted]"),
            )
            .field("hf_model", &self.hf_model)
            .field("mistral_model", &self.mistral_model)
            .field("search_country", &self.search_country)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("default_max_snippets", &self.default_max_snippets)
            .field("pacing", &self.pacing)
            .field("search_retry", &self.search_retry)
            .field("inference_retry", &self.inference_retry)
            .field("llm_retry", &self.llm_retry)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}
