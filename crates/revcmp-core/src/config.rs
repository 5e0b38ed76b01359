use crate::app_config::{AppConfig, Environment};
use crate::policy::{PacingPolicy, RetryPolicy};
use crate::ConfigError;

/// Upper bound for any configured backoff or jitter, in seconds.
const MAX_DELAY_SECS: f64 = 3_600.0;
const DEFAULT_DATABASE_URL: &str = "sqlite://reviews.db?mode=rwc";
const DEFAULT_HF_MODEL: &str = "cardiffnlp/twitter-xlm-roberta-base-sentiment";
const DEFAULT_MISTRAL_MODEL: &str = "mistral-small-latest";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` if a value is present but invalid.
pub fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    // Empty strings count as unset so `.env` templates with `KEY=` behave.
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_secs = |var: &str, default: &str| -> Result<f64, ConfigError> {
        let value = or_default(var, default)
            .parse::<f64>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if !value.is_finite() || !(0.0..=MAX_DELAY_SECS).contains(&value) {
            return Err(invalid(
                var,
                format!("expected a number of seconds in 0..={MAX_DELAY_SECS}, got {value}"),
            ));
        }
        Ok(value)
    };

    let retry = |prefix: &str, defaults: RetryPolicy| -> Result<RetryPolicy, ConfigError> {
        let attempts_var = format!("{prefix}_MAX_ATTEMPTS");
        let max_attempts = parse_u32(&attempts_var, &defaults.max_attempts.to_string())?;
        if max_attempts == 0 {
            return Err(invalid(&attempts_var, "must be at least 1".to_string()));
        }
        Ok(RetryPolicy::new(
            max_attempts,
            parse_secs(
                &format!("{prefix}_BACKOFF_BASE_SECS"),
                &defaults.base_delay_secs.to_string(),
            )?,
            parse_secs(
                &format!("{prefix}_JITTER_MAX_SECS"),
                &defaults.jitter_max_secs.to_string(),
            )?,
        ))
    };

    let database_url = or_default("DATABASE_URL", DEFAULT_DATABASE_URL);
    let env = parse_environment(&or_default("REVCMP_ENV", "development"))?;

    let bind_addr = or_default("REVCMP_BIND_ADDR", "127.0.0.1:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("REVCMP_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("REVCMP_LOG_LEVEL", "info");

    let serpapi_api_key = optional("SERPAPI_API_KEY");
    let mistral_api_key = optional("MISTRAL_API_KEY");
    let hf_api_token = optional("HF_API_TOKEN");
    let hf_model = or_default("REVCMP_HF_MODEL", DEFAULT_HF_MODEL);
    let mistral_model = or_default("REVCMP_MISTRAL_MODEL", DEFAULT_MISTRAL_MODEL);
    let search_country = or_default("REVCMP_SEARCH_COUNTRY", "in");

    let request_timeout_secs = parse_u64("REVCMP_REQUEST_TIMEOUT_SECS", "30")?;
    let default_max_snippets = parse_usize("REVCMP_DEFAULT_MAX_SNIPPETS", "30")?;

    let defaults = PacingPolicy::default();
    let pacing = PacingPolicy::new(
        parse_u64("REVCMP_PACING_MIN_MS", &defaults.min_ms.to_string())?,
        parse_u64("REVCMP_PACING_MAX_MS", &defaults.max_ms.to_string())?,
    );
    if pacing.min_ms > pacing.max_ms {
        return Err(invalid(
            "REVCMP_PACING_MIN_MS",
            format!(
                "must not exceed REVCMP_PACING_MAX_MS ({} > {})",
                pacing.min_ms, pacing.max_ms
            ),
        ));
    }

    let search_retry = retry("REVCMP_SEARCH", RetryPolicy::search())?;
    let inference_retry = retry("REVCMP_INFERENCE", RetryPolicy::inference())?;
    let llm_retry = retry("REVCMP_LLM", RetryPolicy::llm())?;

    let db_max_connections = parse_u32("REVCMP_DB_MAX_CONNECTIONS", "5")?;
    let db_min_connections = parse_u32("REVCMP_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("REVCMP_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        serpapi_api_key,
        mistral_api_key,
        hf_api_token,
        hf_model,
        mistral_model,
        search_country,
        request_timeout_secs,
        default_max_snippets,
        pacing,
        search_retry,
        inference_retry,
        llm_retry,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "REVCMP_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
