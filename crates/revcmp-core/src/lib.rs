pub mod app_config;
pub mod config;
pub mod export;
pub mod notify;
pub mod policy;
pub mod reviews;
pub mod store;

pub use app_config::{AppConfig, Environment};
pub use config::{build_app_config, load_app_config, load_app_config_from_env};
pub use export::reviews_to_csv;
pub use notify::{Notice, NoticeLevel, Notifier, TracingNotifier};
pub use policy::{mentions_overload, PacingPolicy, RetryPolicy};
pub use reviews::{
    LabelCount, Query, ReviewRecord, SearchResult, StoredReview, SNIPPET_SOURCE, UNKNOWN_LABEL,
};
pub use store::{ReviewStore, StoreError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
