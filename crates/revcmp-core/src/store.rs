//! Persistence seam used by the analysis pipeline.

use async_trait::async_trait;
use thiserror::Error;

use crate::reviews::{ReviewRecord, StoredReview};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("review store failure: {0}")]
    Backend(String),
}

/// Stores collected reviews and their sentiment labels.
///
/// Implementations are accessed sequentially by one analysis at a time.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Persist a batch of freshly collected records; returns rows written.
    async fn insert_reviews(&self, records: &[ReviewRecord]) -> Result<u64, StoreError>;

    /// All stored reviews for `(brand, product)`, oldest first.
    async fn fetch_reviews(&self, brand: &str, product: &str)
        -> Result<Vec<StoredReview>, StoreError>;

    /// Set the sentiment label of one stored review.
    async fn update_label(&self, id: i64, label: &str) -> Result<(), StoreError>;
}
