//! Sentiment labeling of stored reviews.

use revcmp_core::{Notifier, RetryPolicy, ReviewStore, StoreError, StoredReview};
use revcmp_inference::InferenceError;

use crate::backends::SentimentClassifier;
use crate::cancel::CancelFlag;
use crate::retry::{self, RetryOutcome};

/// Counts from one labeling pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabelingSummary {
    pub labeled: usize,
    /// Rows left unlabeled after a failed classification; a later run retries them.
    pub failed: usize,
}

/// Classifies every review in `reviews` that has no label yet and writes
/// the label back to `store`.
///
/// Classification failures skip the row. Store failures abort the pass.
///
/// # Errors
///
/// Returns [`StoreError`] if a label cannot be written.
pub async fn label_unlabeled(
    reviews: &[StoredReview],
    classifier: &dyn SentimentClassifier,
    store: &dyn ReviewStore,
    policy: &RetryPolicy,
    cancel: &CancelFlag,
    notifier: &dyn Notifier,
) -> Result<LabelingSummary, StoreError> {
    let pending: Vec<&StoredReview> = reviews.iter().filter(|r| r.label.is_none()).collect();
    if pending.is_empty() {
        notifier.success("Sentiment analysis already complete for this dataset.");
        return Ok(LabelingSummary::default());
    }

    notifier.info(&format!("Running model on {} snippets...", pending.len()));
    let mut summary = LabelingSummary::default();

    for review in pending {
        if cancel.is_cancelled() {
            tracing::info!(labeled = summary.labeled, "labeling cancelled");
            break;
        }

        let what = format!("classify review {}", review.id);
        let outcome = retry::call(
            &what,
            policy,
            InferenceError::is_transient,
            cancel,
            notifier,
            || classifier.classify(&review.snippet),
        )
        .await;

        match outcome {
            RetryOutcome::Success(label) => {
                store.update_label(review.id, &label).await?;
                summary.labeled += 1;
            }
            RetryOutcome::Cancelled => break,
            RetryOutcome::ExhaustedRetries | RetryOutcome::Fatal(_) => {
                tracing::warn!(review_id = review.id, "review left unlabeled");
                summary.failed += 1;
            }
        }
    }

    tracing::info!(labeled = summary.labeled, failed = summary.failed, "labeling pass done");
    if summary.labeled > 0 {
        notifier.success("Updated DB with sentiment predictions.");
    }
    Ok(summary)
}
