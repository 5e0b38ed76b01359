//! Retrying wrapper for calls to rate-limited external services.
//!
//! [`call`] runs an operation up to `policy.attempts()` times. Errors the
//! caller-supplied predicate marks transient are retried after a linear
//! backoff with jitter; anything else ends the call at once. Outcomes are
//! values, never panics, so a failed unit of work can be skipped by the
//! caller without aborting the surrounding loop.

use std::fmt::Display;
use std::future::Future;

use revcmp_core::{Notifier, RetryPolicy};

use crate::cancel::CancelFlag;

/// Result of a retried call.
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    Success(T),
    /// Every attempt failed with a transient error.
    ExhaustedRetries,
    /// A non-transient error ended the call on the attempt it occurred.
    Fatal(E),
    /// The cancel flag was raised before the next attempt.
    Cancelled,
}

impl<T, E> RetryOutcome<T, E> {
    /// The success value, discarding any failure detail.
    pub fn ok(self) -> Option<T> {
        match self {
            RetryOutcome::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryOutcome::Cancelled)
    }
}

/// Runs `operation` under `policy`.
///
/// `what` names the unit of work in logs and notices (for example
/// `"search 'headphones Boat reviews'"`).
///
/// - Success returns immediately.
/// - A fatal error is logged, reported, and returned as
///   [`RetryOutcome::Fatal`] without sleeping.
/// - A transient error with attempts left sleeps
///   `base * attempt + jitter` and tries again; with none left the call
///   yields [`RetryOutcome::ExhaustedRetries`].
/// - `cancel` is checked before the first attempt and before every retry
///   sleep.
pub async fn call<T, E, F, Fut, P>(
    what: &str,
    policy: &RetryPolicy,
    is_transient: P,
    cancel: &CancelFlag,
    notifier: &dyn Notifier,
    mut operation: F,
) -> RetryOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = policy.attempts();

    for attempt in 1..=max_attempts {
        if cancel.is_cancelled() {
            tracing::info!(what, attempt, "call cancelled");
            return RetryOutcome::Cancelled;
        }

        let err = match operation().await {
            Ok(value) => return RetryOutcome::Success(value),
            Err(err) => err,
        };

        if !is_transient(&err) {
            tracing::error!(what, attempt, error = %err, "non-retryable error");
            notifier.error(&format!("{what} failed: {err}"));
            return RetryOutcome::Fatal(err);
        }

        if attempt == max_attempts {
            tracing::error!(what, attempts = max_attempts, error = %err, "retries exhausted");
            notifier.error(&format!("{what}: giving up after {max_attempts} attempts"));
            break;
        }

        if cancel.is_cancelled() {
            tracing::info!(what, attempt, "call cancelled before retry");
            return RetryOutcome::Cancelled;
        }

        let delay = policy.delay_for(attempt, rand::random::<f64>());
        #[allow(clippy::cast_possible_truncation)]
        let delay_ms = delay.as_millis() as u64;
        tracing::warn!(
            what,
            attempt,
            max_attempts,
            delay_ms,
            error = %err,
            "transient error, backing off"
        );
        notifier.warning(&format!(
            "{what}: service busy, retrying in {:.1}s (attempt {attempt}/{max_attempts})",
            delay.as_secs_f64()
        ));
        tokio::time::sleep(delay).await;
    }

    RetryOutcome::ExhaustedRetries
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    use revcmp_core::{Notice, NoticeLevel};

    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Notice>>);

    impl Notifier for Recorder {
        fn notify(&self, notice: Notice) {
            self.0.lock().unwrap().push(notice);
        }
    }

    impl Recorder {
        fn levels(&self) -> Vec<NoticeLevel> {
            self.0.lock().unwrap().iter().map(|n| n.level).collect()
        }
    }

    #[derive(Debug)]
    enum TestError {
        Busy,
        Broken,
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                TestError::Busy => f.write_str("429 busy"),
                TestError::Broken => f.write_str("broken"),
            }
        }
    }

    fn busy(e: &TestError) -> bool {
        matches!(e, TestError::Busy)
    }

    fn instant(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, 0.0, 0.0)
    }

    #[tokio::test]
    async fn always_transient_exhausts_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let notifier = Recorder::default();
        let c = Arc::clone(&calls);

        let outcome: RetryOutcome<(), TestError> = call(
            "op",
            &instant(3),
            busy,
            &CancelFlag::new(),
            &notifier,
            || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(TestError::Busy)
                }
            },
        )
        .await;

        assert!(matches!(outcome, RetryOutcome::ExhaustedRetries));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            notifier.levels(),
            vec![NoticeLevel::Warning, NoticeLevel::Warning, NoticeLevel::Error]
        );
    }

    #[tokio::test]
    async fn fatal_error_stops_after_one_call() {
        let calls = Arc::new(AtomicU32::new(0));
        let notifier = Recorder::default();
        let c = Arc::clone(&calls);

        // A large base delay would hang the test if a sleep happened.
        let policy = RetryPolicy::new(3, 3_600.0, 0.0);
        let outcome: RetryOutcome<(), TestError> =
            call("op", &policy, busy, &CancelFlag::new(), &notifier, || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(TestError::Broken)
                }
            })
            .await;

        assert!(matches!(outcome, RetryOutcome::Fatal(TestError::Broken)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.levels(), vec![NoticeLevel::Error]);
    }

    #[tokio::test]
    async fn transient_then_success_short_circuits() {
        let calls = Arc::new(AtomicU32::new(0));
        let notifier = Recorder::default();
        let c = Arc::clone(&calls);

        let outcome = call(
            "op",
            &instant(5),
            busy,
            &CancelFlag::new(),
            &notifier,
            || {
                let c = Arc::clone(&c);
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(TestError::Busy)
                    } else {
                        Ok("done")
                    }
                }
            },
        )
        .await;

        assert!(matches!(outcome, RetryOutcome::Success("done")));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn zero_attempts_still_calls_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);

        let outcome: RetryOutcome<(), TestError> = call(
            "op",
            &instant(0),
            busy,
            &CancelFlag::new(),
            &Recorder::default(),
            || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(TestError::Busy)
                }
            },
        )
        .await;

        assert!(matches!(outcome, RetryOutcome::ExhaustedRetries));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancel_before_retry_stops_further_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let cancel = CancelFlag::new();
        let c = Arc::clone(&calls);
        let flag = cancel.clone();

        let outcome: RetryOutcome<(), TestError> = call(
            "op",
            &instant(5),
            busy,
            &cancel,
            &Recorder::default(),
            || {
                let c = Arc::clone(&c);
                let flag = flag.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    flag.cancel();
                    Err(TestError::Busy)
                }
            },
        )
        .await;

        assert!(outcome.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn raised_flag_skips_the_call_entirely() {
        let calls = Arc::new(AtomicU32::new(0));
        let cancel = CancelFlag::new();
        cancel.cancel();
        let c = Arc::clone(&calls);

        let outcome: RetryOutcome<(), TestError> = call(
            "op",
            &instant(3),
            busy,
            &cancel,
            &Recorder::default(),
            || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
        )
        .await;

        assert!(outcome.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
