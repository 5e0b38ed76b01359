//! Backoff and pacing parameters for calls to external services.
//!
//! These are plain data: the retry loop itself lives in `revcmp-reviews`.
//! Each call site (search, classification, LLM) carries its own policy.

use std::time::Duration;

/// Linear backoff with additive uniform jitter.
///
/// The wait after the `n`-th failed attempt (1-based) is
/// `base_delay_secs * n + uniform(jitter_min_secs, jitter_max_secs)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Values below 1 behave as 1.
    pub max_attempts: u32,
    pub base_delay_secs: f64,
    pub jitter_min_secs: f64,
    pub jitter_max_secs: f64,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_attempts: u32, base_delay_secs: f64, jitter_max_secs: f64) -> Self {
        Self {
            max_attempts,
            base_delay_secs,
            jitter_min_secs: 0.0,
            jitter_max_secs,
        }
    }

    /// Defaults for search-engine queries.
    #[must_use]
    pub fn search() -> Self {
        Self::new(3, 5.0, 3.0)
    }

    /// Defaults for model inference.
    #[must_use]
    pub fn inference() -> Self {
        Self::new(3, 10.0, 3.0)
    }

    /// Defaults for LLM chat calls.
    #[must_use]
    pub fn llm() -> Self {
        Self::new(5, 5.0, 3.0)
    }

    /// Effective attempt budget, never below one.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay before the next attempt after `attempt` (1-based) failed.
    ///
    /// `unit` is a sample in `[0, 1)` used to place the jitter within its
    /// range; callers pass `rand::random::<f64>()`. Saturates at
    /// [`Duration::MAX`] instead of panicking on out-of-range values.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, unit: f64) -> Duration {
        let (lo, hi) = ordered(self.jitter_min_secs, self.jitter_max_secs);
        let jitter = lo + (hi - lo) * unit.clamp(0.0, 1.0);
        let secs = self.base_delay_secs.max(0.0) * f64::from(attempt) + jitter;
        Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
    }
}

/// Uniform delay inserted between consecutive search queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingPolicy {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl PacingPolicy {
    #[must_use]
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// No pause at all; used by tests.
    #[must_use]
    pub fn none() -> Self {
        Self::new(0, 0)
    }

    #[must_use]
    pub fn delay(&self, unit: f64) -> Duration {
        let (lo, hi) = if self.min_ms <= self.max_ms {
            (self.min_ms, self.max_ms)
        } else {
            (self.max_ms, self.min_ms)
        };
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let extra = ((hi - lo) as f64 * unit.clamp(0.0, 1.0)) as u64;
        Duration::from_millis(lo + extra)
    }
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self::new(500, 1_200)
    }
}

/// Text fallback for overload detection when a backend offers no structured
/// status: rate-limit (`429`) or capacity-exceeded markers.
#[must_use]
pub fn mentions_overload(text: &str) -> bool {
    text.contains("429") || text.to_ascii_lowercase().contains("capacity")
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
