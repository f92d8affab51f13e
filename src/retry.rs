//! Bounded retry for gesture-end persistence.
//!
//! DESIGN
//! ======
//! A drag or resize already shows its result locally, so a failed write is
//! never surfaced to the user. Instead of dropping it silently, the write is
//! retried a bounded number of times with exponential backoff and random
//! jitter, and only retryable failures (lost connection, store unavailable)
//! are retried. `NotFound` means the element was removed meanwhile; retrying
//! cannot help and would only resurrect it elsewhere.

#[cfg(test)]
#[path = "retry_test.rs"]
mod retry_test;

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::frame::ErrorCode;
use crate::store::StoreError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;
pub const DEFAULT_BASE_DELAY_MS: u64 = 100;
pub const DEFAULT_MAX_DELAY_MS: u64 = 2000;

/// Backoff schedule: attempt `n` (0-based) waits `base * 2^n`, capped at
/// `max_delay`, plus up to half that again when `jitter` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries, the first one included. At least 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries.
    #[must_use]
    pub fn none() -> Self {
        Self { max_attempts: 1, ..Self::default() }
    }

    /// Delay before retry number `attempt + 1`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(16);
        let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);
        if !self.jitter {
            return delay;
        }
        let spread = u64::try_from(delay.as_millis() / 2).unwrap_or(u64::MAX);
        if spread == 0 {
            return delay;
        }
        let extra = rand::rng().random_range(0..=spread);
        (delay + Duration::from_millis(extra)).min(self.max_delay)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy runs out of attempts. Returns whether the write landed.
///
/// The final failure is logged, never returned.
pub async fn persist_with_retry<F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), StoreError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(()) => return true,
            Err(e) if e.retryable() && attempt + 1 < max_attempts => {
                let delay = policy.delay_for(attempt);
                debug!(op = label, attempt, ?delay, error = %e, "persist: retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                warn!(op = label, attempts = attempt + 1, code = e.error_code(), error = %e, "persist: giving up");
                return false;
            }
        }
    }
}
