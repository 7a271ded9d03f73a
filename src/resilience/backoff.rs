//! Exponential reconnect backoff.

use std::time::Duration;

/// First delay after a failure, and the value restored on success.
pub const INITIAL_BACKOFF_SECS: u64 = 1;

/// Upper bound on the reconnect delay.
pub const MAX_BACKOFF_SECS: u64 = 30;

/// Calculate the delay before reconnect attempt `attempt` (1-based).
pub fn calculate_backoff(attempt: u32, base_secs: u64, max_secs: u64) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay = base_secs.saturating_mul(exponential_base);
    Duration::from_secs(delay.min(max_secs))
}

/// Reconnect delay that persists across consecutive failures of one run.
///
/// Invariant: `current()` is always within
/// `[INITIAL_BACKOFF_SECS, MAX_BACKOFF_SECS]`.
#[derive(Debug, Clone)]
pub struct Backoff {
    /// Failures since the last successful authentication.
    failures: u32,
}

impl Backoff {
    pub fn new() -> Self {
        Self { failures: 0 }
    }

    /// The delay to sleep before the next attempt.
    pub fn current(&self) -> Duration {
        calculate_backoff(self.failures.saturating_add(1), INITIAL_BACKOFF_SECS, MAX_BACKOFF_SECS)
    }

    /// Return the delay to sleep now and record the failure.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current();
        self.failures = self.failures.saturating_add(1);
        delay
    }

    /// Restore the initial delay. Called only after a successful authentication.
    pub fn reset(&mut self) {
        self.failures = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}
