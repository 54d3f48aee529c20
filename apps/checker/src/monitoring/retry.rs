//! Retry decisions for a single monitor run.

use std::time::Duration;

/// Attempts per run when a monitor does not configure any
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// How one attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Probe succeeded and the assertions held
    Passed,
    /// Probe succeeded but an assertion did not hold
    AssertionFailed,
    /// Timeout or transport failure
    ProbeFailed,
}

impl AttemptOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, AttemptOutcome::Passed)
    }
}

/// A finished attempt and what it produced
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt<T> {
    /// 1-based
    pub number: u32,
    pub outcome: AttemptOutcome,
    pub result: T,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision<T> {
    Retry { delay: Duration },
    /// The attempt to record
    Stop(Attempt<T>),
}

/// Exponential backoff bounded by an attempt count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(5),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Same backoff with a monitor specific attempt count, 0 keeps the current one
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        if max_attempts > 0 {
            self.max_attempts = max_attempts;
        }
        self
    }

    /// Delay before the attempt following `attempt`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = self.multiplier.max(1).saturating_pow(exponent);
        self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
    }

    pub fn decide<T>(&self, attempt: Attempt<T>) -> RetryDecision<T> {
        if attempt.outcome.is_passed() || attempt.number >= self.max_attempts.max(1) {
            return RetryDecision::Stop(attempt);
        }
        RetryDecision::Retry { delay: self.backoff(attempt.number) }
    }
}
