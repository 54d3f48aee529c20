//! Health status transitions.

use crate::monitoring::types::HealthStatus;

/// Final verdict of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub previous: HealthStatus,
    pub next: HealthStatus,
}

impl Transition {
    /// Only changed transitions are reported to the orchestrator
    pub fn changed(&self) -> bool {
        self.previous != self.next
    }
}

/// Health status for a verdict, ignoring history.
/// `degraded_after_ms == 0` disables the latency threshold.
pub fn next_status(verdict: Verdict, latency_ms: u64, degraded_after_ms: u64) -> HealthStatus {
    match verdict {
        Verdict::Failure => HealthStatus::Error,
        Verdict::Success if degraded_after_ms > 0 && latency_ms > degraded_after_ms => {
            HealthStatus::Degraded
        }
        Verdict::Success => HealthStatus::Active,
    }
}

pub fn transition(
    previous: HealthStatus,
    verdict: Verdict,
    latency_ms: u64,
    degraded_after_ms: u64,
) -> Transition {
    Transition { previous, next: next_status(verdict, latency_ms, degraded_after_ms) }
}
