//! Phase timing captured while a probe runs.

use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Millisecond timestamps (since the Unix epoch) for each network phase.
///
/// A phase that never happened keeps zero in both fields, e.g. the TLS fields of
/// a plaintext request or the DNS fields when the target is an IP literal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    pub dns_start: i64,
    pub dns_done: i64,
    pub connect_start: i64,
    pub connect_done: i64,
    pub tls_handshake_start: i64,
    pub tls_handshake_done: i64,
    pub first_byte_start: i64,
    pub first_byte_done: i64,
    pub transfer_start: i64,
    pub transfer_done: i64,
}

impl Timing {
    /// Phases in wire order as `(start, done)` pairs
    pub fn phases(&self) -> [(i64, i64); 5] {
        [
            (self.dns_start, self.dns_done),
            (self.connect_start, self.connect_done),
            (self.tls_handshake_start, self.tls_handshake_done),
            (self.first_byte_start, self.first_byte_done),
            (self.transfer_start, self.transfer_done),
        ]
    }

    /// True when every recorded timestamp is >= the ones recorded before it.
    pub fn is_monotonic(&self) -> bool {
        let mut last = 0;
        for (start, done) in self.phases() {
            for stamp in [start, done] {
                if stamp == 0 {
                    continue;
                }
                if stamp < last {
                    return false;
                }
                last = stamp;
            }
        }
        true
    }
}

/// Wall-clock anchored monotonic clock.
///
/// Reads the wall clock once and derives later stamps from an `Instant`, so
/// stamps taken through one clock never go backwards.
#[derive(Debug, Clone, Copy)]
pub struct PhaseClock {
    origin_ms: i64,
    origin: Instant,
}

impl PhaseClock {
    pub fn start() -> Self {
        Self { origin_ms: Utc::now().timestamp_millis(), origin: Instant::now() }
    }

    /// Epoch milliseconds at which the clock was started
    pub fn origin_ms(&self) -> i64 {
        self.origin_ms
    }

    pub fn now_ms(&self) -> i64 {
        self.origin_ms + self.elapsed_ms() as i64
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}
