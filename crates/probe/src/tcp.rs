//! TCP dial probes.

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use crate::error::ProbeError;
use crate::timing::{PhaseClock, Timing};
use crate::types::{ProbeOutcome, ProbeResult, Response, TcpRequest};

/// Dial `host:port` within the request deadline.
///
/// Failures fall into exactly three classes: [`ProbeOutcome::Timeout`],
/// [`ProbeError::ConnectionRefused`] or [`ProbeError::Dial`]. On success the latency
/// is the connect duration.
pub async fn check_tcp(request: &TcpRequest) -> ProbeResult {
    let clock = PhaseClock::start();
    let mut timing = Timing { connect_start: clock.now_ms(), ..Default::default() };

    let outcome = match timeout(request.timeout, TcpStream::connect(request.target.as_str())).await
    {
        Ok(Ok(stream)) => {
            timing.connect_done = clock.now_ms();
            let peer = stream
                .peer_addr()
                .map(|addr| addr.to_string())
                .unwrap_or_else(|_| request.target.clone());
            ProbeOutcome::Success(Response::Tcp { peer })
        }
        Ok(Err(error)) => {
            debug!(endpoint = %request.target, "TCP dial failed: {error}");
            ProbeOutcome::from_error(ProbeError::from_dial(&error))
        }
        Err(_) => ProbeOutcome::Timeout,
    };

    let latency_ms = match outcome {
        ProbeOutcome::Success(_) => (timing.connect_done - timing.connect_start) as u64,
        _ => clock.elapsed_ms(),
    };

    ProbeResult { timestamp: clock.origin_ms(), latency_ms, timing, outcome }
}
