use async_trait::async_trait;
use probe::{Executor, ProbeRequest, ProbeResult};

/// Runs a single probe attempt
#[async_trait]
pub trait Prober: Send + Sync {
    /// Never fails, transport problems are reported in the result outcome
    async fn probe(&self, request: &ProbeRequest) -> ProbeResult;
}

#[async_trait]
impl Prober for Executor {
    async fn probe(&self, request: &ProbeRequest) -> ProbeResult {
        self.execute(request).await
    }
}
