//! Dispatch of probe requests to the protocol specific checks.

use std::sync::Arc;

use tracing::debug;

use crate::dns::{Resolve, SystemResolver, check_dns};
use crate::error::ProbeError;
use crate::http::HttpProber;
use crate::tcp::check_tcp;
use crate::types::{ProbeRequest, ProbeResult};

/// Runs any [`ProbeRequest`] against the network
pub struct Executor {
    http: HttpProber,
    resolver: Arc<dyn Resolve>,
}

impl Executor {
    /// Executor using native roots for TLS and the system resolver for DNS probes
    pub fn new(user_agent: &str) -> Result<Self, ProbeError> {
        Ok(Self {
            http: HttpProber::with_user_agent(user_agent)?,
            resolver: Arc::new(SystemResolver::from_system_conf()?),
        })
    }

    pub fn with_resolver(http: HttpProber, resolver: Arc<dyn Resolve>) -> Self {
        Self { http, resolver }
    }

    pub async fn execute(&self, request: &ProbeRequest) -> ProbeResult {
        debug!(endpoint = request.target(), timeout = ?request.timeout(), "Executing probe");
        match request {
            ProbeRequest::Http(request) => self.http.check(request).await,
            ProbeRequest::Tcp(request) => check_tcp(request).await,
            ProbeRequest::Dns(request) => check_dns(self.resolver.as_ref(), request).await,
        }
    }
}
