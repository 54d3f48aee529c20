//! DNS record probes.
//!
//! A, AAAA, CNAME and NS are required: the first failure among them aborts the
//! check. MX and TXT are best effort and fall back to an empty list.

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::proto::rr::{RData, RecordType};
use tokio::time::timeout;
use tracing::debug;

use crate::error::ProbeError;
use crate::timing::{PhaseClock, Timing};
use crate::types::{DnsRecords, DnsRequest, ProbeOutcome, ProbeResult, Response};

/// Record types looked up by a DNS probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    A,
    Aaaa,
    Cname,
    Ns,
    Mx,
    Txt,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::A => write!(f, "A"),
            RecordKind::Aaaa => write!(f, "AAAA"),
            RecordKind::Cname => write!(f, "CNAME"),
            RecordKind::Ns => write!(f, "NS"),
            RecordKind::Mx => write!(f, "MX"),
            RecordKind::Txt => write!(f, "TXT"),
        }
    }
}

/// Resolver abstraction so the record policy can run against any backend
#[async_trait]
pub trait Resolve: Send + Sync {
    /// Resolve one record type, rendering each record as text.
    ///
    /// An authoritative "no such record" answer is an empty list, not an error.
    async fn lookup(&self, domain: &str, kind: RecordKind) -> Result<Vec<String>, ProbeError>;
}

/// Resolver backed by hickory with the host's resolver configuration
pub struct SystemResolver {
    inner: TokioAsyncResolver,
}

impl SystemResolver {
    /// Use `/etc/resolv.conf` (or the platform equivalent)
    pub fn from_system_conf() -> Result<Self, ProbeError> {
        let inner = TokioAsyncResolver::tokio_from_system_conf()
            .map_err(|e| ProbeError::Resolution(format!("failed to load resolver config: {e}")))?;
        Ok(Self { inner })
    }

    pub fn new(config: ResolverConfig, options: ResolverOpts) -> Self {
        Self { inner: TokioAsyncResolver::tokio(config, options) }
    }
}

#[async_trait]
impl Resolve for SystemResolver {
    async fn lookup(&self, domain: &str, kind: RecordKind) -> Result<Vec<String>, ProbeError> {
        let records: Result<Vec<String>, ResolveError> = match kind {
            RecordKind::A => self
                .inner
                .ipv4_lookup(domain)
                .await
                .map(|lookup| lookup.iter().map(|record| record.to_string()).collect()),
            RecordKind::Aaaa => self
                .inner
                .ipv6_lookup(domain)
                .await
                .map(|lookup| lookup.iter().map(|record| record.to_string()).collect()),
            RecordKind::Cname => self.inner.lookup(domain, RecordType::CNAME).await.map(|lookup| {
                lookup
                    .iter()
                    .filter_map(|record| match record {
                        RData::CNAME(name) => Some(name.to_string()),
                        _ => None,
                    })
                    .collect()
            }),
            RecordKind::Ns => self
                .inner
                .ns_lookup(domain)
                .await
                .map(|lookup| lookup.iter().map(|record| record.to_string()).collect()),
            RecordKind::Mx => self.inner.mx_lookup(domain).await.map(|lookup| {
                lookup
                    .iter()
                    .map(|record| format!("{} {}", record.preference(), record.exchange()))
                    .collect()
            }),
            RecordKind::Txt => self
                .inner
                .txt_lookup(domain)
                .await
                .map(|lookup| lookup.iter().map(|record| record.to_string()).collect()),
        };

        records.or_else(|error| match error.kind() {
            ResolveErrorKind::NoRecordsFound { response_code, .. }
                if *response_code == ResponseCode::NoError =>
            {
                Ok(Vec::new())
            }
            ResolveErrorKind::Timeout => Err(ProbeError::Timeout),
            _ => Err(ProbeError::Resolution(format!("{kind} {domain}: {error}"))),
        })
    }
}

/// Resolve every record type for `domain`
pub async fn resolve_records<R>(resolver: &R, domain: &str) -> Result<DnsRecords, ProbeError>
where
    R: Resolve + ?Sized,
{
    let a = resolver.lookup(domain, RecordKind::A).await?;
    let aaaa = resolver.lookup(domain, RecordKind::Aaaa).await?;
    let cname = resolver.lookup(domain, RecordKind::Cname).await?;
    let ns = resolver.lookup(domain, RecordKind::Ns).await?;

    let mx = best_effort(resolver, domain, RecordKind::Mx).await;
    let txt = best_effort(resolver, domain, RecordKind::Txt).await;

    Ok(DnsRecords { a, aaaa, cname, ns, mx, txt })
}

async fn best_effort<R>(resolver: &R, domain: &str, kind: RecordKind) -> Vec<String>
where
    R: Resolve + ?Sized,
{
    resolver.lookup(domain, kind).await.unwrap_or_else(|error| {
        debug!(%domain, %kind, "Ignoring lookup failure: {error}");
        Vec::new()
    })
}

/// Run a DNS probe within the request deadline
pub async fn check_dns<R>(resolver: &R, request: &DnsRequest) -> ProbeResult
where
    R: Resolve + ?Sized,
{
    let clock = PhaseClock::start();

    let outcome = match timeout(request.timeout, resolve_records(resolver, &request.domain)).await {
        Ok(Ok(records)) => ProbeOutcome::Success(Response::Dns(records)),
        Ok(Err(error)) => ProbeOutcome::from_error(error),
        Err(_) => ProbeOutcome::Timeout,
    };

    ProbeResult {
        timestamp: clock.origin_ms(),
        latency_ms: clock.elapsed_ms(),
        timing: Timing::default(),
        outcome,
    }
}
