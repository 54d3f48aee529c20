//! Probe - synthetic network checks
//!
//! This library runs single HTTP, TCP and DNS probes against untrusted targets,
//! bounded by a deadline, and reports the raw outcome together with per-phase
//! timing. Deciding whether an outcome is healthy is left to the caller.

pub mod dns;
pub mod error;
pub mod executor;
pub mod http;
pub mod tcp;
pub mod timing;
pub mod types;
pub mod validation;

// Re-export main types
pub use dns::{RecordKind, Resolve, SystemResolver};
pub use error::ProbeError;
pub use executor::Executor;
pub use http::HttpProber;
pub use timing::Timing;
pub use types::{
    DnsRecords, DnsRequest, HttpRequest, HttpResponse, ProbeOutcome, ProbeRequest, ProbeResult,
    Response, TcpRequest,
};
pub use validation::validate_probe_request;

/// Probe result type
pub type Result<T> = std::result::Result<T, ProbeError>;
