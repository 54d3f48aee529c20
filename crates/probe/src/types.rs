//! Request and result types shared by every probe kind.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;

use crate::error::ProbeError;
use crate::http::MAX_RESPONSE_BODY;
use crate::timing::Timing;

/// Default probe deadline when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(45);

/// An HTTP request to probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Absolute http(s) URL
    pub url: String,

    /// HTTP method (GET, POST, ...)
    pub method: String,

    /// Ordered headers; a later duplicate key replaces an earlier one
    pub headers: Vec<(String, String)>,

    /// Raw body, base64 encoded when the content type is `application/octet-stream`
    pub body: Option<String>,

    pub timeout: Duration,

    /// Follow up to [`crate::http::MAX_REDIRECTS`] redirects
    pub follow_redirects: bool,

    /// Reading more response body than this fails the probe
    pub max_body_bytes: usize,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            headers: Vec::new(),
            body: None,
            timeout: DEFAULT_TIMEOUT,
            follow_redirects: true,
            max_body_bytes: MAX_RESPONSE_BODY,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }
}

/// A TCP dial to `host:port`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpRequest {
    pub target: String,
    pub timeout: Duration,
}

impl TcpRequest {
    pub fn new(target: impl Into<String>, timeout: Duration) -> Self {
        Self { target: target.into(), timeout }
    }
}

/// A DNS lookup of every supported record type for one domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRequest {
    pub domain: String,
    pub timeout: Duration,
}

impl DnsRequest {
    pub fn new(domain: impl Into<String>, timeout: Duration) -> Self {
        Self { domain: domain.into(), timeout }
    }
}

/// Any probe the executor knows how to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeRequest {
    Http(HttpRequest),
    Tcp(TcpRequest),
    Dns(DnsRequest),
}

impl ProbeRequest {
    /// URL, `host:port` or domain being probed
    pub fn target(&self) -> &str {
        match self {
            ProbeRequest::Http(request) => &request.url,
            ProbeRequest::Tcp(request) => &request.target,
            ProbeRequest::Dns(request) => &request.domain,
        }
    }

    pub fn timeout(&self) -> Duration {
        match self {
            ProbeRequest::Http(request) => request.timeout,
            ProbeRequest::Tcp(request) => request.timeout,
            ProbeRequest::Dns(request) => request.timeout,
        }
    }
}

/// A completed HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpResponse {
    pub status: u16,

    /// Canonicalised header names mapped to their (comma joined) values
    pub headers: BTreeMap<String, String>,

    /// Response body decoded as UTF-8 (lossy)
    pub body: String,
}

/// Records resolved for a domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct DnsRecords {
    pub a: Vec<String>,
    pub aaaa: Vec<String>,
    pub cname: Vec<String>,
    pub ns: Vec<String>,
    pub mx: Vec<String>,
    pub txt: Vec<String>,
}

/// Protocol specific payload of a successful probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "protocol", rename_all = "lowercase")]
pub enum Response {
    Http(HttpResponse),
    Tcp { peer: String },
    Dns(DnsRecords),
}

/// What happened when the probe ran
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "camelCase")]
pub enum ProbeOutcome {
    Success(Response),
    Timeout,
    TransportError(ProbeError),
}

impl ProbeOutcome {
    /// Map an error onto an outcome, keeping timeouts distinct
    pub fn from_error(error: ProbeError) -> Self {
        match error {
            ProbeError::Timeout => ProbeOutcome::Timeout,
            other => ProbeOutcome::TransportError(other),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProbeOutcome::Success(_))
    }

    /// Human readable failure description, `None` on success
    pub fn error_message(&self) -> Option<String> {
        match self {
            ProbeOutcome::Success(_) => None,
            ProbeOutcome::Timeout => Some("request timed out".to_string()),
            ProbeOutcome::TransportError(error) => Some(error.to_string()),
        }
    }
}

/// Result of a single probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    /// Epoch milliseconds at dispatch
    pub timestamp: i64,

    /// Wall time from dispatch to completion
    pub latency_ms: u64,

    pub timing: Timing,

    pub outcome: ProbeOutcome,
}

impl ProbeResult {
    pub fn http_response(&self) -> Option<&HttpResponse> {
        match &self.outcome {
            ProbeOutcome::Success(Response::Http(response)) => Some(response),
            _ => None,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        self.http_response().map(|response| response.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outcome_wire_shape() {
        let result = ProbeResult {
            timestamp: 1,
            latency_ms: 2,
            timing: Timing::default(),
            outcome: ProbeOutcome::TransportError(ProbeError::ConnectionRefused("refused".into())),
        };
        let value = serde_json::to_value(&result).unwrap();

        assert_eq!(value["latencyMs"], 2);
        assert_eq!(value["outcome"]["outcome"], "transportError");
        assert_eq!(
            value["outcome"]["detail"],
            json!({"kind": "connectionRefused", "message": "refused"})
        );
    }

    #[test]
    fn test_timeout_outcome() {
        let outcome = ProbeOutcome::from_error(ProbeError::Timeout);
        assert_eq!(outcome, ProbeOutcome::Timeout);
        assert_eq!(outcome.error_message().as_deref(), Some("request timed out"));
        assert_eq!(serde_json::to_value(&outcome).unwrap(), json!({"outcome": "timeout"}));
    }

    #[test]
    fn test_dns_records_use_record_type_names() {
        let records = DnsRecords { mx: vec!["10 mail.example.com.".into()], ..Default::default() };
        let value = serde_json::to_value(Response::Dns(records)).unwrap();

        assert_eq!(value["protocol"], "dns");
        assert_eq!(value["MX"], json!(["10 mail.example.com."]));
        assert_eq!(value["AAAA"], json!([]));
    }
}
