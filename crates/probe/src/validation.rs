//! Request validation for probes.
//!
//! Targets are user supplied and untrusted, so requests are checked before they
//! are dispatched.

use std::time::Duration;

use url::Url;

use crate::error::ProbeError;
use crate::types::{DnsRequest, HttpRequest, ProbeRequest, TcpRequest};

const MIN_TIMEOUT: Duration = Duration::from_millis(100);
const MAX_TIMEOUT: Duration = Duration::from_secs(300);
const MAX_HEADERS: usize = 50;
const MAX_HEADER_SIZE: usize = 8192;
const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Validate any probe request
pub fn validate_probe_request(request: &ProbeRequest) -> Result<(), ProbeError> {
    match request {
        ProbeRequest::Http(request) => validate_http_request(request),
        ProbeRequest::Tcp(request) => validate_tcp_request(request),
        ProbeRequest::Dns(request) => validate_dns_request(request),
    }
}

pub fn validate_http_request(request: &HttpRequest) -> Result<(), ProbeError> {
    validate_url(&request.url)?;
    validate_http_method(&request.method)?;
    validate_timeout(request.timeout)?;
    validate_headers(&request.headers)?;

    if let Some(body) = &request.body {
        validate_body_size(body)?;
    }

    Ok(())
}

pub fn validate_tcp_request(request: &TcpRequest) -> Result<(), ProbeError> {
    validate_tcp_target(&request.target)?;
    validate_timeout(request.timeout)
}

pub fn validate_dns_request(request: &DnsRequest) -> Result<(), ProbeError> {
    let domain = request.domain.trim_end_matches('.');
    if domain.is_empty() || domain.len() > 253 {
        return Err(invalid(format!("invalid domain: {:?}", request.domain)));
    }
    if domain.split('.').any(|label| label.is_empty() || label.len() > 63) {
        return Err(invalid(format!("invalid domain label in {}", request.domain)));
    }
    validate_timeout(request.timeout)
}

/// `host:port`, with IPv6 hosts in brackets
pub fn validate_tcp_target(target: &str) -> Result<(), ProbeError> {
    let (host, port) = target
        .rsplit_once(':')
        .ok_or_else(|| invalid("TCP target must be in format host:port".to_string()))?;

    if host.is_empty() || host == "[]" {
        return Err(invalid(format!("missing host in {target}")));
    }

    let port: u16 = port.parse().map_err(|_| invalid(format!("invalid port in {target}")))?;
    if port == 0 {
        return Err(invalid("port 0 is not valid".to_string()));
    }

    Ok(())
}

/// Validate URL format and scheme
fn validate_url(url: &str) -> Result<(), ProbeError> {
    let parsed = Url::parse(url).map_err(|e| invalid(format!("invalid URL {url}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported URL scheme: {other}"))),
    }

    if parsed.host().is_none() {
        return Err(invalid(format!("missing host in {url}")));
    }

    Ok(())
}

fn validate_http_method(method: &str) -> Result<(), ProbeError> {
    match method.to_uppercase().as_str() {
        "GET" | "POST" | "PUT" | "DELETE" | "HEAD" | "OPTIONS" | "PATCH" => Ok(()),
        _ => Err(invalid(format!("unsupported HTTP method: {method}"))),
    }
}

fn validate_timeout(timeout: Duration) -> Result<(), ProbeError> {
    if timeout < MIN_TIMEOUT {
        return Err(invalid(format!(
            "timeout too small: {} ms (min: {} ms)",
            timeout.as_millis(),
            MIN_TIMEOUT.as_millis()
        )));
    }

    if timeout > MAX_TIMEOUT {
        return Err(invalid(format!(
            "timeout too large: {} ms (max: {} ms)",
            timeout.as_millis(),
            MAX_TIMEOUT.as_millis()
        )));
    }

    Ok(())
}

fn validate_headers(headers: &[(String, String)]) -> Result<(), ProbeError> {
    if headers.len() > MAX_HEADERS {
        return Err(invalid(format!("too many headers: {} (max: {MAX_HEADERS})", headers.len())));
    }

    for (key, value) in headers {
        if key.len() + value.len() > MAX_HEADER_SIZE {
            return Err(invalid(format!(
                "header {key} too large: {} bytes (max: {MAX_HEADER_SIZE} bytes)",
                key.len() + value.len()
            )));
        }
    }

    Ok(())
}

fn validate_body_size(body: &str) -> Result<(), ProbeError> {
    if body.len() > MAX_BODY_SIZE {
        return Err(invalid(format!(
            "body too large: {} bytes (max: {MAX_BODY_SIZE} bytes)",
            body.len()
        )));
    }

    Ok(())
}

fn invalid(message: String) -> ProbeError {
    ProbeError::InvalidRequest(message)
}
