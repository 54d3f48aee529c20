//! Request validation tests

use std::time::Duration;

use probe::validation::{validate_http_request, validate_tcp_target};
use probe::{DnsRequest, HttpRequest, ProbeRequest, TcpRequest, validate_probe_request};

#[test]
fn test_valid_http_request() {
    let request = HttpRequest::get("https://example.com").timeout(Duration::from_secs(5));
    assert!(validate_http_request(&request).is_ok(), "Valid request should pass validation");
}

#[test]
fn test_invalid_method_and_scheme() {
    let request = HttpRequest::new("INVALID", "https://example.com");
    assert!(validate_http_request(&request).is_err(), "Invalid HTTP method should fail");

    let request = HttpRequest::get("ftp://example.com");
    assert!(validate_http_request(&request).is_err(), "Non-http scheme should fail");
}

#[test]
fn test_timeout_bounds() {
    let request = HttpRequest::get("https://example.com").timeout(Duration::from_millis(10));
    assert!(validate_http_request(&request).is_err());

    let request = HttpRequest::get("https://example.com").timeout(Duration::from_secs(301));
    assert!(validate_http_request(&request).is_err());
}

#[test]
fn test_body_and_header_limits() {
    let request = HttpRequest::new("POST", "https://example.com").body("x".repeat(1024 * 1024 + 1));
    assert!(validate_http_request(&request).is_err());

    let mut request = HttpRequest::get("https://example.com");
    for i in 0..51 {
        request = request.header(format!("X-{i}"), "v");
    }
    assert!(validate_http_request(&request).is_err());
}

#[test]
fn test_tcp_targets() {
    assert!(validate_tcp_target("example.com:443").is_ok());
    assert!(validate_tcp_target("127.0.0.1:1").is_ok());
    assert!(validate_tcp_target("[::1]:8080").is_ok());

    assert!(validate_tcp_target("example.com").is_err());
    assert!(validate_tcp_target("example.com:").is_err());
    assert!(validate_tcp_target(":80").is_err());
    assert!(validate_tcp_target("example.com:0").is_err());
}

#[test]
fn test_dispatch_by_kind() {
    let tcp = ProbeRequest::Tcp(TcpRequest::new("example.com:80", Duration::from_secs(1)));
    assert!(validate_probe_request(&tcp).is_ok());

    let dns = ProbeRequest::Dns(DnsRequest::new("example..com", Duration::from_secs(1)));
    assert!(validate_probe_request(&dns).is_err());

    let dns = ProbeRequest::Dns(DnsRequest::new("example.com.", Duration::from_secs(1)));
    assert!(validate_probe_request(&dns).is_ok());
}
