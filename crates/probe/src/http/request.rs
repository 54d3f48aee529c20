//! HTTP probe request handling implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::header::{CONTENT_TYPE, HOST, HeaderName, HeaderValue, LOCATION, USER_AGENT};
use hyper::{HeaderMap, Method, Request, StatusCode};
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};
use url::{Host, Position, Url};

use super::MAX_REDIRECTS;
use super::extract::collect_headers;
use crate::error::ProbeError;
use crate::timing::{PhaseClock, Timing};
use crate::types::{HttpRequest, HttpResponse, ProbeOutcome, ProbeResult, Response};

/// User agent sent unless the request overrides it
pub const DEFAULT_USER_AGENT: &str = concat!("checker/", env!("CARGO_PKG_VERSION"));

const OCTET_STREAM: &str = "application/octet-stream";
const DEFAULT_POST_CONTENT_TYPE: &str = "application/json";

/// Response of a single hop, before redirect handling
struct RawResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

/// Executes HTTP probes
pub struct HttpProber {
    tls: TlsConnector,
    user_agent: String,
}

impl HttpProber {
    pub fn new() -> Result<Self, ProbeError> {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    /// Build a prober trusting the platform's native root certificates
    pub fn with_user_agent(user_agent: impl Into<String>) -> Result<Self, ProbeError> {
        let native = rustls_native_certs::load_native_certs();
        for error in &native.errors {
            warn!("Failed to load a native root certificate: {error}");
        }

        let mut roots = rustls::RootCertStore::empty();
        let (added, ignored) = roots.add_parsable_certificates(native.certs);
        debug!(added, ignored, "Loaded native root certificates");

        let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
        let config = rustls::ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| ProbeError::Tls(e.to_string()))?
            .with_root_certificates(roots)
            .with_no_client_auth();

        Ok(Self { tls: TlsConnector::from(Arc::new(config)), user_agent: user_agent.into() })
    }

    /// Run the probe. Never fails: errors are folded into the outcome.
    ///
    /// On timeout, the phases that completed before the deadline are kept.
    pub async fn check(&self, request: &HttpRequest) -> ProbeResult {
        let clock = PhaseClock::start();
        let mut timing = Timing::default();

        let attempt = self.follow(request, &clock, &mut timing);
        let outcome = match tokio::time::timeout(request.timeout, attempt).await {
            Ok(Ok(response)) => ProbeOutcome::Success(Response::Http(response)),
            Ok(Err(error)) => ProbeOutcome::from_error(error),
            Err(_) => ProbeOutcome::Timeout,
        };

        ProbeResult { timestamp: clock.origin_ms(), latency_ms: clock.elapsed_ms(), timing, outcome }
    }

    async fn follow(
        &self,
        request: &HttpRequest,
        clock: &PhaseClock,
        timing: &mut Timing,
    ) -> Result<HttpResponse, ProbeError> {
        let mut url = Url::parse(&request.url)
            .map_err(|e| ProbeError::InvalidRequest(format!("{}: {e}", request.url)))?;
        let mut method = Method::from_bytes(request.method.to_uppercase().as_bytes())
            .map_err(|_| ProbeError::InvalidRequest(format!("unsupported method {}", request.method)))?;
        let headers = self.build_headers(request)?;
        let mut body = encode_body(request.body.as_deref(), &headers)?;
        let mut hops = 0;

        loop {
            let response = self
                .send(&url, &method, &headers, body.clone(), request.max_body_bytes, clock, timing)
                .await?;

            let location = response
                .headers
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .map(str::to_owned);
            let location = match location {
                Some(location) if request.follow_redirects && is_redirect(response.status) => location,
                _ => {
                    return Ok(HttpResponse {
                        status: response.status.as_u16(),
                        headers: collect_headers(&response.headers),
                        body: String::from_utf8_lossy(&response.body).into_owned(),
                    });
                }
            };

            if hops == MAX_REDIRECTS {
                return Err(ProbeError::TooManyRedirects(MAX_REDIRECTS));
            }
            hops += 1;

            url = url.join(&location).map_err(|e| {
                ProbeError::Protocol(format!("invalid redirect location {location}: {e}"))
            })?;
            if matches!(response.status.as_u16(), 301..=303) && method != Method::HEAD {
                method = Method::GET;
                body = Bytes::new();
            }
            debug!(hop = hops, %url, "Following redirect");
        }
    }

    fn build_headers(&self, request: &HttpRequest) -> Result<HeaderMap, ProbeError> {
        let mut headers = HeaderMap::new();
        let user_agent = HeaderValue::from_str(&self.user_agent)
            .map_err(|e| ProbeError::InvalidRequest(format!("invalid user agent: {e}")))?;
        headers.insert(USER_AGENT, user_agent);

        for (key, value) in &request.headers {
            if key.is_empty() {
                continue;
            }
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| ProbeError::InvalidRequest(format!("invalid header name {key}: {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| ProbeError::InvalidRequest(format!("invalid value for {key}: {e}")))?;
            headers.insert(name, value);
        }

        if request.method.eq_ignore_ascii_case("POST") && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(DEFAULT_POST_CONTENT_TYPE));
        }

        Ok(headers)
    }

    /// One request/response exchange over a fresh connection.
    ///
    /// Starts from empty timing so only the last hop's phases are reported.
    #[allow(clippy::too_many_arguments)]
    async fn send(
        &self,
        url: &Url,
        method: &Method,
        headers: &HeaderMap,
        body: Bytes,
        max_body_bytes: usize,
        clock: &PhaseClock,
        timing: &mut Timing,
    ) -> Result<RawResponse, ProbeError> {
        *timing = Timing::default();

        let https = match url.scheme() {
            "https" => true,
            "http" => false,
            other => return Err(ProbeError::InvalidRequest(format!("unsupported scheme {other}"))),
        };
        let port = url
            .port_or_known_default()
            .ok_or_else(|| ProbeError::InvalidRequest(format!("missing port in {url}")))?;

        let (server_name, addrs) = match url.host() {
            Some(Host::Domain(domain)) => {
                (domain.to_string(), resolve(domain, port, clock, timing).await?)
            }
            Some(Host::Ipv4(ip)) => (ip.to_string(), vec![SocketAddr::new(ip.into(), port)]),
            Some(Host::Ipv6(ip)) => (ip.to_string(), vec![SocketAddr::new(ip.into(), port)]),
            None => return Err(ProbeError::InvalidRequest(format!("missing host in {url}"))),
        };

        timing.connect_start = clock.now_ms();
        let stream = dial(&addrs).await?;
        timing.connect_done = clock.now_ms();

        let request = build_request(url, method, headers, body)?;

        if https {
            timing.tls_handshake_start = clock.now_ms();
            let server_name = ServerName::try_from(server_name)
                .map_err(|e| ProbeError::Tls(format!("invalid server name: {e}")))?;
            let stream = self
                .tls
                .connect(server_name, stream)
                .await
                .map_err(|e| ProbeError::Tls(e.to_string()))?;
            timing.tls_handshake_done = clock.now_ms();
            exchange(stream, request, max_body_bytes, clock, timing).await
        } else {
            exchange(stream, request, max_body_bytes, clock, timing).await
        }
    }
}

/// Statuses answered by following `Location`; 300 and 304 are returned as is
fn is_redirect(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

async fn resolve(
    domain: &str,
    port: u16,
    clock: &PhaseClock,
    timing: &mut Timing,
) -> Result<Vec<SocketAddr>, ProbeError> {
    timing.dns_start = clock.now_ms();
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((domain, port))
        .await
        .map_err(|e| ProbeError::Resolution(format!("{domain}: {e}")))?
        .collect();
    timing.dns_done = clock.now_ms();

    if addrs.is_empty() {
        return Err(ProbeError::Resolution(format!("{domain}: no addresses")));
    }
    Ok(addrs)
}

/// Dial each address in turn, returning the first connection established
async fn dial(addrs: &[SocketAddr]) -> Result<TcpStream, ProbeError> {
    let mut last_error = None;
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(error) => {
                debug!(%addr, "Dial failed: {error}");
                last_error = Some(ProbeError::from_dial(&error));
            }
        }
    }
    Err(last_error.unwrap_or_else(|| ProbeError::Dial("no address to dial".to_string())))
}

fn build_request(
    url: &Url,
    method: &Method,
    headers: &HeaderMap,
    body: Bytes,
) -> Result<Request<Full<Bytes>>, ProbeError> {
    let mut builder =
        Request::builder().method(method.clone()).uri(&url[Position::BeforePath..Position::AfterQuery]);

    if let Some(map) = builder.headers_mut() {
        for (name, value) in headers {
            map.insert(name.clone(), value.clone());
        }
        if !map.contains_key(HOST) {
            let host = match (url.host_str(), url.port()) {
                (Some(host), Some(port)) => format!("{host}:{port}"),
                (Some(host), None) => host.to_string(),
                (None, _) => String::new(),
            };
            let host = HeaderValue::from_str(&host)
                .map_err(|e| ProbeError::InvalidRequest(format!("invalid host: {e}")))?;
            map.insert(HOST, host);
        }
    }

    builder.body(Full::new(body)).map_err(|e| ProbeError::InvalidRequest(e.to_string()))
}

async fn exchange<S>(
    stream: S,
    request: Request<Full<Bytes>>,
    max_body_bytes: usize,
    clock: &PhaseClock,
    timing: &mut Timing,
) -> Result<RawResponse, ProbeError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .map_err(|e| ProbeError::Transport(e.to_string()))?;
    tokio::spawn(async move {
        if let Err(error) = connection.await {
            debug!("HTTP connection closed with error: {error}");
        }
    });

    timing.first_byte_start = clock.now_ms();
    let response =
        sender.send_request(request).await.map_err(|e| ProbeError::Transport(e.to_string()))?;
    timing.first_byte_done = clock.now_ms();

    timing.transfer_start = timing.first_byte_done;
    let (parts, body) = response.into_parts();
    let body = Limited::new(body, max_body_bytes)
        .collect()
        .await
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                ProbeError::Protocol(format!("response body exceeds {max_body_bytes} bytes"))
            } else {
                ProbeError::Protocol(format!("failed to read response body: {e}"))
            }
        })?
        .to_bytes();
    timing.transfer_done = clock.now_ms();

    Ok(RawResponse { status: parts.status, headers: parts.headers, body })
}

/// Request body bytes; octet-stream bodies arrive base64 encoded
fn encode_body(body: Option<&str>, headers: &HeaderMap) -> Result<Bytes, ProbeError> {
    let Some(body) = body else {
        return Ok(Bytes::new());
    };

    let is_octet_stream = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(OCTET_STREAM));

    if is_octet_stream {
        STANDARD
            .decode(body.trim())
            .map(Bytes::from)
            .map_err(|e| ProbeError::Protocol(format!("invalid base64 body: {e}")))
    } else {
        Ok(Bytes::from(body.to_owned()))
    }
}
