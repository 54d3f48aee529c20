//! HTTP probes.
//!
//! The probe drives DNS resolution, the TCP dial, the TLS handshake and the
//! HTTP/1.1 exchange itself so each phase can be stamped as it happens.

mod extract;
mod request;

pub use extract::{canonical_header_key, collect_headers};
pub use request::{DEFAULT_USER_AGENT, HttpProber};

/// Maximum number of redirects followed before giving up
pub const MAX_REDIRECTS: usize = 10;

/// Largest response body read before the exchange fails
pub const MAX_RESPONSE_BODY: usize = 1024 * 1024;
