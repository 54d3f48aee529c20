//! Error taxonomy for probe execution.

use serde::Serialize;
use thiserror::Error;

/// Why a probe did not produce a response
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "camelCase")]
pub enum ProbeError {
    /// The deadline passed before the operation finished
    #[error("operation timed out")]
    Timeout,

    /// The peer actively rejected the connection
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    /// Any other dial failure (unreachable network, reset, ...)
    #[error("dial failed: {0}")]
    Dial(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("tls handshake failed: {0}")]
    Tls(String),

    /// Malformed response or an encoding failure on our side
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("dns resolution failed: {0}")]
    Resolution(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("stopped after {0} redirects")]
    TooManyRedirects(usize),
}

impl ProbeError {
    /// Classify an I/O error raised while dialing a peer.
    ///
    /// Only three classes exist for dial failures: the deadline expired, the peer
    /// refused, or anything else.
    pub fn from_dial(error: &std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::TimedOut => ProbeError::Timeout,
            std::io::ErrorKind::ConnectionRefused => {
                ProbeError::ConnectionRefused(error.to_string())
            }
            _ => ProbeError::Dial(error.to_string()),
        }
    }
}
