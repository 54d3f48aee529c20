use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::MonitorKind;

/// Default ceiling for response bodies stored in result records
pub const DEFAULT_BODY_LIMIT: usize = 10 * 1024;

/// Persisted health of a monitor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    #[default]
    Active,
    Degraded,
    Error,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Active => write!(f, "active"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Error => write!(f, "error"),
        }
    }
}

impl HealthStatus {
    /// Per-run verdict recorded alongside this status
    pub fn request_status(self) -> RequestStatus {
        match self {
            HealthStatus::Active => RequestStatus::Success,
            HealthStatus::Degraded => RequestStatus::Degraded,
            HealthStatus::Error => RequestStatus::Error,
        }
    }
}

/// Verdict of a single run as written to ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Success,
    Degraded,
    Error,
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestStatus::Success => write!(f, "success"),
            RequestStatus::Degraded => write!(f, "degraded"),
            RequestStatus::Error => write!(f, "error"),
        }
    }
}

/// One monitor run as sent to ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub workspace_id: String,
    pub monitor_id: String,
    pub kind: MonitorKind,

    /// URL, `host:port` or domain
    pub target: String,

    pub region: String,

    /// Latency of the recorded attempt in milliseconds
    pub latency: u64,

    pub status_code: Option<u16>,

    /// Timing phases as a JSON object
    pub timing: String,

    /// Response headers as a JSON object, `{}` for non HTTP probes
    pub headers: String,

    /// Response body (DNS records as JSON), truncated to the body limit
    pub body: String,

    pub request_status: RequestStatus,

    /// 1 when the run ended in error
    pub error: u8,

    pub message: Option<String>,

    /// Attempts made before the run was recorded
    pub attempts: u32,

    /// Epoch milliseconds when the recorded attempt was dispatched
    pub timestamp: i64,

    /// Epoch milliseconds of the scheduler tick
    pub cron_timestamp: i64,
}

/// Cut `body` to at most `limit` bytes on a char boundary
pub fn truncate_body(body: &str, limit: usize) -> String {
    if body.len() <= limit {
        return body.to_string();
    }

    let mut end = limit;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_string()
}
