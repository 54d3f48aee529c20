use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use probe::{DnsRequest, HttpRequest, ProbeRequest, TcpRequest, validate_probe_request};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;
use crate::monitoring::types::HealthStatus;

const DEFAULT_TIMEOUT_MS: u64 = 45_000;

/// Protocol a monitor probes with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorKind {
    #[default]
    Http,
    Tcp,
    Dns,
}

impl fmt::Display for MonitorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorKind::Http => write!(f, "http"),
            MonitorKind::Tcp => write!(f, "tcp"),
            MonitorKind::Dns => write!(f, "dns"),
        }
    }
}

/// How often a monitor runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Periodicity {
    ThirtySeconds,
    OneMinute,
    FiveMinutes,
    TenMinutes,
    ThirtyMinutes,
    OneHour,
}

impl Periodicity {
    pub fn as_secs(&self) -> u64 {
        match self {
            Periodicity::ThirtySeconds => 30,
            Periodicity::OneMinute => 60,
            Periodicity::FiveMinutes => 300,
            Periodicity::TenMinutes => 600,
            Periodicity::ThirtyMinutes => 1800,
            Periodicity::OneHour => 3600,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.as_secs())
    }
}

impl FromStr for Periodicity {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "30s" => Ok(Periodicity::ThirtySeconds),
            "1m" => Ok(Periodicity::OneMinute),
            "5m" => Ok(Periodicity::FiveMinutes),
            "10m" => Ok(Periodicity::TenMinutes),
            "30m" => Ok(Periodicity::ThirtyMinutes),
            "1h" => Ok(Periodicity::OneHour),
            other => Err(ConfigError::UnknownPeriodicity(other.to_string())),
        }
    }
}

impl fmt::Display for Periodicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Periodicity::ThirtySeconds => "30s",
            Periodicity::OneMinute => "1m",
            Periodicity::FiveMinutes => "5m",
            Periodicity::TenMinutes => "10m",
            Periodicity::ThirtyMinutes => "30m",
            Periodicity::OneHour => "1h",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub key: String,
    pub value: String,
}

/// A monitor as reported by the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Monitor {
    pub id: String,

    #[serde(default)]
    pub workspace_id: String,

    /// Set from the list the monitor was reported in
    #[serde(default)]
    pub kind: MonitorKind,

    /// URL for HTTP, `host:port` for TCP, domain for DNS
    #[serde(alias = "url", alias = "uri")]
    pub target: String,

    #[serde(default = "default_method")]
    pub method: String,

    #[serde(default)]
    pub headers: Vec<Header>,

    #[serde(default)]
    pub body: Option<String>,

    #[serde(default = "default_timeout_ms", alias = "timeout")]
    pub timeout_ms: u64,

    /// Attempts per run, 0 means the default
    #[serde(default)]
    pub max_retries: u32,

    /// One of 30s, 1m, 5m, 10m, 30m, 1h
    pub periodicity: String,

    /// Latency above which a successful run is degraded, 0 disables
    #[serde(default, alias = "degradedAfter")]
    pub degraded_after_ms: u64,

    /// Raw assertion payloads, parsed when a job runs
    #[serde(default)]
    pub assertions: Vec<Value>,

    /// Last known health status
    #[serde(default)]
    pub status: HealthStatus,

    #[serde(default = "default_follow_redirects")]
    pub follow_redirects: bool,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_follow_redirects() -> bool {
    true
}

impl Monitor {
    pub fn periodicity(&self) -> Result<Periodicity, ConfigError> {
        self.periodicity.parse()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Build and validate the probe this monitor runs
    pub fn probe_request(&self) -> Result<ProbeRequest, ConfigError> {
        let request = match self.kind {
            MonitorKind::Http => {
                let mut request = HttpRequest::new(self.method.to_uppercase(), &self.target)
                    .timeout(self.timeout())
                    .follow_redirects(self.follow_redirects);
                for header in &self.headers {
                    request = request.header(&header.key, &header.value);
                }
                if let Some(body) = self.body.as_deref().filter(|body| !body.is_empty()) {
                    request = request.body(body);
                }
                ProbeRequest::Http(request)
            }
            MonitorKind::Tcp => ProbeRequest::Tcp(TcpRequest::new(&self.target, self.timeout())),
            MonitorKind::Dns => ProbeRequest::Dns(DnsRequest::new(&self.target, self.timeout())),
        };

        validate_probe_request(&request).map_err(|source| ConfigError::InvalidTarget {
            monitor_id: self.id.clone(),
            source,
        })?;

        Ok(request)
    }

    /// Whether a running loop for `self` can keep serving `other`.
    /// The reported status is ignored, loops track it themselves.
    pub fn same_config(&self, other: &Monitor) -> bool {
        let mut other = other.clone();
        other.status = self.status;
        *self == other
    }
}

/// Monitor listing as returned by the orchestrator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSet {
    #[serde(default)]
    pub http_monitors: Vec<Monitor>,

    #[serde(default)]
    pub tcp_monitors: Vec<Monitor>,

    #[serde(default)]
    pub dns_monitors: Vec<Monitor>,
}

impl MonitorSet {
    /// Flatten into one list, tagging each monitor with the kind of its list
    pub fn into_monitors(self) -> Vec<Monitor> {
        let tag = |kind: MonitorKind| {
            move |mut monitor: Monitor| {
                monitor.kind = kind;
                monitor
            }
        };

        self.http_monitors
            .into_iter()
            .map(tag(MonitorKind::Http))
            .chain(self.tcp_monitors.into_iter().map(tag(MonitorKind::Tcp)))
            .chain(self.dns_monitors.into_iter().map(tag(MonitorKind::Dns)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.http_monitors.len() + self.tcp_monitors.len() + self.dns_monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn http_monitor() -> Monitor {
        serde_json::from_value(json!({
            "id": "mon_1",
            "workspaceId": "ws_1",
            "url": "https://example.com/health",
            "periodicity": "1m",
        }))
        .unwrap()
    }

    #[test]
    fn test_periodicity_mapping() {
        let cases = [
            ("30s", 30),
            ("1m", 60),
            ("5m", 300),
            ("10m", 600),
            ("30m", 1800),
            ("1h", 3600),
        ];
        for (label, secs) in cases {
            let periodicity: Periodicity = label.parse().unwrap();
            assert_eq!(periodicity.as_secs(), secs);
            assert_eq!(periodicity.to_string(), label);
        }
    }

    #[test]
    fn test_unknown_periodicity_is_config_error() {
        let error = "2m".parse::<Periodicity>().unwrap_err();
        assert!(matches!(error, ConfigError::UnknownPeriodicity(value) if value == "2m"));
    }

    #[test]
    fn test_monitor_defaults() {
        let monitor = http_monitor();
        assert_eq!(monitor.kind, MonitorKind::Http);
        assert_eq!(monitor.method, "GET");
        assert_eq!(monitor.timeout_ms, 45_000);
        assert_eq!(monitor.max_retries, 0);
        assert_eq!(monitor.status, HealthStatus::Active);
        assert!(monitor.follow_redirects);
    }

    #[test]
    fn test_http_probe_request() {
        let mut monitor = http_monitor();
        monitor.method = "post".to_string();
        monitor.body = Some("{}".to_string());
        monitor.headers = vec![Header { key: "X-Test".to_string(), value: "1".to_string() }];

        let ProbeRequest::Http(request) = monitor.probe_request().unwrap() else {
            panic!("expected an HTTP request");
        };
        assert_eq!(request.method, "POST");
        assert_eq!(request.url, "https://example.com/health");
        assert_eq!(request.headers, vec![("X-Test".to_string(), "1".to_string())]);
        assert_eq!(request.body.as_deref(), Some("{}"));
        assert_eq!(request.timeout, Duration::from_secs(45));
    }

    #[test]
    fn test_invalid_tcp_target_is_rejected() {
        let mut monitor = http_monitor();
        monitor.kind = MonitorKind::Tcp;
        monitor.target = "localhost".to_string();

        let error = monitor.probe_request().unwrap_err();
        assert!(matches!(error, ConfigError::InvalidTarget { monitor_id, .. } if monitor_id == "mon_1"));
    }

    #[test]
    fn test_same_config_ignores_status() {
        let monitor = http_monitor();
        let mut reported = monitor.clone();
        reported.status = HealthStatus::Error;
        assert!(monitor.same_config(&reported));

        reported.periodicity = "5m".to_string();
        assert!(!monitor.same_config(&reported));
    }

    #[test]
    fn test_monitor_set_tags_kinds() {
        let set: MonitorSet = serde_json::from_value(json!({
            "httpMonitors": [{ "id": "h", "url": "https://example.com", "periodicity": "1m" }],
            "tcpMonitors": [{ "id": "t", "target": "example.com:443", "periodicity": "5m" }],
        }))
        .unwrap();
        assert_eq!(set.len(), 2);

        let monitors = set.into_monitors();
        assert_eq!(monitors[0].kind, MonitorKind::Http);
        assert_eq!(monitors[1].kind, MonitorKind::Tcp);
    }
}
