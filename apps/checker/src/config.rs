use std::time::Duration;
use std::{env, fmt, fs, io, path};

use logger::LoggingConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::monitoring::executor::{Datasources, ExecutorSettings};
use crate::monitoring::retry::{DEFAULT_MAX_ATTEMPTS, RetryPolicy};
use crate::monitoring::types::DEFAULT_BODY_LIMIT;

const ORCHESTRATOR_TOKEN_VAR: &str = "CHECKER_ORCHESTRATOR_TOKEN";
const INGESTION_TOKEN_VAR: &str = "CHECKER_INGESTION_TOKEN";
const REGION_VAR: &str = "CHECKER_REGION";

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    ReadFailed {
        path: path::PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}: {source}")]
    WriteFailed {
        path: path::PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    ParseFailed(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("no config path: neither XDG_CONFIG_HOME nor HOME is set")]
    ConfigPathUnavailable,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub orchestrator: OrchestratorConfig,
    pub ingestion: IngestionConfig,
    pub scheduler: SchedulerConfig,
    pub retry: RetryConfig,
    pub probe: ProbeConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub url: String,
    pub token: Option<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { url: "http://127.0.0.1:3000".into(), token: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    pub url: String,
    pub token: Option<String>,
    /// Datasource for HTTP results
    pub datasource: String,
    pub tcp_datasource: String,
    pub dns_datasource: String,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        let datasources = Datasources::default();
        Self {
            url: "http://127.0.0.1:7181".into(),
            token: None,
            datasource: datasources.http,
            tcp_datasource: datasources.tcp,
            dns_datasource: datasources.dns,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Region this checker runs monitors for
    pub region: String,
    pub reconcile_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { region: "local".into(), reconcile_interval_secs: 60 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub multiplier: u32,
    /// Used for monitors without a retry count of their own
    pub default_max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_backoff_ms: 500,
            max_backoff_ms: 5_000,
            multiplier: 2,
            default_max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.default_max_attempts.max(1),
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            multiplier: self.multiplier,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub user_agent: String,
    /// Response bodies above this size are truncated in result records
    pub body_limit_bytes: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            user_agent: probe::http::DEFAULT_USER_AGENT.into(),
            body_limit_bytes: DEFAULT_BODY_LIMIT,
        }
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/checker/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, Error> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Ok(home_dir) = env::var("HOME") {
        path::PathBuf::from(home_dir).join(".config")
    } else {
        return Err(Error::ConfigPathUnavailable);
    };

    Ok(path.join("checker/config.toml"))
}

fn redact(token: &Option<String>) -> &'static str {
    if token.is_some() { "<redacted>" } else { "<unset>" }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);

        writeln!(f, "Current Checker Configuration:")?;
        write_title_1(f, "Orchestrator")?;
        write_1(f, "URL", &self.orchestrator.url)?;
        write_1(f, "Token", &redact(&self.orchestrator.token))?;

        write_title_1(f, "Ingestion")?;
        write_1(f, "URL", &self.ingestion.url)?;
        write_1(f, "Token", &redact(&self.ingestion.token))?;
        write_1(f, "HTTP Datasource", &self.ingestion.datasource)?;
        write_1(f, "TCP Datasource", &self.ingestion.tcp_datasource)?;
        write_1(f, "DNS Datasource", &self.ingestion.dns_datasource)?;

        write_title_1(f, "Scheduler")?;
        write_1(f, "Region", &self.scheduler.region)?;
        write_1(f, "Reconcile Interval (s)", &self.scheduler.reconcile_interval_secs)?;

        write_title_1(f, "Retry")?;
        write_1(f, "Initial Backoff (ms)", &self.retry.initial_backoff_ms)?;
        write_1(f, "Max Backoff (ms)", &self.retry.max_backoff_ms)?;
        write_1(f, "Multiplier", &self.retry.multiplier)?;
        write_1(f, "Default Max Attempts", &self.retry.default_max_attempts)?;

        write_title_1(f, "Probe")?;
        write_1(f, "User Agent", &self.probe.user_agent)?;
        write_1(f, "Body Limit (bytes)", &self.probe.body_limit_bytes)?;

        write_title_1(f, "Logging")?;
        write_1(f, "Level", &self.logging.level)?;
        write_1(f, "Format", &format!("{:?}", self.logging.format).to_lowercase())?;

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/checker/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    ///
    /// ```no_run
    /// let cfg = checker::config::Config::from_config(None::<&std::path::Path>)?;
    /// println!("{}", cfg);
    /// # Ok::<(), checker::config::Error>(())
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, Error> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path)
                .map_err(|source| Error::ReadFailed { path: config_path.clone(), source })?;
            Ok(toml::from_str(raw_string.as_str())?)
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), Error> {
        let config_str: String = toml::to_string_pretty(self)?;
        let write_failed = |source| Error::WriteFailed { path: path.to_path_buf(), source };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_failed)?;
        }

        fs::write(path, config_str).map_err(write_failed)
    }

    /// Apply secrets and the region from the environment
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = |name: &str| lookup(name).filter(|value| !value.is_empty());

        if let Some(token) = lookup(ORCHESTRATOR_TOKEN_VAR) {
            self.orchestrator.token = Some(token);
        }
        if let Some(token) = lookup(INGESTION_TOKEN_VAR) {
            self.ingestion.token = Some(token);
        }
        if let Some(region) = lookup(REGION_VAR) {
            self.scheduler.region = region;
        }
        self
    }

    /// Reject settings the checker cannot run with
    pub fn validate(&self) -> Result<(), Error> {
        for (field, url) in [("orchestrator.url", &self.orchestrator.url), ("ingestion.url", &self.ingestion.url)] {
            Url::parse(url).map_err(|e| Error::Invalid { field, reason: e.to_string() })?;
        }
        if self.scheduler.region.trim().is_empty() {
            return Err(Error::Invalid { field: "scheduler.region", reason: "must not be empty".into() });
        }
        if self.scheduler.reconcile_interval_secs == 0 {
            return Err(Error::Invalid {
                field: "scheduler.reconcile_interval_secs",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.scheduler.reconcile_interval_secs)
    }

    pub fn executor_settings(&self) -> ExecutorSettings {
        ExecutorSettings {
            region: self.scheduler.region.clone(),
            body_limit: self.probe.body_limit_bytes,
            datasources: Datasources {
                http: self.ingestion.datasource.clone(),
                tcp: self.ingestion.tcp_datasource.clone(),
                dns: self.ingestion.dns_datasource.clone(),
            },
        }
    }
}
