use std::env::var;

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{Layer, filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format of log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level directive, `RUST_LOG` takes precedence
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".into(), format: LogFormat::Compact }
    }
}

impl LoggingConfig {
    /// Format from `RUST_LOG_FORMAT` when set, otherwise the configured one
    fn effective_format(&self) -> LogFormat {
        match var("RUST_LOG_FORMAT").ok().as_deref() {
            Some("json") => LogFormat::Json,
            Some("compact") => LogFormat::Compact,
            _ => self.format,
        }
    }

    fn level_filter(&self) -> LevelFilter {
        self.level.parse().unwrap_or(LevelFilter::INFO)
    }
}

/// Install the global subscriber. Panics if one is already installed.
pub fn init(config: &LoggingConfig) {
    build(config).init();
}

/// Install the global subscriber unless one already exists
pub fn try_init(config: &LoggingConfig) -> bool {
    build(config).try_init().is_ok()
}

fn build(config: &LoggingConfig) -> impl SubscriberInitExt {
    let env_filter = EnvFilter::builder()
        .with_default_directive(config.level_filter().into())
        .from_env_lossy();

    let log_layer = match config.effective_format() {
        LogFormat::Json => tracing_subscriber::fmt::layer().json().with_filter(env_filter).boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_filter(env_filter)
            .boxed(),
    };

    tracing_subscriber::registry().with(log_layer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parsing_falls_back_to_info() {
        let config = LoggingConfig { level: "debug".into(), format: LogFormat::Json };
        assert_eq!(config.level_filter(), LevelFilter::DEBUG);

        let config = LoggingConfig { level: "loud".into(), ..Default::default() };
        assert_eq!(config.level_filter(), LevelFilter::INFO);
    }

    #[test]
    fn test_format_deserializes_lowercase() {
        let config: LoggingConfig = serde_json::from_str(r#"{"format":"json"}"#).unwrap();
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level, "info");
    }
}
