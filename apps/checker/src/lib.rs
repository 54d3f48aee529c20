//! Checker - synthetic monitoring for HTTP, TCP and DNS endpoints
//!
//! Monitors are fetched from an orchestration service and each one runs in its
//! own loop. Every run probes the target with retries, evaluates assertions,
//! derives a health status and ships a result record to ingestion. Status
//! changes are reported back to the orchestrator.

pub mod config;
pub mod error;
pub mod ingestion;
pub mod models;
pub mod monitoring;
pub mod orchestrator;

#[cfg(test)]
mod test_support;

pub use error::{AssertionError, CollaboratorError, ConfigError, JobError};
pub use models::{Monitor, MonitorKind, MonitorSet, Periodicity};
pub use monitoring::{HealthStatus, MonitoringExecutor, MonitoringScheduler, RequestStatus, ResultRecord};
