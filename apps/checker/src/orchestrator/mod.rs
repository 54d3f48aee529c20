/// Orchestration service boundary - source of monitors and sink for status changes
pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;
use crate::models::MonitorSet;
use crate::monitoring::types::HealthStatus;

pub use client::HttpOrchestrator;

/// A health status change reported by a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub monitor_id: String,
    pub region: String,
    pub status: HealthStatus,
    pub status_code: Option<u16>,
    pub latency: u64,
    pub message: Option<String>,
    pub timestamp: i64,
    pub cron_timestamp: i64,
}

/// Orchestration collaborator
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Monitors this region should run
    async fn list_monitors(&self) -> Result<MonitorSet, CollaboratorError>;

    /// Persist a changed health status
    async fn update_status(&self, update: &StatusUpdate) -> Result<(), CollaboratorError>;
}
