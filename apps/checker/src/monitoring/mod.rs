/// Monitoring engine - runs monitors and turns probe results into health
///
/// This module is responsible for:
/// - Evaluating assertions against probe results
/// - Retrying failed attempts with backoff
/// - Computing health status transitions
/// - Running one loop per monitor and reconciling them with the orchestrator
pub mod assertions;
pub mod checker;
pub mod executor;
pub mod retry;
pub mod scheduler;
pub mod status;
pub mod types;


pub use checker::Prober;
pub use executor::{Datasources, ExecutorSettings, JobReport, MonitoringExecutor};
pub use retry::RetryPolicy;
pub use scheduler::{MonitoringScheduler, ReconcileSummary};
pub use types::{HealthStatus, RequestStatus, ResultRecord};
