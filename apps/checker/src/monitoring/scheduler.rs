use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::executor::MonitoringExecutor;
use crate::error::ConfigError;
use crate::models::Monitor;
use crate::orchestrator::Orchestrator;

/// A running monitor loop
struct MonitorRuntime {
    /// Snapshot the loop was started with
    monitor: Monitor,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl MonitorRuntime {
    /// Signal the loop and wait for it. An in-flight run completes first.
    async fn stop(self) {
        self.cancel.cancel();
        if let Err(error) = self.handle.await {
            error!(monitor_id = %self.monitor.id, "Monitor loop panicked: {error}");
        }
    }
}

/// What one reconciliation changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub started: usize,
    pub stopped: usize,
    pub restarted: usize,
    /// Monitors that could not be started
    pub skipped: usize,
}

/// Owns one loop per monitor and keeps them in line with the orchestrator
pub struct MonitoringScheduler {
    executor: Arc<MonitoringExecutor>,
    orchestrator: Arc<dyn Orchestrator>,
    registry: Mutex<HashMap<String, MonitorRuntime>>,
    shutdown: CancellationToken,
    reconcile_interval: Duration,
}

impl MonitoringScheduler {
    pub fn new(
        executor: Arc<MonitoringExecutor>,
        orchestrator: Arc<dyn Orchestrator>,
        reconcile_interval: Duration,
    ) -> Self {
        Self {
            executor,
            orchestrator,
            registry: Mutex::new(HashMap::new()),
            shutdown: CancellationToken::new(),
            reconcile_interval,
        }
    }

    /// Cancelling this token stops [`MonitoringScheduler::run`] and every loop
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Reconcile now and then every interval until shutdown, then stop all loops
    pub async fn run(&self) {
        info!(
            region = self.executor.region(),
            interval = ?self.reconcile_interval,
            "Monitor scheduler started"
        );

        let mut ticker = interval(self.reconcile_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => self.refresh().await,
            }
        }

        self.stop_all().await;
        info!("Monitor scheduler stopped");
    }

    /// Fetch the desired monitors and reconcile against them.
    /// When the orchestrator cannot be reached the running loops are kept.
    pub async fn refresh(&self) {
        match self.orchestrator.list_monitors().await {
            Ok(set) => {
                if set.is_empty() {
                    debug!("No monitors assigned to this region");
                }
                let summary = self.reconcile(set.into_monitors()).await;
                if summary != ReconcileSummary::default() {
                    info!(
                        started = summary.started,
                        stopped = summary.stopped,
                        restarted = summary.restarted,
                        skipped = summary.skipped,
                        "Reconciled monitors"
                    );
                }
            }
            Err(error) => warn!("Failed to list monitors, keeping current loops: {error}"),
        }
    }

    /// Make the running loops match `desired` exactly.
    ///
    /// The registry lock is held for the whole pass, so concurrent calls are
    /// applied one after the other.
    pub async fn reconcile(&self, desired: Vec<Monitor>) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();
        let mut registry = self.registry.lock().await;

        if self.shutdown.is_cancelled() {
            return summary;
        }

        let mut wanted: HashMap<String, Monitor> = HashMap::with_capacity(desired.len());
        for monitor in desired {
            if let Some(previous) = wanted.insert(monitor.id.clone(), monitor) {
                warn!(monitor_id = %previous.id, "Monitor listed twice, keeping the last entry");
            }
        }

        let running: HashSet<String> = registry.keys().cloned().collect();
        for monitor_id in running.iter().filter(|id| !wanted.contains_key(*id)) {
            if let Some(runtime) = registry.remove(monitor_id) {
                info!(monitor_id = %monitor_id, "Stopping monitor");
                runtime.stop().await;
                summary.stopped += 1;
            }
        }

        for (monitor_id, monitor) in wanted {
            let restart = match registry.get(&monitor_id) {
                Some(runtime) if runtime.monitor.same_config(&monitor) => continue,
                Some(_) => true,
                None => false,
            };

            if restart {
                if let Some(runtime) = registry.remove(&monitor_id) {
                    info!(monitor_id = %monitor_id, "Monitor changed, restarting");
                    runtime.stop().await;
                }
            }

            match self.start(monitor) {
                Ok(runtime) => {
                    registry.insert(monitor_id, runtime);
                    if restart {
                        summary.restarted += 1;
                    } else {
                        summary.started += 1;
                    }
                }
                Err(error) => {
                    warn!(monitor_id = %monitor_id, "Skipping monitor: {error}");
                    summary.skipped += 1;
                }
            }
        }

        summary
    }

    /// Ids of the monitors with a running loop, sorted
    pub async fn running_ids(&self) -> Vec<String> {
        let registry = self.registry.lock().await;
        let mut ids: Vec<String> = registry.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Stop every loop and wait for all of them
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.stop_all().await;
    }

    async fn stop_all(&self) {
        let mut registry = self.registry.lock().await;
        let runtimes: Vec<MonitorRuntime> = registry.drain().map(|(_, runtime)| runtime).collect();
        if runtimes.is_empty() {
            return;
        }

        debug!(count = runtimes.len(), "Stopping monitor loops");
        join_all(runtimes.into_iter().map(MonitorRuntime::stop)).await;
    }

    fn start(&self, monitor: Monitor) -> Result<MonitorRuntime, ConfigError> {
        let period = monitor.periodicity()?.interval();
        monitor.probe_request()?;

        info!(monitor_id = %monitor.id, kind = %monitor.kind, endpoint = %monitor.target, "Starting monitor");
        let cancel = self.shutdown.child_token();
        let handle = tokio::spawn(monitor_loop(
            self.executor.clone(),
            monitor.clone(),
            period,
            cancel.clone(),
        ));

        Ok(MonitorRuntime { monitor, cancel, handle })
    }
}

/// Run `monitor` immediately and then every `period` until cancelled.
/// Runs never overlap: the wait starts after the previous run returned.
async fn monitor_loop(
    executor: Arc<MonitoringExecutor>,
    monitor: Monitor,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut baseline = monitor.status;

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let cron_timestamp = Utc::now().timestamp_millis();
        match executor.run(&monitor, baseline, cron_timestamp).await {
            Ok(report) => baseline = report.baseline(),
            Err(error) => error!(monitor_id = %monitor.id, "Monitor run aborted: {error}"),
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(period) => {}
        }
    }

    debug!(monitor_id = %monitor.id, "Monitor loop finished");
}
