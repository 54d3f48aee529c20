use std::sync::Arc;

use probe::{ProbeOutcome, ProbeResult, Response};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::assertions::{Assertion, Evaluation, evaluate_all, parse_assertions};
use super::checker::Prober;
use super::retry::{Attempt, AttemptOutcome, RetryDecision, RetryPolicy};
use super::status::{Transition, Verdict, transition};
use super::types::{DEFAULT_BODY_LIMIT, HealthStatus, ResultRecord, truncate_body};
use crate::error::{AssertionError, JobError};
use crate::ingestion::Ingestion;
use crate::models::{Monitor, MonitorKind};
use crate::orchestrator::{Orchestrator, StatusUpdate};

/// Ingestion datasource per monitor kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datasources {
    pub http: String,
    pub tcp: String,
    pub dns: String,
}

impl Default for Datasources {
    fn default() -> Self {
        Self {
            http: "ping_response__v8".to_string(),
            tcp: "tcp_response__v0".to_string(),
            dns: "dns_response__v0".to_string(),
        }
    }
}

impl Datasources {
    pub fn for_kind(&self, kind: MonitorKind) -> &str {
        match kind {
            MonitorKind::Http => &self.http,
            MonitorKind::Tcp => &self.tcp,
            MonitorKind::Dns => &self.dns,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorSettings {
    /// Region stamped on every record and status update
    pub region: String,
    /// Response bodies are cut to this many bytes
    pub body_limit: usize,
    pub datasources: Datasources,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            region: "local".to_string(),
            body_limit: DEFAULT_BODY_LIMIT,
            datasources: Datasources::default(),
        }
    }
}

/// Outcome of one monitor run
#[derive(Debug, Clone, PartialEq)]
pub struct JobReport {
    pub record: ResultRecord,
    pub transition: Transition,
    /// Whether the orchestrator accepted a status update
    pub published: bool,
}

impl JobReport {
    /// Status the next run compares against. A change the orchestrator did not
    /// accept is not adopted, so the next run reports it again.
    pub fn baseline(&self) -> HealthStatus {
        if !self.transition.changed() || self.published {
            self.transition.next
        } else {
            self.transition.previous
        }
    }
}

/// Runs a monitor once: probe with retries, judge, record, report
pub struct MonitoringExecutor {
    prober: Arc<dyn Prober>,
    orchestrator: Arc<dyn Orchestrator>,
    ingestion: Arc<dyn Ingestion>,
    retry: RetryPolicy,
    settings: ExecutorSettings,
}

impl MonitoringExecutor {
    pub fn new(
        prober: Arc<dyn Prober>,
        orchestrator: Arc<dyn Orchestrator>,
        ingestion: Arc<dyn Ingestion>,
        retry: RetryPolicy,
        settings: ExecutorSettings,
    ) -> Self {
        Self { prober, orchestrator, ingestion, retry, settings }
    }

    pub fn region(&self) -> &str {
        &self.settings.region
    }

    /// Run `monitor` once against the `previous` health status.
    ///
    /// Probe failures never surface as errors here, they end up in the record
    /// and the resulting status. Errors mean the job could not be evaluated at
    /// all and nothing was probed or recorded.
    pub async fn run(
        &self,
        monitor: &Monitor,
        previous: HealthStatus,
        cron_timestamp: i64,
    ) -> Result<JobReport, JobError> {
        let request = monitor.probe_request()?;
        let assertions = match monitor.kind {
            MonitorKind::Http => parse_assertions(&monitor.assertions)?,
            MonitorKind::Tcp | MonitorKind::Dns => Vec::new(),
        };
        let policy = self.retry.with_max_attempts(monitor.max_retries);

        let mut number = 0;
        let attempt = loop {
            number += 1;
            let result = self.prober.probe(&request).await;
            let outcome = judge(&assertions, &result)?;
            debug!(
                monitor_id = %monitor.id,
                attempt = number,
                ?outcome,
                latency_ms = result.latency_ms,
                "Attempt finished"
            );

            match policy.decide(Attempt { number, outcome, result }) {
                RetryDecision::Retry { delay } => tokio::time::sleep(delay).await,
                RetryDecision::Stop(attempt) => break attempt,
            }
        };

        let verdict = if attempt.outcome.is_passed() { Verdict::Success } else { Verdict::Failure };
        let transition = transition(
            previous,
            verdict,
            attempt.result.latency_ms,
            monitor.degraded_after_ms,
        );
        let record = self.record(monitor, &attempt, transition.next, cron_timestamp);

        let datasource = self.settings.datasources.for_kind(monitor.kind);
        if let Err(error) = self.ingestion.send_event(&record, datasource).await {
            warn!(monitor_id = %monitor.id, datasource, "Failed to ingest result: {error}");
        }

        let published = if transition.changed() {
            self.publish(&record, transition).await
        } else {
            false
        };

        Ok(JobReport { record, transition, published })
    }

    async fn publish(&self, record: &ResultRecord, transition: Transition) -> bool {
        let update = StatusUpdate {
            monitor_id: record.monitor_id.clone(),
            region: record.region.clone(),
            status: transition.next,
            status_code: record.status_code,
            latency: record.latency,
            message: record.message.clone(),
            timestamp: record.timestamp,
            cron_timestamp: record.cron_timestamp,
        };

        match self.orchestrator.update_status(&update).await {
            Ok(()) => {
                info!(
                    monitor_id = %record.monitor_id,
                    from = %transition.previous,
                    to = %transition.next,
                    "Monitor status changed"
                );
                true
            }
            Err(error) => {
                warn!(monitor_id = %record.monitor_id, "Failed to update status: {error}");
                false
            }
        }
    }

    fn record(
        &self,
        monitor: &Monitor,
        attempt: &Attempt<ProbeResult>,
        status: HealthStatus,
        cron_timestamp: i64,
    ) -> ResultRecord {
        let result = &attempt.result;
        let (headers, body) = match &result.outcome {
            ProbeOutcome::Success(Response::Http(response)) => {
                (to_json(&response.headers), response.body.clone())
            }
            ProbeOutcome::Success(Response::Dns(records)) => ("{}".to_string(), to_json(records)),
            _ => ("{}".to_string(), String::new()),
        };

        let message = match attempt.outcome {
            AttemptOutcome::Passed => None,
            AttemptOutcome::AssertionFailed => Some(match result.status_code() {
                Some(code) => format!("assertions failed (status {code})"),
                None => "assertions failed".to_string(),
            }),
            AttemptOutcome::ProbeFailed => result.outcome.error_message(),
        };

        ResultRecord {
            workspace_id: monitor.workspace_id.clone(),
            monitor_id: monitor.id.clone(),
            kind: monitor.kind,
            target: monitor.target.clone(),
            region: self.settings.region.clone(),
            latency: result.latency_ms,
            status_code: result.status_code(),
            timing: to_json(&result.timing),
            headers,
            body: truncate_body(&body, self.settings.body_limit),
            request_status: status.request_status(),
            error: u8::from(status == HealthStatus::Error),
            message,
            attempts: attempt.number,
            timestamp: result.timestamp,
            cron_timestamp,
        }
    }
}

/// Classify one attempt. Assertions only apply to HTTP responses.
fn judge(assertions: &[Assertion], result: &ProbeResult) -> Result<AttemptOutcome, AssertionError> {
    let Some(response) = result.http_response() else {
        return Ok(if result.outcome.is_success() {
            AttemptOutcome::Passed
        } else {
            AttemptOutcome::ProbeFailed
        });
    };

    let headers = to_json(&response.headers);
    let input = Evaluation {
        status: i64::from(response.status),
        headers: &headers,
        body: &response.body,
    };

    if evaluate_all(assertions, &input)? {
        Ok(AttemptOutcome::Passed)
    } else {
        Ok(AttemptOutcome::AssertionFailed)
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}
