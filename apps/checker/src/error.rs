//! Error taxonomy of the checker core.
//!
//! Transport failures live in [`probe::ProbeError`] and are retried by the job
//! runner. The errors here are never retried: schema and configuration errors
//! abort a job or a monitor start, collaborator errors are logged and dropped.

use probe::ProbeError;
use thiserror::Error;

/// An assertion that cannot be evaluated, as opposed to one that evaluated false
#[derive(Debug, Error)]
pub enum AssertionError {
    #[error("assertion has no type")]
    MissingKind,

    #[error("unknown assertion type {0:?}")]
    UnknownKind(String),

    #[error("malformed {kind} assertion: {source}")]
    Malformed {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("response headers are not a JSON object: {0}")]
    Headers(#[source] serde_json::Error),
}

/// A monitor that cannot be scheduled as configured
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown periodicity {0:?}")]
    UnknownPeriodicity(String),

    #[error("invalid monitor {monitor_id}: {source}")]
    InvalidTarget {
        monitor_id: String,
        #[source]
        source: ProbeError,
    },
}

/// Failure talking to the orchestration or ingestion service
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid payload: {0}")]
    Decode(#[from] serde_json::Error),
}

impl CollaboratorError {
    /// Pass 2xx responses through, turn anything else into [`CollaboratorError::Rejected`]
    pub(crate) async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, CollaboratorError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(CollaboratorError::Rejected { status: status.as_u16(), body })
    }
}

/// Why a single job run was aborted
#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Assertion(#[from] AssertionError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
