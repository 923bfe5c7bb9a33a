use std::fmt;

use formfill_core::{FieldValues, JobId, JobStatus};
use thiserror::Error;

use crate::form::{ControlEvent, LiveForm};
use crate::populate::PopulateReport;

/// Notifications the controller sends to its host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    StatusChanged {
        job_id: JobId,
        status: JobStatus,
    },
    /// A decoded fragment, what population did with it, and the control
    /// events that population dispatched.
    FieldValuesReady {
        job_id: JobId,
        values: FieldValues,
        report: PopulateReport,
        events: Vec<ControlEvent>,
    },
    /// The job reached a terminal status. `form` is the final live form,
    /// absent when the job failed before the form was captured.
    JobFinished {
        job_id: JobId,
        status: JobStatus,
        form: Option<LiveForm>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    HttpStatus(u16),
    Timeout,
    Network,
    MalformedStream,
    /// The service reported an error inside the stream.
    Upstream,
    Cancelled,
}

impl FailureKind {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FailureKind::Cancelled)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::MalformedStream => write!(f, "malformed stream"),
            FailureKind::Upstream => write!(f, "upstream error"),
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct CompletionError {
    pub kind: FailureKind,
    pub message: String,
}

impl CompletionError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("no API key configured")]
    MissingApiKey,
    #[error("invalid completion endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("no model configured")]
    MissingModel,
}

/// Why a start request was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("no active tab or form selector")]
    NoActiveTarget,
    #[error("job {job_id} is still running")]
    AlreadyRunning { job_id: JobId },
    #[error("controller is no longer running")]
    ControllerStopped,
}
