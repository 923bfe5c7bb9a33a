use serde::Serialize;

use crate::view_model::JobView;
use crate::JobTarget;

pub type JobId = u64;

/// One original attempt plus one automatic retry.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

const PROCESSING_MESSAGE: &str = "Generating field values…";
const CANCELED_MESSAGE: &str = "Canceled by user";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobPhase {
    #[default]
    Idle,
    Processing,
    Success,
    Error,
    Canceled,
}

impl JobPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobPhase::Success | JobPhase::Error | JobPhase::Canceled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct JobStatus {
    pub phase: JobPhase,
    pub message: Option<String>,
}

impl JobStatus {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn processing() -> Self {
        Self::with_message(JobPhase::Processing, PROCESSING_MESSAGE)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::with_message(JobPhase::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_message(JobPhase::Error, message)
    }

    pub fn canceled() -> Self {
        Self::with_message(JobPhase::Canceled, CANCELED_MESSAGE)
    }

    fn with_message(phase: JobPhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ActiveJob {
    pub(crate) job_id: JobId,
    pub(crate) target: JobTarget,
    pub(crate) attempt: u32,
    pub(crate) cancel_requested: bool,
    pub(crate) field_count: usize,
    pub(crate) fields_applied: usize,
}

/// The single "current job" slot. Only `update` mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobState {
    status: JobStatus,
    active: Option<ActiveJob>,
    last_job_id: JobId,
    max_attempts: u32,
}

impl Default for JobState {
    fn default() -> Self {
        Self {
            status: JobStatus::idle(),
            active: None,
            last_job_id: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl JobState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds the number of remote attempts per job; at least one is always made.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    pub fn status(&self) -> &JobStatus {
        &self.status
    }

    pub fn active_job_id(&self) -> Option<JobId> {
        self.active.as_ref().map(|job| job.job_id)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn view(&self) -> JobView {
        JobView {
            status: self.status.clone(),
            job_id: self.active_job_id(),
            target: self.active.as_ref().map(|job| job.target.clone()),
            attempt: self.active.as_ref().map(|job| job.attempt),
            field_count: self.active.as_ref().map_or(0, |job| job.field_count),
            fields_applied: self.active.as_ref().map_or(0, |job| job.fields_applied),
            cancel_requested: self.active.as_ref().is_some_and(|job| job.cancel_requested),
        }
    }

    pub(crate) fn begin_job(&mut self, target: JobTarget) -> JobId {
        self.last_job_id += 1;
        let job_id = self.last_job_id;
        self.active = Some(ActiveJob {
            job_id,
            target,
            attempt: 0,
            cancel_requested: false,
            field_count: 0,
            fields_applied: 0,
        });
        self.status = JobStatus::processing();
        job_id
    }

    /// The active job, if `job_id` names it. Messages for older jobs are stale.
    pub(crate) fn job_mut(&mut self, job_id: JobId) -> Option<&mut ActiveJob> {
        self.active.as_mut().filter(|job| job.job_id == job_id)
    }

    pub(crate) fn active_mut(&mut self) -> Option<&mut ActiveJob> {
        self.active.as_mut()
    }

    pub(crate) fn finish_job(&mut self, status: JobStatus) -> Option<JobId> {
        let job = self.active.take()?;
        self.status = status;
        Some(job.job_id)
    }
}
