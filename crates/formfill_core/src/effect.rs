use crate::{FieldValues, JobId, JobStatus, JobTarget};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// The start request was refused; status is unchanged.
    RejectStart { reason: StartRejection },
    /// Publish a status to collaborators.
    BroadcastStatus { job_id: JobId, status: JobStatus },
    /// Resolve the target form and build the field model.
    ExtractFields { job_id: JobId, target: JobTarget },
    /// Start (or restart) the remote completion call.
    RequestCompletion { job_id: JobId, attempt: u32 },
    /// Abort the in-flight remote call.
    AbortCompletion { job_id: JobId },
    /// Write decoded values into the live form and notify collaborators.
    ApplyValues { job_id: JobId, values: FieldValues },
    /// Drop the job slot and its cancellation handle.
    ReleaseJob { job_id: JobId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartRejection {
    NoActiveTarget,
    AlreadyRunning { job_id: JobId },
}
