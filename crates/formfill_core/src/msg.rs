#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Host asked for a new job. `None` when no tab could be resolved.
    StartRequested { target: Option<crate::JobTarget> },
    /// Host asked to cancel the active job.
    CancelRequested,
    /// Field model built for the job's form.
    FieldsExtracted {
        job_id: crate::JobId,
        field_count: usize,
    },
    /// Target form could not be resolved or was not a form.
    ExtractionFailed {
        job_id: crate::JobId,
        message: String,
    },
    /// A required setting (credential, endpoint) is missing or invalid.
    ConfigurationInvalid {
        job_id: crate::JobId,
        message: String,
    },
    /// The decoder reached a boundary and produced new values.
    ValuesDecoded {
        job_id: crate::JobId,
        values: crate::FieldValues,
    },
    /// The remote stream ended normally.
    CompletionFinished { job_id: crate::JobId, attempt: u32 },
    /// The remote call failed or was aborted.
    CompletionFailed {
        job_id: crate::JobId,
        attempt: u32,
        message: String,
        retryable: bool,
    },
}
