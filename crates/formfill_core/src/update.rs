use crate::{Effect, JobId, JobState, JobStatus, JobTarget, Msg, StartRejection};

/// Pure update function: applies a message to state and returns any effects.
///
/// Messages naming a job other than the active one are ignored, so late
/// events from a finished job can never produce a second terminal status.
pub fn update(mut state: JobState, msg: Msg) -> (JobState, Vec<Effect>) {
    let effects = match msg {
        Msg::StartRequested { target } => start(&mut state, target),
        Msg::CancelRequested => match state.active_mut() {
            Some(job) if !job.cancel_requested => {
                job.cancel_requested = true;
                let job_id = job.job_id;
                vec![Effect::AbortCompletion { job_id }]
            }
            _ => Vec::new(),
        },
        Msg::FieldsExtracted {
            job_id,
            field_count,
        } => match state.job_mut(job_id) {
            Some(job) if job.attempt == 0 => {
                job.field_count = field_count;
                job.attempt = 1;
                vec![Effect::RequestCompletion {
                    job_id,
                    attempt: 1,
                }]
            }
            _ => Vec::new(),
        },
        Msg::ExtractionFailed { job_id, message }
        | Msg::ConfigurationInvalid { job_id, message } => {
            if state.job_mut(job_id).is_some() {
                finish(&mut state, JobStatus::error(message))
            } else {
                Vec::new()
            }
        }
        Msg::ValuesDecoded { job_id, values } => match state.job_mut(job_id) {
            // Once a cancel is requested the pipeline stops consuming.
            Some(job) if !job.cancel_requested && !values.is_empty() => {
                job.fields_applied += values.len();
                vec![Effect::ApplyValues { job_id, values }]
            }
            _ => Vec::new(),
        },
        Msg::CompletionFinished { job_id, attempt } => match state.job_mut(job_id) {
            Some(job) if job.attempt == attempt => {
                let status = if job.cancel_requested {
                    JobStatus::canceled()
                } else {
                    JobStatus::success(format!("Populated {} field(s)", job.fields_applied))
                };
                finish(&mut state, status)
            }
            _ => Vec::new(),
        },
        Msg::CompletionFailed {
            job_id,
            attempt,
            message,
            retryable,
        } => {
            let max_attempts = state.max_attempts();
            match state.job_mut(job_id) {
                Some(job) if job.attempt == attempt => {
                    if job.cancel_requested {
                        finish(&mut state, JobStatus::canceled())
                    } else if retryable && job.attempt < max_attempts {
                        job.attempt += 1;
                        let attempt = job.attempt;
                        vec![Effect::RequestCompletion { job_id, attempt }]
                    } else {
                        finish(&mut state, JobStatus::error(message))
                    }
                }
                _ => Vec::new(),
            }
        }
    };

    (state, effects)
}

fn start(state: &mut JobState, target: Option<JobTarget>) -> Vec<Effect> {
    // Concurrent jobs are not queued: the single slot and its abort handle
    // belong to the running job until it finishes.
    if let Some(job_id) = state.active_job_id() {
        return vec![Effect::RejectStart {
            reason: StartRejection::AlreadyRunning { job_id },
        }];
    }

    let Some(target) = target.filter(|target| !target.selector.trim().is_empty()) else {
        return vec![Effect::RejectStart {
            reason: StartRejection::NoActiveTarget,
        }];
    };

    let job_id: JobId = state.begin_job(target.clone());
    vec![
        Effect::BroadcastStatus {
            job_id,
            status: state.status().clone(),
        },
        Effect::ExtractFields { job_id, target },
    ]
}

fn finish(state: &mut JobState, status: JobStatus) -> Vec<Effect> {
    match state.finish_job(status.clone()) {
        Some(job_id) => vec![
            Effect::BroadcastStatus { job_id, status },
            Effect::ReleaseJob { job_id },
        ],
        None => Vec::new(),
    }
}
