use formfill_core::{
    update, Effect, FieldValue, FieldValues, JobPhase, JobState, JobStatus, JobTarget, Msg,
};
use pretty_assertions::assert_eq;

fn running_job(state: JobState) -> (JobState, Vec<Effect>) {
    let (state, _) = update(
        state,
        Msg::StartRequested {
            target: Some(JobTarget {
                tab_id: 1,
                selector: "form".to_string(),
            }),
        },
    );
    update(
        state,
        Msg::FieldsExtracted {
            job_id: 1,
            field_count: 2,
        },
    )
}

fn values(pairs: &[(&str, &str)]) -> FieldValues {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), FieldValue::from(*value)))
        .collect()
}

/// Every broadcast status for one job, in order.
fn broadcasts(effects: &[Effect]) -> Vec<JobPhase> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            Effect::BroadcastStatus { status, .. } => Some(status.phase),
            _ => None,
        })
        .collect()
}

#[test]
fn extracted_fields_request_first_attempt() {
    let (state, effects) = running_job(JobState::new());

    assert_eq!(
        effects,
        vec![Effect::RequestCompletion {
            job_id: 1,
            attempt: 1
        }]
    );
    let view = state.view();
    assert_eq!(view.attempt, Some(1));
    assert_eq!(view.field_count, 2);
}

#[test]
fn decoded_values_are_applied_then_job_succeeds() {
    let (state, _) = running_job(JobState::new());
    let (state, effects) = update(
        state,
        Msg::ValuesDecoded {
            job_id: 1,
            values: values(&[("email", "a@b.com")]),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::ApplyValues {
            job_id: 1,
            values: values(&[("email", "a@b.com")]),
        }]
    );
    assert_eq!(state.view().fields_applied, 1);

    let (state, effects) = update(
        state,
        Msg::CompletionFinished {
            job_id: 1,
            attempt: 1,
        },
    );
    assert_eq!(state.status(), &JobStatus::success("Populated 1 field(s)"));
    assert_eq!(
        effects,
        vec![
            Effect::BroadcastStatus {
                job_id: 1,
                status: JobStatus::success("Populated 1 field(s)"),
            },
            Effect::ReleaseJob { job_id: 1 },
        ]
    );
}

#[test]
fn empty_value_batches_are_not_applied() {
    let (state, _) = running_job(JobState::new());
    let (_state, effects) = update(
        state,
        Msg::ValuesDecoded {
            job_id: 1,
            values: FieldValues::new(),
        },
    );
    assert!(effects.is_empty());
}

#[test]
fn remote_failure_is_retried_once_then_reported() {
    let (state, _) = running_job(JobState::new());
    let (state, effects) = update(
        state,
        Msg::CompletionFailed {
            job_id: 1,
            attempt: 1,
            message: "http status 503".to_string(),
            retryable: true,
        },
    );
    assert_eq!(state.status().phase, JobPhase::Processing);
    assert_eq!(
        effects,
        vec![Effect::RequestCompletion {
            job_id: 1,
            attempt: 2
        }]
    );

    let (state, effects) = update(
        state,
        Msg::CompletionFailed {
            job_id: 1,
            attempt: 2,
            message: "http status 503".to_string(),
            retryable: true,
        },
    );
    assert_eq!(state.status(), &JobStatus::error("http status 503"));
    assert_eq!(broadcasts(&effects), vec![JobPhase::Error]);
}

#[test]
fn single_attempt_configuration_never_retries() {
    let (state, _) = running_job(JobState::with_max_attempts(1));
    let (state, effects) = update(
        state,
        Msg::CompletionFailed {
            job_id: 1,
            attempt: 1,
            message: "timeout".to_string(),
            retryable: true,
        },
    );
    assert_eq!(state.status().phase, JobPhase::Error);
    assert_eq!(broadcasts(&effects), vec![JobPhase::Error]);
}

#[test]
fn cancel_aborts_and_abort_resolves_to_canceled() {
    let (state, _) = running_job(JobState::new());
    let (state, effects) = update(state, Msg::CancelRequested);
    assert_eq!(effects, vec![Effect::AbortCompletion { job_id: 1 }]);
    assert!(state.view().cancel_requested);
    assert_eq!(state.status().phase, JobPhase::Processing);

    // A second cancel does not abort twice.
    let (state, effects) = update(state, Msg::CancelRequested);
    assert!(effects.is_empty());

    // Values still in the channel are dropped after a cancel.
    let (state, effects) = update(
        state,
        Msg::ValuesDecoded {
            job_id: 1,
            values: values(&[("name", "John")]),
        },
    );
    assert!(effects.is_empty());

    // The abort surfaces as a retryable transport failure; it must not retry.
    let (state, effects) = update(
        state,
        Msg::CompletionFailed {
            job_id: 1,
            attempt: 1,
            message: "request aborted".to_string(),
            retryable: true,
        },
    );
    assert_eq!(state.status(), &JobStatus::canceled());
    assert_eq!(broadcasts(&effects), vec![JobPhase::Canceled]);
}

#[test]
fn stale_messages_never_produce_a_second_terminal_status() {
    let (state, _) = running_job(JobState::new());
    let (state, _) = update(
        state,
        Msg::CompletionFinished {
            job_id: 1,
            attempt: 1,
        },
    );
    assert_eq!(state.status().phase, JobPhase::Success);

    let (state, effects) = update(
        state,
        Msg::CompletionFailed {
            job_id: 1,
            attempt: 1,
            message: "late".to_string(),
            retryable: false,
        },
    );
    assert!(effects.is_empty());
    assert_eq!(state.status().phase, JobPhase::Success);
}

#[test]
fn status_sequence_starts_processing_and_ends_with_one_terminal() {
    let mut all_effects = Vec::new();
    let (state, effects) = update(
        JobState::new(),
        Msg::StartRequested {
            target: Some(JobTarget {
                tab_id: 1,
                selector: "form".to_string(),
            }),
        },
    );
    all_effects.extend(effects);

    let script = vec![
        Msg::FieldsExtracted {
            job_id: 1,
            field_count: 1,
        },
        Msg::CompletionFailed {
            job_id: 1,
            attempt: 1,
            message: "network error".to_string(),
            retryable: true,
        },
        Msg::ValuesDecoded {
            job_id: 1,
            values: values(&[("email", "a@b.com")]),
        },
        Msg::CompletionFinished {
            job_id: 1,
            attempt: 2,
        },
        Msg::CompletionFinished {
            job_id: 1,
            attempt: 2,
        },
        Msg::CancelRequested,
    ];
    let mut state = state;
    for msg in script {
        let (next, effects) = update(state, msg);
        all_effects.extend(effects);
        state = next;
    }

    assert_eq!(
        broadcasts(&all_effects),
        vec![JobPhase::Processing, JobPhase::Success]
    );
}
