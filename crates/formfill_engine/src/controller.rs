//! Job lifecycle controller: owns the core state machine and executes its effects.
//!
//! The controller runs on its own thread with a current-thread tokio runtime.
//! Hosts talk to it through [`EngineHandle`]; remote attempts run as spawned
//! tasks whose fragments come back over a channel, so decoding and population
//! always happen on the controller, one fragment at a time, in arrival order.

use std::collections::{HashMap, VecDeque};
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread;
use std::time::Duration;

use formfill_core::{
    update, Effect, FieldValues, JobId, JobPhase, JobState, JobStatus, JobTarget, JobView, Msg,
    StartRejection, StartRequest, TabId,
};
use formfill_logging::{fill_debug, fill_error, fill_info, fill_warn, set_job_context};
use scraper::Html;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::completion::{CompletionService, FragmentSink, OpenAiClient};
use crate::config::{EngineConfig, PayloadMode};
use crate::decode::StreamDecoder;
use crate::extract::extract_field_definitions;
use crate::form::LiveForm;
use crate::populate::populate;
use crate::prompt::{build_request, CompletionRequest, FormPayload};
use crate::select::{resolve_form, SelectionError};
use crate::snapshot::snapshot_form;
use crate::{CompletionError, ConfigurationError, EngineEvent, FailureKind, JobError};

/// Resolves a tab to the current HTML of its page.
pub trait PageSource: Send + Sync {
    fn page(&self, tab: TabId) -> Option<String>;

    fn has_page(&self, tab: TabId) -> bool {
        self.page(tab).is_some()
    }
}

/// Fixed set of pages held in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticPages {
    pages: HashMap<TabId, String>,
}

impl StaticPages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, tab: TabId, html: impl Into<String>) -> Self {
        self.insert(tab, html);
        self
    }

    pub fn insert(&mut self, tab: TabId, html: impl Into<String>) {
        self.pages.insert(tab, html.into());
    }
}

impl PageSource for StaticPages {
    fn page(&self, tab: TabId) -> Option<String> {
        self.pages.get(&tab).cloned()
    }

    fn has_page(&self, tab: TabId) -> bool {
        self.pages.contains_key(&tab)
    }
}

enum Command {
    Start {
        request: StartRequest,
        reply: std_mpsc::Sender<Result<JobId, JobError>>,
    },
    Cancel,
}

/// Host-side handle to the controller thread.
///
/// Dropping the handle stops the controller and aborts any running job, even
/// while [`CancelHandle`] clones are still alive.
pub struct EngineHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
    shutdown: CancellationToken,
    event_rx: std_mpsc::Receiver<EngineEvent>,
    status_rx: watch::Receiver<JobStatus>,
    view_rx: watch::Receiver<JobView>,
}

impl EngineHandle {
    pub fn new(
        config: EngineConfig,
        pages: Arc<dyn PageSource>,
        service: Arc<dyn CompletionService>,
    ) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = std_mpsc::channel();
        let (status_tx, status_rx) = watch::channel(JobStatus::idle());
        let (view_tx, view_rx) = watch::channel(JobView::default());
        let shutdown = CancellationToken::new();
        let stop = shutdown.clone();

        thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    fill_error!("could not start controller runtime: {}", err);
                    return;
                }
            };
            let (pipeline_tx, pipeline_rx) = mpsc::unbounded_channel();
            let controller = Controller {
                state: JobState::with_max_attempts(config.max_attempts),
                config,
                pages,
                service,
                job: None,
                events: event_tx,
                status: status_tx,
                view: view_tx,
                pipeline_tx,
            };
            runtime.block_on(controller.run(cmd_rx, pipeline_rx, stop));
        });

        Self {
            cmd_tx,
            shutdown,
            event_rx,
            status_rx,
            view_rx,
        }
    }

    /// Controller backed by [`OpenAiClient`] built from `config.completion`.
    pub fn with_openai(config: EngineConfig, pages: Arc<dyn PageSource>) -> Self {
        let service = Arc::new(OpenAiClient::new(config.completion.clone()));
        Self::new(config, pages, service)
    }

    /// Start a job and return its id once the controller accepted it.
    ///
    /// Blocks until the controller replied; do not call from async code.
    pub fn start(&self, request: StartRequest) -> Result<JobId, JobError> {
        let (reply, reply_rx) = std_mpsc::channel();
        self.cmd_tx
            .send(Command::Start { request, reply })
            .map_err(|_| JobError::ControllerStopped)?;
        reply_rx.recv().map_err(|_| JobError::ControllerStopped)?
    }

    /// Request cancellation of the running job. Does nothing when idle.
    pub fn cancel(&self) {
        let _ = self.cmd_tx.send(Command::Cancel);
    }

    /// A cloneable handle that can cancel from any thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cmd_tx: self.cmd_tx.clone(),
        }
    }

    /// Last broadcast status.
    pub fn status(&self) -> JobStatus {
        self.status_rx.borrow().clone()
    }

    /// Snapshot of the controller's job state, updated after every message.
    pub fn view(&self) -> JobView {
        self.view_rx.borrow().clone()
    }

    /// A receiver that is notified on every status broadcast.
    pub fn status_updates(&self) -> watch::Receiver<JobStatus> {
        self.status_rx.clone()
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Wait for the next event; `None` once the controller has stopped.
    pub fn recv(&self) -> Option<EngineEvent> {
        self.event_rx.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Cancels the running job from any thread. Does not keep the controller alive.
#[derive(Clone)]
pub struct CancelHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.cmd_tx.send(Command::Cancel);
    }
}

/// Progress of a remote attempt, sent from its task to the controller.
enum PipelineEvent {
    Fragment {
        job_id: JobId,
        attempt: u32,
        text: String,
    },
    Finished {
        job_id: JobId,
        attempt: u32,
    },
    Failed {
        job_id: JobId,
        attempt: u32,
        error: CompletionError,
    },
}

struct ChannelFragmentSink {
    job_id: JobId,
    attempt: u32,
    tx: mpsc::UnboundedSender<PipelineEvent>,
}

impl FragmentSink for ChannelFragmentSink {
    fn fragment(&self, text: &str) {
        let _ = self.tx.send(PipelineEvent::Fragment {
            job_id: self.job_id,
            attempt: self.attempt,
            text: text.to_string(),
        });
    }
}

/// Resources of the running job that live outside the core state.
struct ActiveJob {
    job_id: JobId,
    attempt: u32,
    form: Option<LiveForm>,
    decoder: StreamDecoder,
    request: Option<Arc<CompletionRequest>>,
    cancel: CancellationToken,
}

#[derive(Debug, Error)]
enum PrepareError {
    #[error("tab {0} has no page")]
    MissingPage(TabId),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("could not encode form description: {0}")]
    Payload(#[from] serde_json::Error),
}

struct Prepared {
    form: LiveForm,
    field_count: usize,
    request: CompletionRequest,
}

struct Controller {
    state: JobState,
    config: EngineConfig,
    pages: Arc<dyn PageSource>,
    service: Arc<dyn CompletionService>,
    job: Option<ActiveJob>,
    events: std_mpsc::Sender<EngineEvent>,
    status: watch::Sender<JobStatus>,
    view: watch::Sender<JobView>,
    pipeline_tx: mpsc::UnboundedSender<PipelineEvent>,
}

impl Controller {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut pipeline: mpsc::UnboundedReceiver<PipelineEvent>,
        shutdown: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(event) = pipeline.recv() => self.handle_pipeline(event),
            }
        }
        if let Some(job) = self.job.take() {
            job.cancel.cancel();
        }
        fill_debug!("controller stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Start { request, reply } => {
                let target = request
                    .tab_id
                    .filter(|tab| self.pages.has_page(*tab))
                    .map(|tab_id| JobTarget {
                        tab_id,
                        selector: request.selector.clone(),
                    });
                let effects = self.dispatch(Msg::StartRequested { target });
                let result = start_result(&effects);
                self.execute(effects);
                let _ = reply.send(result);
            }
            Command::Cancel => {
                let effects = self.dispatch(Msg::CancelRequested);
                self.execute(effects);
            }
        }
    }

    fn handle_pipeline(&mut self, event: PipelineEvent) {
        let msg = match event {
            PipelineEvent::Fragment {
                job_id,
                attempt,
                text,
            } => {
                let Some(job) = self
                    .job
                    .as_mut()
                    .filter(|job| job.job_id == job_id && job.attempt == attempt)
                else {
                    return;
                };
                match job.decoder.push(&text) {
                    Some(values) => Msg::ValuesDecoded { job_id, values },
                    None => return,
                }
            }
            PipelineEvent::Finished { job_id, attempt } => {
                Msg::CompletionFinished { job_id, attempt }
            }
            PipelineEvent::Failed {
                job_id,
                attempt,
                error,
            } => {
                if error.kind != FailureKind::Cancelled {
                    fill_warn!("attempt {} of job {} failed: {}", attempt, job_id, error);
                }
                Msg::CompletionFailed {
                    job_id,
                    attempt,
                    retryable: error.kind.is_retryable(),
                    message: error.to_string(),
                }
            }
        };
        let effects = self.dispatch(msg);
        self.execute(effects);
    }

    fn dispatch(&mut self, msg: Msg) -> Vec<Effect> {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.view.send_replace(state.view());
        self.state = state;
        effects
    }

    /// Run effects, feeding any follow-up messages back through the state machine.
    fn execute(&mut self, effects: Vec<Effect>) {
        let mut queue: VecDeque<Effect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            if let Some(msg) = self.apply(effect) {
                queue.extend(self.dispatch(msg));
            }
        }
    }

    fn apply(&mut self, effect: Effect) -> Option<Msg> {
        match effect {
            Effect::RejectStart { reason } => {
                fill_warn!("start rejected: {:?}", reason);
                None
            }
            Effect::BroadcastStatus { job_id, status } => {
                fill_info!("job {} is now {:?}", job_id, status.phase);
                self.status.send_replace(status.clone());
                let _ = self.events.send(EngineEvent::StatusChanged { job_id, status });
                None
            }
            Effect::ExtractFields { job_id, target } => {
                set_job_context(Some(job_id));
                let mut job = ActiveJob {
                    job_id,
                    attempt: 0,
                    form: None,
                    decoder: StreamDecoder::new(),
                    request: None,
                    cancel: CancellationToken::new(),
                };
                let msg = match self.prepare(&target) {
                    Ok(prepared) => {
                        fill_info!(
                            "job {}: {} field(s) in `{}`",
                            job_id,
                            prepared.field_count,
                            target.selector
                        );
                        job.form = Some(prepared.form);
                        job.request = Some(Arc::new(prepared.request));
                        Msg::FieldsExtracted {
                            job_id,
                            field_count: prepared.field_count,
                        }
                    }
                    Err(PrepareError::Configuration(err)) => Msg::ConfigurationInvalid {
                        job_id,
                        message: err.to_string(),
                    },
                    Err(err) => Msg::ExtractionFailed {
                        job_id,
                        message: err.to_string(),
                    },
                };
                self.job = Some(job);
                Some(msg)
            }
            Effect::RequestCompletion { job_id, attempt } => {
                self.spawn_attempt(job_id, attempt);
                None
            }
            Effect::AbortCompletion { job_id } => {
                if let Some(job) = self.job.as_ref().filter(|job| job.job_id == job_id) {
                    fill_info!("job {}: cancel requested", job_id);
                    job.cancel.cancel();
                }
                None
            }
            Effect::ApplyValues { job_id, values } => {
                self.apply_values(job_id, values);
                None
            }
            Effect::ReleaseJob { job_id } => {
                let job = self.job.take().filter(|job| job.job_id == job_id);
                if let Some(job) = &job {
                    job.cancel.cancel();
                }
                let status = self.state.status().clone();
                match status.phase {
                    JobPhase::Error => fill_error!(
                        "job {} failed: {}",
                        job_id,
                        status.message.as_deref().unwrap_or_default()
                    ),
                    phase => fill_info!("job {} finished: {:?}", job_id, phase),
                }
                let _ = self.events.send(EngineEvent::JobFinished {
                    job_id,
                    status,
                    form: job.and_then(|job| job.form),
                });
                set_job_context(None);
                None
            }
        }
    }

    fn prepare(&self, target: &JobTarget) -> Result<Prepared, PrepareError> {
        let html = self
            .pages
            .page(target.tab_id)
            .ok_or(PrepareError::MissingPage(target.tab_id))?;
        let document = Html::parse_document(&html);
        let form = resolve_form(&document, &target.selector)?;

        let definitions = extract_field_definitions(form);
        let field_count = definitions.len();
        let payload = match self.config.payload_mode {
            PayloadMode::FieldDefinitions => FormPayload::Definitions(definitions),
            PayloadMode::FormSnapshot => FormPayload::Snapshot(snapshot_form(form)),
        };
        let live = LiveForm::from_element(form);

        self.service.validate()?;
        let request = build_request(&payload, self.config.custom_instruction.as_deref())?;
        Ok(Prepared {
            form: live,
            field_count,
            request,
        })
    }

    fn spawn_attempt(&mut self, job_id: JobId, attempt: u32) {
        let Some(job) = self.job.as_mut().filter(|job| job.job_id == job_id) else {
            return;
        };
        let Some(request) = job.request.clone() else {
            return;
        };
        if attempt > 1 {
            fill_warn!("job {}: retrying, attempt {}", job_id, attempt);
            job.decoder.reset();
        }
        job.attempt = attempt;

        let cancel = job.cancel.clone();
        let service = Arc::clone(&self.service);
        let tx = self.pipeline_tx.clone();
        let timeout = self.config.attempt_timeout;
        tokio::spawn(async move {
            let sink = ChannelFragmentSink {
                job_id,
                attempt,
                tx: tx.clone(),
            };
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(CompletionError {
                    kind: FailureKind::Cancelled,
                    message: "request aborted".to_string(),
                }),
                outcome = tokio::time::timeout(timeout, service.stream_completion(&request, &sink)) => {
                    outcome.unwrap_or_else(|_| Err(CompletionError {
                        kind: FailureKind::Timeout,
                        message: format!("no complete response within {:?}", timeout),
                    }))
                }
            };
            let event = match result {
                Ok(()) => PipelineEvent::Finished { job_id, attempt },
                Err(error) => PipelineEvent::Failed {
                    job_id,
                    attempt,
                    error,
                },
            };
            let _ = tx.send(event);
        });
    }

    fn apply_values(&mut self, job_id: JobId, values: FieldValues) {
        let Some(form) = self
            .job
            .as_mut()
            .filter(|job| job.job_id == job_id)
            .and_then(|job| job.form.as_mut())
        else {
            return;
        };
        let report = populate(form, &values);
        let events = form.take_events();
        fill_debug!(
            "job {}: applied {} field(s), skipped {}",
            job_id,
            report.applied.len(),
            report.skipped.len()
        );
        let _ = self.events.send(EngineEvent::FieldValuesReady {
            job_id,
            values,
            report,
            events,
        });
    }
}

fn start_result(effects: &[Effect]) -> Result<JobId, JobError> {
    effects
        .iter()
        .find_map(|effect| match effect {
            Effect::RejectStart {
                reason: StartRejection::NoActiveTarget,
            } => Some(Err(JobError::NoActiveTarget)),
            Effect::RejectStart {
                reason: StartRejection::AlreadyRunning { job_id },
            } => Some(Err(JobError::AlreadyRunning { job_id: *job_id })),
            Effect::ExtractFields { job_id, .. } => Some(Ok(*job_id)),
            _ => None,
        })
        .unwrap_or(Err(JobError::NoActiveTarget))
}
