mod cli;
mod config;
mod report;

use std::fs;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use formfill_core::{JobPhase, StartRequest, TabId};
use formfill_engine::{decode_page, EngineEvent, EngineHandle, StaticPages};
use formfill_logging::{fill_info, fill_warn};
use log::LevelFilter;

use cli::Cli;
use config::{AppConfig, API_KEY_VAR};
use report::RunReport;

/// The single page loaded from disk is served under this tab.
const PAGE_TAB: TabId = 1;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let (config, note) = AppConfig::load(&cli.config);
    let config = config.with_overrides(std::env::var(API_KEY_VAR).ok(), &cli);

    let level = config.log_level();
    formfill_logging::initialize(cli.log.into(), level.unwrap_or(LevelFilter::Info));
    if let Some(note) = note {
        fill_warn!("{note}; using defaults");
    }
    if level.is_none() {
        fill_warn!("unknown log level `{}`, using info", config.log_level);
    }

    match run(&cli, &config) {
        Ok(JobPhase::Success) => ExitCode::SUCCESS,
        Ok(JobPhase::Canceled) => ExitCode::from(130),
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, config: &AppConfig) -> anyhow::Result<JobPhase> {
    let bytes = fs::read(&cli.page)
        .with_context(|| format!("failed to read page {}", cli.page.display()))?;
    let page = decode_page(&bytes, None)
        .with_context(|| format!("failed to decode page {}", cli.page.display()))?;
    fill_info!(
        "loaded {} ({} bytes, {})",
        cli.page.display(),
        bytes.len(),
        page.encoding_label
    );

    let pages = StaticPages::new().with_page(PAGE_TAB, page.html);
    let engine = EngineHandle::with_openai(config.engine_config(), Arc::new(pages));

    let canceler = engine.cancel_handle();
    if let Err(err) = ctrlc::set_handler(move || canceler.cancel()) {
        fill_warn!("Ctrl-C will not cancel the job: {err}");
    }

    let job_id = engine.start(StartRequest::new(PAGE_TAB, cli.selector.clone()))?;
    let mut fragments = Vec::new();
    let mut skipped = Vec::new();

    while let Some(event) = engine.recv() {
        match event {
            EngineEvent::StatusChanged { status, .. } => {
                eprintln!(
                    "{:?}: {}",
                    status.phase,
                    status.message.as_deref().unwrap_or("")
                );
            }
            EngineEvent::FieldValuesReady { values, report, .. } => {
                println!("{}", serde_json::to_string(&values)?);
                skipped.extend(report.skipped);
                fragments.push(values);
            }
            EngineEvent::JobFinished { status, form, .. } => {
                let phase = status.phase;
                let mut report = RunReport::new(job_id, status).with_form(form.as_ref());
                report.fragments = fragments;
                report.skipped = skipped;
                println!("{}", report.to_json()?);
                if let Some(path) = &cli.output {
                    report
                        .write(path)
                        .with_context(|| format!("failed to write report {}", path.display()))?;
                    fill_info!("report written to {}", path.display());
                }
                return Ok(phase);
            }
        }
    }
    bail!("the controller stopped before job {job_id} finished")
}
