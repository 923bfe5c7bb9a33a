#![deny(missing_docs)]
//! Shared logging utilities for the formfill workspace.
//!
//! This crate provides the `fill_*` logging macros used across the codebase,
//! a per-thread job context for correlating log lines, the host logger
//! initializer and a minimal test initializer for the global logger.

use std::cell::Cell;
use std::fs::File;
use std::path::PathBuf;

#[doc(hidden)]
pub use log;

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

thread_local! {
    /// Id of the job the current thread is working on, if any.
    static JOB_CONTEXT: Cell<Option<u64>> = const { Cell::new(None) };
}

/// Records the job the current thread is working on.
/// The controller thread sets this when a job starts and clears it on release.
pub fn set_job_context(job_id: Option<u64>) {
    JOB_CONTEXT.with(|v| v.set(job_id));
}

/// Retrieves the job the current thread is working on, if any.
pub fn current_job() -> Option<u64> {
    JOB_CONTEXT.with(|v| v.get())
}

/// Logs a trace-level message using the global logging facade.
///
/// Every `fill_*` macro prefixes the message with `[job N]` while the
/// current thread has a job context.
#[macro_export]
macro_rules! fill_trace {
    ($($arg:tt)*) => {{
        match $crate::current_job() {
            Some(job) => $crate::log::trace!("[job {}] {}", job, format_args!($($arg)*)),
            None => $crate::log::trace!($($arg)*),
        }
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! fill_debug {
    ($($arg:tt)*) => {{
        match $crate::current_job() {
            Some(job) => $crate::log::debug!("[job {}] {}", job, format_args!($($arg)*)),
            None => $crate::log::debug!($($arg)*),
        }
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! fill_info {
    ($($arg:tt)*) => {{
        match $crate::current_job() {
            Some(job) => $crate::log::info!("[job {}] {}", job, format_args!($($arg)*)),
            None => $crate::log::info!($($arg)*),
        }
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! fill_warn {
    ($($arg:tt)*) => {{
        match $crate::current_job() {
            Some(job) => $crate::log::warn!("[job {}] {}", job, format_args!($($arg)*)),
            None => $crate::log::warn!($($arg)*),
        }
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! fill_error {
    ($($arg:tt)*) => {{
        match $crate::current_job() {
            Some(job) => $crate::log::error!("[job {}] {}", job, format_args!($($arg)*)),
            None => $crate::log::error!($($arg)*),
        }
    }};
}

/// Destination for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDestination {
    /// Write to ./formfill.log in current directory.
    File,
    /// Write to terminal (stderr for warnings, stdout otherwise).
    Terminal,
    /// Write to both file and terminal.
    Both,
}

/// Initialize the global logger with the specified destination.
///
/// For `LogDestination::File` or `Both`, creates `./formfill.log` in the
/// current working directory. A log file that cannot be created is reported
/// on stderr and skipped.
pub fn initialize(destination: LogDestination, level: LevelFilter) {
    let config = build_config();

    let loggers: Vec<Box<dyn SharedLogger>> = match destination {
        LogDestination::File => match create_file_logger(level, config) {
            Some(file_logger) => vec![file_logger],
            None => return,
        },
        LogDestination::Terminal => {
            vec![TermLogger::new(
                level,
                config,
                TerminalMode::Mixed,
                ColorChoice::Auto,
            )]
        }
        LogDestination::Both => {
            let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
                level,
                config.clone(),
                TerminalMode::Mixed,
                ColorChoice::Auto,
            )];
            if let Some(file_logger) = create_file_logger(level, config) {
                loggers.push(file_logger);
            }
            loggers
        }
    };

    let _ = CombinedLogger::init(loggers);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn create_file_logger(level: LevelFilter, config: Config) -> Option<Box<WriteLogger<File>>> {
    let log_path = PathBuf::from("./formfill.log");
    match File::create(&log_path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", log_path, err);
            None
        }
    }
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
