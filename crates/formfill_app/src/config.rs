//! Binary configuration: an optional RON file, then environment, then flags.

use std::fs;
use std::path::Path;
use std::time::Duration;

use formfill_engine::{CompletionSettings, EngineConfig, PayloadMode};
use formfill_logging::fill_info;
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

pub(crate) const API_KEY_VAR: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    pub base_url: String,
    pub model: String,
    /// Normally left out of the file and taken from the environment.
    pub api_key: Option<String>,
    pub connect_timeout_secs: u64,
    pub attempt_timeout_secs: u64,
    pub max_attempts: u32,
    pub payload_mode: PayloadMode,
    pub custom_instruction: Option<String>,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            base_url: engine.completion.base_url,
            model: engine.completion.model,
            api_key: None,
            connect_timeout_secs: engine.completion.connect_timeout.as_secs(),
            attempt_timeout_secs: engine.attempt_timeout.as_secs(),
            max_attempts: engine.max_attempts,
            payload_mode: engine.payload_mode,
            custom_instruction: None,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Read `path`; a missing or unparsable file yields the defaults.
    ///
    /// Runs before the logger exists, so problems are returned as notes.
    pub fn load(path: &Path) -> (Self, Option<String>) {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return (Self::default(), None);
            }
            Err(err) => {
                return (
                    Self::default(),
                    Some(format!("could not read {}: {err}", path.display())),
                );
            }
        };
        match ron::from_str(&content) {
            Ok(config) => (config, None),
            Err(err) => (
                Self::default(),
                Some(format!("could not parse {}: {err}", path.display())),
            ),
        }
    }

    /// Apply the API key variable (when set and non-blank) and command line overrides.
    pub fn with_overrides(mut self, api_key_env: Option<String>, cli: &Cli) -> Self {
        if let Some(key) = api_key_env.filter(|key| !key.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(model) = &cli.model {
            self.model = model.clone();
        }
        if cli.snapshot {
            self.payload_mode = PayloadMode::FormSnapshot;
        }
        if let Some(instruction) = &cli.instruction {
            self.custom_instruction = Some(instruction.clone());
        }
        self
    }

    /// `None` when the configured level is not a `log` level name.
    pub fn log_level(&self) -> Option<LevelFilter> {
        self.log_level.trim().parse().ok()
    }

    pub fn engine_config(&self) -> EngineConfig {
        fill_info!(
            "completion endpoint {} with model {}",
            self.base_url,
            self.model
        );
        EngineConfig {
            completion: CompletionSettings {
                base_url: self.base_url.clone(),
                api_key: self.api_key.clone(),
                model: self.model.clone(),
                connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            },
            attempt_timeout: Duration::from_secs(self.attempt_timeout_secs.max(1)),
            max_attempts: self.max_attempts,
            payload_mode: self.payload_mode,
            custom_instruction: self.custom_instruction.clone(),
        }
    }
}
