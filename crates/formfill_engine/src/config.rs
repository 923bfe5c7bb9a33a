use std::time::Duration;

use formfill_core::DEFAULT_MAX_ATTEMPTS;
use serde::{Deserialize, Serialize};

use crate::completion::CompletionSettings;

/// What the completion service is shown about the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadMode {
    #[default]
    FieldDefinitions,
    FormSnapshot,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub completion: CompletionSettings,
    /// Upper bound for one remote attempt, stream included.
    pub attempt_timeout: Duration,
    /// Total attempts per job, the first one included.
    pub max_attempts: u32,
    pub payload_mode: PayloadMode,
    pub custom_instruction: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            completion: CompletionSettings::default(),
            attempt_timeout: Duration::from_secs(60),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            payload_mode: PayloadMode::default(),
            custom_instruction: None,
        }
    }
}
