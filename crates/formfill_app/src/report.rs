use std::path::Path;

use chrono::Utc;
use formfill_core::{FieldValues, JobId, JobStatus};
use formfill_engine::{write_atomically, FormControl, LiveForm, PersistError};
use serde::Serialize;

/// Final outcome of one run, printed and optionally written to disk.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct RunReport {
    pub job_id: JobId,
    pub status: JobStatus,
    pub finished_utc: String,
    /// Decoded fragments in arrival order.
    pub fragments: Vec<FieldValues>,
    pub skipped: Vec<String>,
    pub controls: Vec<FormControl>,
}

impl RunReport {
    pub fn new(job_id: JobId, status: JobStatus) -> Self {
        Self {
            job_id,
            status,
            finished_utc: Utc::now().to_rfc3339(),
            fragments: Vec::new(),
            skipped: Vec::new(),
            controls: Vec::new(),
        }
    }

    pub fn with_form(mut self, form: Option<&LiveForm>) -> Self {
        self.controls = form.map(|form| form.controls().to_vec()).unwrap_or_default();
        self
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn write(&self, path: &Path) -> Result<(), PersistError> {
        let content = self.to_json().map_err(std::io::Error::from)?;
        write_atomically(path, &content)?;
        Ok(())
    }
}
