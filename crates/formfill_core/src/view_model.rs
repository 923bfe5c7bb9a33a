use crate::{JobId, JobStatus, JobTarget};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobView {
    pub status: JobStatus,
    pub job_id: Option<JobId>,
    pub target: Option<JobTarget>,
    pub attempt: Option<u32>,
    pub field_count: usize,
    pub fields_applied: usize,
    pub cancel_requested: bool,
}
