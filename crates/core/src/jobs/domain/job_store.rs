use crate::jobs::domain::job::{JobError, JobId, JobStatus, ProgressEntry};

/// Point-in-time copy of a job, safe to hand to callers without
/// holding any store locks.
#[derive(Clone, Debug)]
pub struct JobSnapshot {
    pub id: JobId,
    pub status: JobStatus,
    pub progress: Vec<ProgressEntry>,
    pub result: Option<String>,
    pub language: Option<String>,
    pub error: Option<String>,
}

/// Registry of transcription jobs shared between the pipeline and
/// whoever is polling for status.
pub trait JobStore: Send + Sync {
    /// Registers a new pending job and returns its identifier.
    fn create(&self) -> Result<JobId, JobError>;

    fn mark_processing(&self, id: &JobId) -> Result<(), JobError>;

    fn append_progress(&self, id: &JobId, message: &str) -> Result<(), JobError>;

    fn finalize_success(&self, id: &JobId, transcript: &str, language: &str)
        -> Result<(), JobError>;

    fn finalize_error(&self, id: &JobId, message: &str) -> Result<(), JobError>;

    fn get(&self, id: &JobId) -> Result<JobSnapshot, JobError>;
}
