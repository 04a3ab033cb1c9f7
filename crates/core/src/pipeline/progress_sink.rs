use std::sync::Arc;

use crate::jobs::domain::job::JobId;
use crate::jobs::domain::job_store::JobStore;

/// Cross-cutting destination for human-readable pipeline progress.
///
/// Decouples the orchestration code from how progress is surfaced, so
/// the same pipeline can feed a job log, plain logging, or nothing.
pub trait ProgressSink: Send + Sync {
    fn progress(&self, message: &str);
}

/// Silent sink that discards all messages. Used by tests.
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn progress(&self, _message: &str) {}
}

/// Appends every message to one job's progress log and mirrors it to
/// the application log. Store errors are logged and swallowed: losing
/// a progress line must not fail the pipeline.
pub struct JobProgressSink {
    store: Arc<dyn JobStore>,
    job: JobId,
}

impl JobProgressSink {
    pub fn new(store: Arc<dyn JobStore>, job: JobId) -> Self {
        Self { store, job }
    }
}

impl ProgressSink for JobProgressSink {
    fn progress(&self, message: &str) {
        log::info!("Job {}: {}", self.job, message);
        if let Err(e) = self.store.append_progress(&self.job, message) {
            log::warn!("Job {}: failed to record progress: {}", self.job, e);
        }
    }
}
