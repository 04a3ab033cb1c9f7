use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use crate::jobs::domain::job::{JobError, JobId, TranscriptionJob};
use crate::jobs::domain::job_store::{JobSnapshot, JobStore};

/// Process-local job registry. The outer map lock is held only to
/// insert or look up a handle; all mutation happens under the per-job
/// mutex so concurrent jobs never contend with each other.
#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Arc<Mutex<TranscriptionJob>>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, id: &JobId) -> Result<Arc<Mutex<TranscriptionJob>>, JobError> {
        let jobs = self.jobs.read().unwrap_or_else(|e| e.into_inner());
        jobs.get(id).cloned().ok_or_else(|| JobError::NotFound(id.clone()))
    }

    fn with_job<T>(
        &self,
        id: &JobId,
        f: impl FnOnce(&mut MutexGuard<'_, TranscriptionJob>) -> Result<T, JobError>,
    ) -> Result<T, JobError> {
        let handle = self.handle(id)?;
        let mut job = handle.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut job)
    }
}

impl JobStore for InMemoryJobStore {
    fn create(&self) -> Result<JobId, JobError> {
        let mut jobs = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        let id = JobId::generate();
        if jobs.contains_key(&id) {
            return Err(JobError::AlreadyExists(id));
        }
        jobs.insert(
            id.clone(),
            Arc::new(Mutex::new(TranscriptionJob::new(id.clone()))),
        );
        Ok(id)
    }

    fn mark_processing(&self, id: &JobId) -> Result<(), JobError> {
        self.with_job(id, |job| job.start())
    }

    fn append_progress(&self, id: &JobId, message: &str) -> Result<(), JobError> {
        self.with_job(id, |job| {
            job.append(message);
            Ok(())
        })
    }

    fn finalize_success(
        &self,
        id: &JobId,
        transcript: &str,
        language: &str,
    ) -> Result<(), JobError> {
        self.with_job(id, |job| job.succeed(transcript, language))
    }

    fn finalize_error(&self, id: &JobId, message: &str) -> Result<(), JobError> {
        self.with_job(id, |job| job.fail(message))
    }

    fn get(&self, id: &JobId) -> Result<JobSnapshot, JobError> {
        self.with_job(id, |job| {
            Ok(JobSnapshot {
                id: job.id().clone(),
                status: job.status(),
                progress: job.progress().to_vec(),
                result: job.result().map(String::from),
                language: job.language().map(String::from),
                error: job.error().map(String::from),
            })
        })
    }
}
