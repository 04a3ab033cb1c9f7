use std::fmt;
use std::time::Instant;

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum JobError {
    #[error("job {0} not found")]
    NotFound(JobId),

    #[error("job {0} already exists")]
    AlreadyExists(JobId),

    #[error("job cannot move from {from} to {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Processing,
    Finished,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Error)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Finished => "finished",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// One line of the append-only progress log, stamped with the seconds
/// elapsed since the job was created.
#[derive(Clone, Debug)]
pub struct ProgressEntry {
    pub elapsed_secs: u64,
    pub message: String,
}

impl fmt::Display for ProgressEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[+{}s] {}", self.elapsed_secs, self.message)
    }
}

/// Tracks one transcription request from submission to its terminal
/// state. Transitions only move forward: pending, processing, then
/// finished or error, and the progress log is append-only.
#[derive(Debug)]
pub struct TranscriptionJob {
    id: JobId,
    status: JobStatus,
    progress: Vec<ProgressEntry>,
    result: Option<String>,
    language: Option<String>,
    error: Option<String>,
    created_at: Instant,
}

impl TranscriptionJob {
    pub fn new(id: JobId) -> Self {
        let mut job = Self {
            id,
            status: JobStatus::Pending,
            progress: Vec::new(),
            result: None,
            language: None,
            error: None,
            created_at: Instant::now(),
        };
        job.append("Job created.");
        job
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn progress(&self) -> &[ProgressEntry] {
        &self.progress
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn start(&mut self) -> Result<(), JobError> {
        self.transition(JobStatus::Pending, JobStatus::Processing)
    }

    pub fn append(&mut self, message: impl Into<String>) {
        self.progress.push(ProgressEntry {
            elapsed_secs: self.created_at.elapsed().as_secs(),
            message: message.into(),
        });
    }

    pub fn succeed(
        &mut self,
        transcript: impl Into<String>,
        language: impl Into<String>,
    ) -> Result<(), JobError> {
        self.transition(JobStatus::Processing, JobStatus::Finished)?;
        self.result = Some(transcript.into());
        self.language = Some(language.into());
        Ok(())
    }

    /// Moves to `Error`, keeping the message both as the final error and
    /// as the last progress line so pollers see it either way.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), JobError> {
        self.transition(JobStatus::Processing, JobStatus::Error)?;
        let message = message.into();
        self.append(message.clone());
        self.error = Some(message);
        Ok(())
    }

    fn transition(&mut self, from: JobStatus, to: JobStatus) -> Result<(), JobError> {
        if self.status != from {
            return Err(JobError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}
