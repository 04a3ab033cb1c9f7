use std::path::PathBuf;

use thiserror::Error;

use crate::jobs::domain::job::JobError;
use crate::media::domain::error::MediaError;
use crate::pipeline::orchestrator::OrchestratorError;

/// Anything that can fail a transcription job end to end.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("file type not allowed: {0}")]
    UnsupportedFile(PathBuf),

    #[error("chunk directory {0} escapes the work directory")]
    ChunkDirEscapes(PathBuf),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("failed to prepare work directory {path}")]
    WorkDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
