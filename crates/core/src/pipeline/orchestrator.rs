use thiserror::Error;

use crate::segmentation::domain::chunk::Chunk;
use crate::shared::constants::DEFAULT_MAX_CONCURRENCY;
use crate::transcription::domain::backend::{BackendAdapter, BackendError};

use super::progress_sink::ProgressSink;

/// Caller-supplied knobs for one transcription run.
#[derive(Clone, Debug)]
pub struct TranscribeRequest {
    /// ISO language code, or "auto" to let the backend detect it.
    pub language: String,
    /// Domain vocabulary hint forwarded to backends that accept one.
    pub context_prompt: String,
    /// Upper bound on concurrent backend calls.
    pub max_concurrency: usize,
}

impl Default for TranscribeRequest {
    fn default() -> Self {
        Self {
            language: String::from("auto"),
            context_prompt: String::new(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// Final transcript assembled from all chunks in playback order.
#[derive(Clone, Debug)]
pub struct AggregatedTranscript {
    pub text: String,
    pub language: String,
}

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("chunk {chunk} failed with a non-retryable error: {source}")]
    Fatal {
        chunk: usize,
        #[source]
        source: BackendError,
    },

    #[error("chunk {chunk} still failing after {attempts} attempts: {source}")]
    RetriesExhausted {
        chunk: usize,
        attempts: u32,
        #[source]
        source: BackendError,
    },

    #[error("no result produced for chunk {chunk}")]
    MissingResult { chunk: usize },
}

/// Abstracts how the per-chunk backend calls are scheduled.
///
/// This is a port (application-layer interface). Infrastructure provides
/// concrete implementations (e.g. a bounded worker pool).
pub trait ChunkOrchestrator: Send + Sync {
    /// Transcribes every chunk and aggregates the results in chunk
    /// order. Any chunk failure fails the whole run; partial
    /// transcripts are never returned.
    fn transcribe_chunks(
        &self,
        chunks: &[Chunk],
        backend: &dyn BackendAdapter,
        request: &TranscribeRequest,
        progress: &dyn ProgressSink,
    ) -> Result<AggregatedTranscript, OrchestratorError>;
}
