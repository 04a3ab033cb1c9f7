use std::path::Path;

use thiserror::Error;

/// Speech-to-text backend failure.
///
/// The orchestrator only distinguishes transient kinds (retried with
/// backoff) from fatal ones (abort immediately); the specific variant is
/// kept for error messages, not interpreted further.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("{backend} rate limit exceeded: {message}")]
    RateLimited { backend: &'static str, message: String },

    #[error("{backend} unavailable: {message}")]
    Unavailable { backend: &'static str, message: String },

    #[error("{backend} request timed out: {message}")]
    Timeout { backend: &'static str, message: String },

    #[error("invalid input for {backend}: {message}")]
    InvalidArgument { backend: &'static str, message: String },

    #[error("{backend} authentication failed: {message}")]
    Auth { backend: &'static str, message: String },

    #[error("unexpected {backend} error: {message}")]
    Unexpected { backend: &'static str, message: String },
}

impl BackendError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Unavailable { .. } | Self::Timeout { .. }
        )
    }
}

/// What a backend can accept, declared instead of special-cased.
#[derive(Clone, Copy, Debug)]
pub struct BackendCapabilities {
    pub name: &'static str,
    pub max_file_bytes: u64,
    pub max_chunk_ms: u64,
    pub supports_language_hint: bool,
    pub supports_context_prompt: bool,
}

/// One transcribed chunk as reported by a backend.
///
/// `detected_language` is `None` when the model detected the language
/// implicitly without reporting it; the aggregation layer substitutes the
/// documented default in that case.
#[derive(Clone, Debug)]
pub struct BackendTranscript {
    pub text: String,
    pub detected_language: Option<String>,
}

/// External speech-to-text capability, invoked once per chunk.
///
/// Calls are blocking network I/O and are made concurrently from worker
/// threads, so implementations must be `Send + Sync`.
pub trait BackendAdapter: Send + Sync {
    fn capabilities(&self) -> BackendCapabilities;

    fn transcribe(
        &self,
        chunk: &Path,
        language_hint: Option<&str>,
        context_prompt: &str,
    ) -> Result<BackendTranscript, BackendError>;
}
