use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use log::{debug, warn};

use crate::pipeline::orchestrator::{
    AggregatedTranscript, ChunkOrchestrator, OrchestratorError, TranscribeRequest,
};
use crate::pipeline::progress_sink::ProgressSink;
use crate::segmentation::domain::chunk::Chunk;
use crate::shared::constants::DEFAULT_DETECTED_LANGUAGE;
use crate::transcription::domain::backend::{
    BackendAdapter, BackendCapabilities, BackendError,
};
use crate::transcription::domain::chunk_result::ChunkResult;
use crate::transcription::domain::retry::RetryPolicy;

/// Transcribes chunks on a bounded pool of OS threads.
///
/// Workers pull chunk indices from a shared queue, so fast chunks never
/// wait on slow ones beyond the pool bound. The first failure flips an
/// abort flag: in-flight calls finish, queued work is discarded, and
/// the whole run fails with that first error.
pub struct ThreadedChunkOrchestrator {
    retry: RetryPolicy,
}

impl ThreadedChunkOrchestrator {
    pub fn new(retry: RetryPolicy) -> Self {
        Self { retry }
    }
}

impl Default for ThreadedChunkOrchestrator {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl ChunkOrchestrator for ThreadedChunkOrchestrator {
    fn transcribe_chunks(
        &self,
        chunks: &[Chunk],
        backend: &dyn BackendAdapter,
        request: &TranscribeRequest,
        progress: &dyn ProgressSink,
    ) -> Result<AggregatedTranscript, OrchestratorError> {
        if chunks.is_empty() {
            return Ok(AggregatedTranscript {
                text: String::new(),
                language: resolve_language(&request.language, &[]),
            });
        }

        let capabilities = backend.capabilities();
        check_chunk_limits(chunks, &capabilities)?;
        let language_hint = match request.language.as_str() {
            "auto" => None,
            code if capabilities.supports_language_hint => Some(code),
            _ => None,
        };
        let context_prompt = if capabilities.supports_context_prompt {
            request.context_prompt.as_str()
        } else {
            ""
        };

        let worker_count = request.max_concurrency.max(1).min(chunks.len());
        let total = chunks.len();
        debug!("transcribing {total} chunks with {worker_count} workers");

        let (task_tx, task_rx) = crossbeam_channel::unbounded::<usize>();
        let (result_tx, result_rx) =
            crossbeam_channel::unbounded::<Result<ChunkResult, OrchestratorError>>();
        for index in 0..total {
            if task_tx.send(index).is_err() {
                break;
            }
        }
        drop(task_tx);

        let abort = AtomicBool::new(false);
        let mut results: Vec<Option<ChunkResult>> = vec![None; total];
        let mut failure: Option<OrchestratorError> = None;

        thread::scope(|scope| {
            for _ in 0..worker_count {
                let task_rx = task_rx.clone();
                let result_tx = result_tx.clone();
                let abort = &abort;
                let retry = &self.retry;
                scope.spawn(move || {
                    for index in task_rx {
                        if abort.load(Ordering::Relaxed) {
                            break;
                        }
                        let outcome = transcribe_with_retry(
                            &chunks[index],
                            backend,
                            language_hint,
                            context_prompt,
                            retry,
                            progress,
                        );
                        if outcome.is_err() {
                            abort.store(true, Ordering::Relaxed);
                        }
                        if result_tx.send(outcome).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(task_rx);
            drop(result_tx);

            for outcome in result_rx {
                match outcome {
                    Ok(result) => {
                        let index = result.index;
                        progress.progress(&format!("Chunk {}/{} transcribed.", index + 1, total));
                        results[index] = Some(result);
                    }
                    Err(e) => {
                        if failure.is_none() {
                            failure = Some(e);
                        }
                    }
                }
            }
        });

        if let Some(e) = failure {
            return Err(e);
        }

        let mut texts = Vec::with_capacity(total);
        let mut detected = Vec::new();
        for (index, slot) in results.into_iter().enumerate() {
            let result = slot.ok_or(OrchestratorError::MissingResult { chunk: index })?;
            if let Some(language) = result.language {
                detected.push(language);
            }
            if !result.text.is_empty() {
                texts.push(result.text);
            }
        }

        Ok(AggregatedTranscript {
            text: texts.join(" "),
            language: resolve_language(&request.language, &detected),
        })
    }
}

/// Rejects chunks the backend cannot accept before any request is
/// sent. A chunk over the duration or file-size limit would fail on
/// every attempt, so the run fails fast instead.
fn check_chunk_limits(
    chunks: &[Chunk],
    capabilities: &BackendCapabilities,
) -> Result<(), OrchestratorError> {
    for chunk in chunks {
        let duration_ms = chunk.end_ms.saturating_sub(chunk.start_ms);
        if duration_ms > capabilities.max_chunk_ms {
            return Err(OrchestratorError::Fatal {
                chunk: chunk.index,
                source: BackendError::InvalidArgument {
                    backend: capabilities.name,
                    message: format!(
                        "chunk duration {duration_ms}ms exceeds the {}ms limit",
                        capabilities.max_chunk_ms
                    ),
                },
            });
        }
        // metadata can be unavailable for in-flight temp files, the
        // backend will report its own error in that case
        if let Ok(meta) = fs::metadata(chunk.file.path()) {
            if meta.len() > capabilities.max_file_bytes {
                return Err(OrchestratorError::Fatal {
                    chunk: chunk.index,
                    source: BackendError::InvalidArgument {
                        backend: capabilities.name,
                        message: format!(
                            "chunk file is {} bytes, over the {} byte limit",
                            meta.len(),
                            capabilities.max_file_bytes
                        ),
                    },
                });
            }
        }
    }
    Ok(())
}

fn transcribe_with_retry(
    chunk: &Chunk,
    backend: &dyn BackendAdapter,
    language_hint: Option<&str>,
    context_prompt: &str,
    retry: &RetryPolicy,
    progress: &dyn ProgressSink,
) -> Result<ChunkResult, OrchestratorError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match backend.transcribe(chunk.file.path(), language_hint, context_prompt) {
            Ok(transcript) => {
                return Ok(ChunkResult {
                    index: chunk.index,
                    text: transcript.text,
                    language: transcript.detected_language,
                    attempts: attempt,
                })
            }
            Err(e) if retry.is_retryable(&e) && attempt < retry.max_attempts() => {
                warn!("chunk {} attempt {} failed: {}", chunk.index, attempt, e);
                progress.progress(&format!(
                    "Chunk {} failed (attempt {}), retrying.",
                    chunk.index + 1,
                    attempt
                ));
                thread::sleep(retry.backoff(attempt));
            }
            Err(e) if retry.is_retryable(&e) => {
                return Err(OrchestratorError::RetriesExhausted {
                    chunk: chunk.index,
                    attempts: attempt,
                    source: e,
                })
            }
            Err(e) => {
                return Err(OrchestratorError::Fatal {
                    chunk: chunk.index,
                    source: e,
                })
            }
        }
    }
}

/// Requested language wins unless the caller asked for detection, in
/// which case the first chunk's detected language stands in for the
/// whole recording.
fn resolve_language(requested: &str, detected: &[String]) -> String {
    if requested != "auto" {
        return requested.to_string();
    }
    detected
        .first()
        .cloned()
        .unwrap_or_else(|| DEFAULT_DETECTED_LANGUAGE.to_string())
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::pipeline::progress_sink::NullProgressSink;
    use crate::segmentation::domain::chunk::ChunkFile;
    use crate::transcription::domain::backend::BackendTranscript;

    // --- Stubs ---

    /// Scripted backend: each call for a chunk pops the next outcome
    /// from that chunk's script.
    struct ScriptedBackend {
        scripts: Vec<Mutex<Vec<Result<BackendTranscript, BackendError>>>>,
        calls: AtomicUsize,
        delay_per_index: Option<Duration>,
        max_file_bytes: u64,
        max_chunk_ms: u64,
        supports_language_hint: bool,
        supports_context_prompt: bool,
        seen_hints: Mutex<Vec<Option<String>>>,
        seen_prompts: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new(scripts: Vec<Vec<Result<BackendTranscript, BackendError>>>) -> Self {
            Self {
                scripts: scripts
                    .into_iter()
                    .map(|mut s| {
                        // pop from the back, so store scripts reversed
                        s.reverse();
                        Mutex::new(s)
                    })
                    .collect(),
                calls: AtomicUsize::new(0),
                delay_per_index: None,
                max_file_bytes: u64::MAX,
                max_chunk_ms: u64::MAX,
                supports_language_hint: true,
                supports_context_prompt: true,
                seen_hints: Mutex::new(Vec::new()),
                seen_prompts: Mutex::new(Vec::new()),
            }
        }

        fn ok(text: &str) -> Result<BackendTranscript, BackendError> {
            Ok(BackendTranscript {
                text: text.to_string(),
                detected_language: None,
            })
        }

        fn ok_lang(text: &str, lang: &str) -> Result<BackendTranscript, BackendError> {
            Ok(BackendTranscript {
                text: text.to_string(),
                detected_language: Some(lang.to_string()),
            })
        }

        fn transient() -> Result<BackendTranscript, BackendError> {
            Err(BackendError::Unavailable {
                backend: "stub",
                message: String::from("503"),
            })
        }

        fn fatal() -> Result<BackendTranscript, BackendError> {
            Err(BackendError::Auth {
                backend: "stub",
                message: String::from("401"),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl BackendAdapter for ScriptedBackend {
        fn capabilities(&self) -> BackendCapabilities {
            BackendCapabilities {
                name: "stub",
                max_file_bytes: self.max_file_bytes,
                max_chunk_ms: self.max_chunk_ms,
                supports_language_hint: self.supports_language_hint,
                supports_context_prompt: self.supports_context_prompt,
            }
        }

        fn transcribe(
            &self,
            chunk: &Path,
            language_hint: Option<&str>,
            context_prompt: &str,
        ) -> Result<BackendTranscript, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_hints
                .lock()
                .unwrap()
                .push(language_hint.map(String::from));
            self.seen_prompts
                .lock()
                .unwrap()
                .push(context_prompt.to_string());

            // chunk file names are "<index>.mp3"
            let index: usize = chunk
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse().ok())
                .unwrap();
            if let Some(delay) = self.delay_per_index {
                // later chunks finish sooner, exercising reordering
                std::thread::sleep(delay * (10 - index as u32));
            }
            self.scripts[index]
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Self::fatal())
        }
    }

    fn chunks(count: usize) -> Vec<Chunk> {
        (0..count)
            .map(|index| Chunk {
                index,
                start_ms: index as u64 * 1_000,
                end_ms: (index as u64 + 1) * 1_000,
                file: ChunkFile::owned(PathBuf::from(format!("{index}.mp3"))),
            })
            .collect()
    }

    fn request(concurrency: usize) -> TranscribeRequest {
        TranscribeRequest {
            max_concurrency: concurrency,
            ..TranscribeRequest::default()
        }
    }

    fn orchestrator() -> ThreadedChunkOrchestrator {
        ThreadedChunkOrchestrator::new(RetryPolicy::immediate(3))
    }

    // --- Tests ---

    #[test]
    fn test_chunks_are_joined_in_index_order() {
        let backend = ScriptedBackend::new(vec![
            vec![ScriptedBackend::ok("C1")],
            vec![ScriptedBackend::ok("C2")],
            vec![ScriptedBackend::ok("C3")],
        ]);
        let out = orchestrator()
            .transcribe_chunks(&chunks(3), &backend, &request(4), &NullProgressSink)
            .unwrap();
        assert_eq!(out.text, "C1 C2 C3");
    }

    #[test]
    fn test_order_survives_out_of_order_completion() {
        let mut backend = ScriptedBackend::new(vec![
            vec![ScriptedBackend::ok("A")],
            vec![ScriptedBackend::ok("B")],
            vec![ScriptedBackend::ok("C")],
            vec![ScriptedBackend::ok("D")],
        ]);
        // chunk 0 sleeps longest, so completion order is reversed
        backend.delay_per_index = Some(Duration::from_millis(5));
        let out = orchestrator()
            .transcribe_chunks(&chunks(4), &backend, &request(4), &NullProgressSink)
            .unwrap();
        assert_eq!(out.text, "A B C D");
    }

    #[test]
    fn test_empty_chunk_text_is_skipped() {
        let backend = ScriptedBackend::new(vec![
            vec![ScriptedBackend::ok("hello")],
            vec![ScriptedBackend::ok("")],
            vec![ScriptedBackend::ok("world")],
        ]);
        let out = orchestrator()
            .transcribe_chunks(&chunks(3), &backend, &request(2), &NullProgressSink)
            .unwrap();
        assert_eq!(out.text, "hello world");
    }

    #[test]
    fn test_transient_failure_is_retried_to_success() {
        let backend = ScriptedBackend::new(vec![vec![
            ScriptedBackend::transient(),
            ScriptedBackend::transient(),
            ScriptedBackend::ok("recovered"),
        ]]);
        let out = orchestrator()
            .transcribe_chunks(&chunks(1), &backend, &request(1), &NullProgressSink)
            .unwrap();
        assert_eq!(out.text, "recovered");
        assert_eq!(backend.call_count(), 3);
    }

    #[test]
    fn test_one_flaky_chunk_does_not_disturb_the_others() {
        // chunk 2 fails once with a transient error, then succeeds
        let backend = ScriptedBackend::new(vec![
            vec![ScriptedBackend::ok("C1")],
            vec![ScriptedBackend::transient(), ScriptedBackend::ok("C2")],
            vec![ScriptedBackend::ok("C3")],
        ]);
        let out = orchestrator()
            .transcribe_chunks(&chunks(3), &backend, &request(2), &NullProgressSink)
            .unwrap();
        assert_eq!(out.text, "C1 C2 C3");
        assert_eq!(backend.call_count(), 4);
    }

    #[test]
    fn test_retries_exhausted_fails_the_run() {
        let backend = ScriptedBackend::new(vec![vec![
            ScriptedBackend::transient(),
            ScriptedBackend::transient(),
            ScriptedBackend::transient(),
        ]]);
        let err = orchestrator()
            .transcribe_chunks(&chunks(1), &backend, &request(1), &NullProgressSink)
            .unwrap_err();
        match err {
            OrchestratorError::RetriesExhausted { chunk, attempts, .. } => {
                assert_eq!(chunk, 0);
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(backend.call_count(), 3);
    }

    #[test]
    fn test_fatal_error_is_not_retried() {
        let backend = ScriptedBackend::new(vec![vec![ScriptedBackend::fatal()]]);
        let err = orchestrator()
            .transcribe_chunks(&chunks(1), &backend, &request(1), &NullProgressSink)
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Fatal { chunk: 0, .. }));
        assert_eq!(backend.call_count(), 1);
    }

    #[test]
    fn test_no_new_work_after_fatal_failure() {
        // single worker: chunk 0 fails fatally, chunks 1..4 must never run
        let backend = ScriptedBackend::new(vec![
            vec![ScriptedBackend::fatal()],
            vec![ScriptedBackend::ok("B")],
            vec![ScriptedBackend::ok("C")],
            vec![ScriptedBackend::ok("D")],
        ]);
        let err = orchestrator()
            .transcribe_chunks(&chunks(4), &backend, &request(1), &NullProgressSink)
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Fatal { chunk: 0, .. }));
        assert_eq!(backend.call_count(), 1);
    }

    #[test]
    fn test_chunk_over_duration_limit_is_rejected_before_any_call() {
        let mut backend = ScriptedBackend::new(vec![vec![ScriptedBackend::ok("hi")]]);
        // chunks() produces 1000ms chunks
        backend.max_chunk_ms = 500;
        let err = orchestrator()
            .transcribe_chunks(&chunks(1), &backend, &request(1), &NullProgressSink)
            .unwrap_err();
        match err {
            OrchestratorError::Fatal { chunk, source } => {
                assert_eq!(chunk, 0);
                assert!(matches!(source, BackendError::InvalidArgument { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(backend.call_count(), 0);
    }

    #[test]
    fn test_chunk_file_over_size_limit_is_rejected_before_any_call() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0.mp3");
        std::fs::write(&path, vec![0u8; 64]).unwrap();

        let mut backend = ScriptedBackend::new(vec![vec![ScriptedBackend::ok("hi")]]);
        backend.max_file_bytes = 32;
        let oversized = vec![Chunk {
            index: 0,
            start_ms: 0,
            end_ms: 1_000,
            file: ChunkFile::owned(path),
        }];
        let err = orchestrator()
            .transcribe_chunks(&oversized, &backend, &request(1), &NullProgressSink)
            .unwrap_err();
        match err {
            OrchestratorError::Fatal { chunk: 0, source } => {
                assert!(matches!(source, BackendError::InvalidArgument { .. }));
                assert!(source.to_string().contains("64 bytes"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(backend.call_count(), 0);
    }

    #[test]
    fn test_requested_language_wins() {
        let backend =
            ScriptedBackend::new(vec![vec![ScriptedBackend::ok_lang("hallo", "de")]]);
        let req = TranscribeRequest {
            language: String::from("nl"),
            ..request(1)
        };
        let out = orchestrator()
            .transcribe_chunks(&chunks(1), &backend, &req, &NullProgressSink)
            .unwrap();
        assert_eq!(out.language, "nl");
        assert_eq!(
            backend.seen_hints.lock().unwrap().as_slice(),
            [Some(String::from("nl"))]
        );
    }

    #[test]
    fn test_auto_language_uses_first_detection() {
        let backend = ScriptedBackend::new(vec![
            vec![ScriptedBackend::ok_lang("bonjour", "fr")],
            vec![ScriptedBackend::ok_lang("hola", "es")],
        ]);
        let out = orchestrator()
            .transcribe_chunks(&chunks(2), &backend, &request(1), &NullProgressSink)
            .unwrap();
        assert_eq!(out.language, "fr");
        assert_eq!(
            backend.seen_hints.lock().unwrap().as_slice(),
            [None, None]
        );
    }

    #[test]
    fn test_auto_language_falls_back_when_undetected() {
        let backend = ScriptedBackend::new(vec![vec![ScriptedBackend::ok("hi")]]);
        let out = orchestrator()
            .transcribe_chunks(&chunks(1), &backend, &request(1), &NullProgressSink)
            .unwrap();
        assert_eq!(out.language, DEFAULT_DETECTED_LANGUAGE);
    }

    #[test]
    fn test_hint_withheld_from_incapable_backend() {
        let mut backend = ScriptedBackend::new(vec![vec![ScriptedBackend::ok("hi")]]);
        backend.supports_language_hint = false;
        backend.supports_context_prompt = false;
        let req = TranscribeRequest {
            language: String::from("nl"),
            context_prompt: String::from("jargon"),
            ..request(1)
        };
        let out = orchestrator()
            .transcribe_chunks(&chunks(1), &backend, &req, &NullProgressSink)
            .unwrap();
        // the answer still reports the requested language
        assert_eq!(out.language, "nl");
        assert_eq!(backend.seen_hints.lock().unwrap().as_slice(), [None]);
        assert_eq!(backend.seen_prompts.lock().unwrap().as_slice(), [String::new()]);
    }

    #[test]
    fn test_context_prompt_is_forwarded() {
        let backend = ScriptedBackend::new(vec![vec![ScriptedBackend::ok("hi")]]);
        let req = TranscribeRequest {
            context_prompt: String::from("medical terms"),
            ..request(1)
        };
        orchestrator()
            .transcribe_chunks(&chunks(1), &backend, &req, &NullProgressSink)
            .unwrap();
        assert_eq!(
            backend.seen_prompts.lock().unwrap().as_slice(),
            [String::from("medical terms")]
        );
    }

    #[test]
    fn test_empty_input_yields_empty_transcript() {
        let backend = ScriptedBackend::new(vec![]);
        let out = orchestrator()
            .transcribe_chunks(&[], &backend, &request(4), &NullProgressSink)
            .unwrap();
        assert_eq!(out.text, "");
        assert_eq!(backend.call_count(), 0);
    }

    #[test]
    fn test_progress_reports_each_chunk() {
        struct CollectingSink(Mutex<Vec<String>>);
        impl ProgressSink for CollectingSink {
            fn progress(&self, message: &str) {
                self.0.lock().unwrap().push(message.to_string());
            }
        }

        let backend = ScriptedBackend::new(vec![
            vec![ScriptedBackend::ok("a")],
            vec![ScriptedBackend::ok("b")],
        ]);
        let sink = CollectingSink(Mutex::new(Vec::new()));
        orchestrator()
            .transcribe_chunks(&chunks(2), &backend, &request(1), &sink)
            .unwrap();

        let mut messages = sink.0.into_inner().unwrap();
        messages.sort();
        assert_eq!(
            messages,
            vec!["Chunk 1/2 transcribed.", "Chunk 2/2 transcribed."]
        );
    }
}
