use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info};

use crate::jobs::domain::job::JobId;
use crate::jobs::domain::job_store::JobStore;
use crate::media::domain::media_probe::MediaProbe;
use crate::media::domain::segment_extractor::SegmentExtractor;
use crate::pipeline::orchestrator::{AggregatedTranscript, ChunkOrchestrator, TranscribeRequest};
use crate::pipeline::pipeline_error::PipelineError;
use crate::pipeline::progress_sink::{JobProgressSink, ProgressSink};
use crate::segmentation::domain::chunk::remove_chunk_files;
use crate::segmentation::domain::materializer::materialize;
use crate::segmentation::domain::planner::SegmentPlanner;
use crate::segmentation::domain::segment_plan::SegmentPlan;
use crate::shared::constants::ANALYSIS_SAMPLE_RATE;
use crate::shared::files;
use crate::transcription::domain::backend::BackendAdapter;

/// Orchestrates one transcription job end to end: probe, plan, split,
/// transcribe, clean up, finalize.
///
/// Wires domain components together and records every stage in the job
/// store, so a caller polling the store sees the same narrative whether
/// the job lives in this process or behind a service.
pub struct TranscribeJobUseCase {
    probe: Box<dyn MediaProbe>,
    extractor: Box<dyn SegmentExtractor>,
    orchestrator: Box<dyn ChunkOrchestrator>,
    store: Arc<dyn JobStore>,
    planner: SegmentPlanner,
    work_dir: PathBuf,
}

impl TranscribeJobUseCase {
    pub fn new(
        probe: Box<dyn MediaProbe>,
        extractor: Box<dyn SegmentExtractor>,
        orchestrator: Box<dyn ChunkOrchestrator>,
        store: Arc<dyn JobStore>,
        planner: SegmentPlanner,
        work_dir: PathBuf,
    ) -> Self {
        Self {
            probe,
            extractor,
            orchestrator,
            store,
            planner,
            work_dir,
        }
    }

    /// Runs the job to a terminal state. The store always ends up
    /// `finished` or `error`; the returned transcript is a convenience
    /// for callers that do not poll.
    pub fn run(
        &self,
        job: &JobId,
        input: &Path,
        request: &TranscribeRequest,
        backend: &dyn BackendAdapter,
    ) -> Result<AggregatedTranscript, PipelineError> {
        self.store.mark_processing(job)?;
        let sink = JobProgressSink::new(Arc::clone(&self.store), job.clone());

        match self.execute(job, input, request, backend, &sink) {
            Ok(transcript) => {
                self.store
                    .finalize_success(job, &transcript.text, &transcript.language)?;
                info!("Job {job} finished ({} chars)", transcript.text.len());
                Ok(transcript)
            }
            Err(e) => {
                error!("Job {job} failed: {e}");
                self.store
                    .finalize_error(job, &format!("An error occurred: {e}"))?;
                Err(e)
            }
        }
    }

    fn execute(
        &self,
        job: &JobId,
        input: &Path,
        request: &TranscribeRequest,
        backend: &dyn BackendAdapter,
        sink: &dyn ProgressSink,
    ) -> Result<AggregatedTranscript, PipelineError> {
        sink.progress("Transcription started.");

        if !files::allowed_file(input) {
            return Err(PipelineError::UnsupportedFile(input.to_path_buf()));
        }

        let asset = self.probe.probe(input)?;
        let cfg = self.planner.config();

        // Short assets skip the decode entirely.
        let plan = if asset.duration_ms < cfg.target_chunk_ms + cfg.min_chunk_ms {
            SegmentPlan::empty(asset.duration_ms)
        } else {
            let audio = self.probe.decode_mono(input, ANALYSIS_SAMPLE_RATE)?;
            self.planner.plan(&asset, &audio)
        };

        let chunk_dir = self.work_dir.join(job.as_str());
        if !plan.is_empty() {
            fs::create_dir_all(&chunk_dir).map_err(|source| PipelineError::WorkDir {
                path: chunk_dir.clone(),
                source,
            })?;
            if !files::path_within(&chunk_dir, &self.work_dir) {
                return Err(PipelineError::ChunkDirEscapes(chunk_dir));
            }
        }

        let chunks = materialize(&asset, &plan, self.extractor.as_ref(), &chunk_dir)?;
        if chunks.len() > 1 {
            sink.progress(&format!("Audio split into {} chunks.", chunks.len()));
        } else {
            sink.progress("Audio fits in a single chunk.");
        }

        let outcome = self
            .orchestrator
            .transcribe_chunks(&chunks, backend, request, sink);

        let removed = remove_chunk_files(&chunks);
        if removed > 0 {
            sink.progress(&format!("Removed {removed} chunk files."));
        }
        if !plan.is_empty() {
            let _ = fs::remove_dir(&chunk_dir);
        }

        let transcript = outcome?;
        sink.progress("Transcription completed.");
        Ok(transcript)
    }
}
