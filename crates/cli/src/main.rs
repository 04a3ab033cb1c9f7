use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use log::info;

use chunkscribe_core::jobs::domain::job_store::JobStore;
use chunkscribe_core::jobs::infrastructure::memory_store::InMemoryJobStore;
use chunkscribe_core::media::infrastructure::ffmpeg_probe::FfmpegMediaProbe;
use chunkscribe_core::media::infrastructure::ffmpeg_segment_extractor::FfmpegSegmentExtractor;
use chunkscribe_core::pipeline::infrastructure::threaded_orchestrator::ThreadedChunkOrchestrator;
use chunkscribe_core::pipeline::orchestrator::TranscribeRequest;
use chunkscribe_core::pipeline::transcribe_job_use_case::TranscribeJobUseCase;
use chunkscribe_core::segmentation::domain::planner::{SegmentPlanner, SegmenterConfig};
use chunkscribe_core::shared::constants::DEFAULT_STALE_FILE_AGE;
use chunkscribe_core::shared::files::cleanup_old_files;
use chunkscribe_core::transcription::infrastructure::backend_factory::create_backend;

const SUPPORTED_LANGUAGES: &[&str] = &["auto", "en", "nl", "fr", "es"];
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Silence-aware chunked transcription of long audio recordings.
#[derive(Parser)]
#[command(name = "chunkscribe")]
struct Cli {
    /// Input audio file (mp3, m4a, wav, ogg, webm).
    input: PathBuf,

    /// Write the transcript here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Transcription backend: whisper, gpt4o, or assemblyai.
    #[arg(long, default_value = "whisper")]
    backend: String,

    /// Language code (en, nl, fr, es) or auto to detect.
    #[arg(long, default_value = "auto")]
    language: String,

    /// Domain vocabulary hint for backends that accept one.
    #[arg(long, default_value = "")]
    context_prompt: String,

    /// Target chunk length in seconds.
    #[arg(long, default_value = "600")]
    target_chunk: u64,

    /// Minimum chunk length in seconds.
    #[arg(long, default_value = "20")]
    min_chunk: u64,

    /// Concurrent backend calls.
    #[arg(long, default_value = "4")]
    concurrency: usize,

    /// Directory for temporary chunk files.
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Delete work-directory files older than a day before starting.
    #[arg(long)]
    clean_stale: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let work_dir = cli
        .work_dir
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("chunkscribe"));
    if cli.clean_stale {
        let removed = cleanup_old_files(&work_dir, DEFAULT_STALE_FILE_AGE)?;
        if removed > 0 {
            info!("Removed {removed} stale files from {}", work_dir.display());
        }
    }

    let backend = create_backend(&cli.backend)?;
    let store: Arc<InMemoryJobStore> = Arc::new(InMemoryJobStore::new());
    let job = store.create()?;

    let planner = SegmentPlanner::new(SegmenterConfig {
        target_chunk_ms: cli.target_chunk * 1000,
        min_chunk_ms: cli.min_chunk * 1000,
        ..SegmenterConfig::default()
    });
    let use_case = TranscribeJobUseCase::new(
        Box::new(FfmpegMediaProbe),
        Box::new(FfmpegSegmentExtractor),
        Box::new(ThreadedChunkOrchestrator::default()),
        store.clone(),
        planner,
        work_dir,
    );
    let request = TranscribeRequest {
        language: cli.language.clone(),
        context_prompt: cli.context_prompt.clone(),
        max_concurrency: cli.concurrency,
    };

    let input = cli.input.clone();
    let worker = {
        let job = job.clone();
        thread::spawn(move || use_case.run(&job, &input, &request, backend.as_ref()))
    };

    // Poll the job like an external client would, echoing new progress
    // lines as they appear.
    let mut printed = 0;
    let snapshot = loop {
        let snapshot = store.get(&job)?;
        for entry in &snapshot.progress[printed..] {
            eprintln!("{entry}");
        }
        printed = snapshot.progress.len();
        if snapshot.status.is_terminal() {
            break snapshot;
        }
        thread::sleep(POLL_INTERVAL);
    };

    let _ = worker.join().map_err(|_| "transcription thread panicked")?;

    match snapshot.result {
        Some(transcript) => {
            if let Some(language) = &snapshot.language {
                info!("Transcript language: {language}");
            }
            match &cli.output {
                Some(path) => {
                    std::fs::write(path, &transcript)?;
                    info!("Transcript written to {}", path.display());
                }
                None => println!("{transcript}"),
            }
            Ok(())
        }
        None => Err(snapshot
            .error
            .unwrap_or_else(|| String::from("job ended without a result"))
            .into()),
    }
}

fn validate(cli: &Cli) -> Result<(), String> {
    if !SUPPORTED_LANGUAGES.contains(&cli.language.as_str()) {
        return Err(format!(
            "unsupported language '{}', expected one of: {}",
            cli.language,
            SUPPORTED_LANGUAGES.join(", ")
        ));
    }
    if cli.target_chunk == 0 {
        return Err(String::from("--target-chunk must be positive"));
    }
    if cli.min_chunk >= cli.target_chunk {
        return Err(String::from("--min-chunk must be below --target-chunk"));
    }
    if cli.concurrency == 0 {
        return Err(String::from("--concurrency must be positive"));
    }
    Ok(())
}
