use std::time::Duration;

/// Default chunk length: 10 minutes.
pub const DEFAULT_TARGET_CHUNK_MS: u64 = 10 * 60 * 1000;

/// Chunks shorter than this are merged into their neighbor.
pub const DEFAULT_MIN_CHUNK_MS: u64 = 20_000;

/// How far around a nominal cut point the silence search looks.
pub const DEFAULT_SEARCH_BACK_MS: u64 = 15_000;
pub const DEFAULT_SEARCH_FORWARD_MS: u64 = 15_000;

/// Acceptable band for the silence fraction of a search window.
/// Below the minimum the window is dense speech, above the maximum
/// the window is dominated by pauses or noise.
pub const DEFAULT_MIN_SILENCE_FRACTION: f64 = 0.01;
pub const DEFAULT_MAX_SILENCE_FRACTION: f64 = 0.5;

/// Sample rate used for silence analysis and re-encoded chunks.
pub const ANALYSIS_SAMPLE_RATE: u32 = 16_000;

/// Per-chunk transcription attempts before the job fails.
pub const MAX_RETRIES: u32 = 3;

/// Concurrent chunk transcriptions per job.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Language reported when the caller requested auto-detection and the
/// backend did not return an explicit detection.
pub const DEFAULT_DETECTED_LANGUAGE: &str = "en";

pub const ALLOWED_EXTENSIONS: &[&str] = &["mp3", "m4a", "wav", "ogg", "webm"];

/// Work-directory files older than this are eligible for cleanup.
pub const DEFAULT_STALE_FILE_AGE: Duration = Duration::from_secs(24 * 60 * 60);
