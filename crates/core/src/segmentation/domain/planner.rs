use crate::media::domain::audio_segment::AudioSegment;
use crate::segmentation::domain::segment_plan::SegmentPlan;
use crate::segmentation::domain::silence::{find_silence_intervals, silence_fraction};
use crate::shared::audio_asset::AudioAsset;
use crate::shared::constants::{
    DEFAULT_MAX_SILENCE_FRACTION, DEFAULT_MIN_CHUNK_MS, DEFAULT_MIN_SILENCE_FRACTION,
    DEFAULT_SEARCH_BACK_MS, DEFAULT_SEARCH_FORWARD_MS, DEFAULT_TARGET_CHUNK_MS,
};

/// One detection attempt in the adaptive silence search.
#[derive(Clone, Copy, Debug)]
pub struct SilenceCandidate {
    pub threshold_db: f64,
    pub min_silence_ms: u64,
}

/// Tuning for the segment planner. The defaults are empirically chosen;
/// callers override them rather than the planner inferring intent.
#[derive(Clone, Debug)]
pub struct SegmenterConfig {
    pub target_chunk_ms: u64,
    pub min_chunk_ms: u64,
    pub search_back_ms: u64,
    pub search_forward_ms: u64,
    pub min_silence_fraction: f64,
    pub max_silence_fraction: f64,
    /// Ordered detection candidates: the starting threshold first, then
    /// stricter levels for over-quiet windows, then more permissive levels
    /// for dense speech, and finally a halved minimum-silence entry.
    pub candidates: Vec<SilenceCandidate>,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            target_chunk_ms: DEFAULT_TARGET_CHUNK_MS,
            min_chunk_ms: DEFAULT_MIN_CHUNK_MS,
            search_back_ms: DEFAULT_SEARCH_BACK_MS,
            search_forward_ms: DEFAULT_SEARCH_FORWARD_MS,
            min_silence_fraction: DEFAULT_MIN_SILENCE_FRACTION,
            max_silence_fraction: DEFAULT_MAX_SILENCE_FRACTION,
            candidates: vec![
                SilenceCandidate { threshold_db: -35.0, min_silence_ms: 500 },
                SilenceCandidate { threshold_db: -45.0, min_silence_ms: 500 },
                SilenceCandidate { threshold_db: -55.0, min_silence_ms: 500 },
                SilenceCandidate { threshold_db: -30.0, min_silence_ms: 500 },
                SilenceCandidate { threshold_db: -25.0, min_silence_ms: 500 },
                SilenceCandidate { threshold_db: -25.0, min_silence_ms: 250 },
            ],
        }
    }
}

/// Plans cut points for an asset, preferring silence boundaries over
/// arbitrary timestamps. Pure and deterministic: the same audio and
/// config always yield the same plan.
pub struct SegmentPlanner {
    config: SegmenterConfig,
}

impl SegmentPlanner {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    pub fn plan(&self, asset: &AudioAsset, audio: &AudioSegment) -> SegmentPlan {
        let cfg = &self.config;
        let duration = asset.duration_ms;

        // Too short to split: the whole asset is one chunk.
        if duration < cfg.target_chunk_ms + cfg.min_chunk_ms {
            return SegmentPlan::empty(duration);
        }

        let mut cuts = Vec::new();
        let mut nominal = cfg.target_chunk_ms;
        while nominal < duration {
            cuts.push(self.resolve_cut(nominal, duration, audio));
            nominal += cfg.target_chunk_ms;
        }

        // Re-clip: drop cuts that would leave a chunk shorter than the
        // minimum, on either side.
        let mut clipped = Vec::new();
        let mut prev = 0;
        for cut in cuts {
            if cut < prev + cfg.min_chunk_ms || cut + cfg.min_chunk_ms > duration {
                continue;
            }
            clipped.push(cut);
            prev = cut;
        }

        SegmentPlan::new(clipped, duration)
    }

    /// Resolve one nominal point: first candidate whose silence fraction
    /// lands in the acceptable band wins; the cut is the midpoint of the
    /// longest silence interval. An exhausted table falls back to the
    /// nominal point itself.
    fn resolve_cut(&self, nominal_ms: u64, duration_ms: u64, audio: &AudioSegment) -> u64 {
        let cfg = &self.config;
        let window_start = nominal_ms.saturating_sub(cfg.search_back_ms);
        let window_end = (nominal_ms + cfg.search_forward_ms).min(duration_ms);

        for candidate in &cfg.candidates {
            let intervals = find_silence_intervals(
                audio,
                window_start,
                window_end,
                candidate.threshold_db,
                candidate.min_silence_ms,
            );
            let fraction = silence_fraction(&intervals, window_start, window_end);
            if fraction < cfg.min_silence_fraction || fraction > cfg.max_silence_fraction {
                continue;
            }
            if let Some(longest) = intervals.iter().max_by_key(|iv| iv.len_ms()) {
                log::debug!(
                    "cut {nominal_ms}ms -> silence midpoint {}ms (threshold {}dB, fraction {fraction:.3})",
                    longest.midpoint_ms(),
                    candidate.threshold_db,
                );
                return longest.midpoint_ms();
            }
        }

        log::debug!("cut {nominal_ms}ms -> no acceptable silence, keeping nominal point");
        nominal_ms
    }
}
