use crate::media::domain::audio_segment::AudioSegment;

/// Analysis hop: silence is evaluated over fixed 10 ms windows.
const HOP_MS: u64 = 10;

/// A contiguous span whose level stays below a noise threshold.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SilenceInterval {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl SilenceInterval {
    pub fn len_ms(&self) -> u64 {
        self.end_ms - self.start_ms
    }

    pub fn midpoint_ms(&self) -> u64 {
        self.start_ms + self.len_ms() / 2
    }
}

/// Find silence intervals inside `[window_start_ms, window_end_ms)`.
///
/// Level is RMS over each hop, in dBFS relative to full scale. Runs of
/// quiet hops shorter than `min_silence_ms` are discarded.
pub fn find_silence_intervals(
    audio: &AudioSegment,
    window_start_ms: u64,
    window_end_ms: u64,
    threshold_db: f64,
    min_silence_ms: u64,
) -> Vec<SilenceInterval> {
    let mut intervals = Vec::new();
    if window_end_ms <= window_start_ms {
        return intervals;
    }

    let mut run_start: Option<u64> = None;
    let mut hop_start = window_start_ms;
    while hop_start < window_end_ms {
        let hop_end = (hop_start + HOP_MS).min(window_end_ms);
        let quiet = rms_db(audio, hop_start, hop_end) < threshold_db;

        match (quiet, run_start) {
            (true, None) => run_start = Some(hop_start),
            (false, Some(start)) => {
                if hop_start - start >= min_silence_ms {
                    intervals.push(SilenceInterval {
                        start_ms: start,
                        end_ms: hop_start,
                    });
                }
                run_start = None;
            }
            _ => {}
        }
        hop_start = hop_end;
    }

    if let Some(start) = run_start {
        if window_end_ms - start >= min_silence_ms {
            intervals.push(SilenceInterval {
                start_ms: start,
                end_ms: window_end_ms,
            });
        }
    }

    intervals
}

/// Fraction of the window covered by the given intervals.
pub fn silence_fraction(intervals: &[SilenceInterval], window_start_ms: u64, window_end_ms: u64) -> f64 {
    let window = window_end_ms.saturating_sub(window_start_ms);
    if window == 0 {
        return 0.0;
    }
    let silent: u64 = intervals.iter().map(SilenceInterval::len_ms).sum();
    silent as f64 / window as f64
}

fn rms_db(audio: &AudioSegment, start_ms: u64, end_ms: u64) -> f64 {
    let start = audio.sample_index_at_ms(start_ms);
    let end = audio.sample_index_at_ms(end_ms);
    if end <= start {
        return f64::NEG_INFINITY;
    }
    let slice = &audio.samples()[start..end];
    let sum_squares: f64 = slice.iter().map(|s| (*s as f64) * (*s as f64)).sum();
    let rms = (sum_squares / slice.len() as f64).sqrt();
    20.0 * rms.max(1e-10).log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 16 kHz mono tone at the given amplitude, with zeroed spans.
    fn audio_with_gaps(duration_ms: u64, amplitude: f32, gaps: &[(u64, u64)]) -> AudioSegment {
        let rate = 16_000u64;
        let mut samples = vec![amplitude; (duration_ms * rate / 1000) as usize];
        for &(start_ms, end_ms) in gaps {
            let start = (start_ms * rate / 1000) as usize;
            let end = ((end_ms * rate / 1000) as usize).min(samples.len());
            for s in &mut samples[start..end] {
                *s = 0.0;
            }
        }
        AudioSegment::new(samples, rate as u32, 1)
    }

    #[test]
    fn test_detects_single_gap() {
        let audio = audio_with_gaps(10_000, 0.5, &[(4_000, 5_000)]);
        let intervals = find_silence_intervals(&audio, 0, 10_000, -35.0, 500);
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].start_ms, 4_000);
        assert_eq!(intervals[0].end_ms, 5_000);
        assert_eq!(intervals[0].midpoint_ms(), 4_500);
    }

    #[test]
    fn test_short_gap_below_min_duration_ignored() {
        let audio = audio_with_gaps(10_000, 0.5, &[(4_000, 4_200)]);
        let intervals = find_silence_intervals(&audio, 0, 10_000, -35.0, 500);
        assert!(intervals.is_empty());
    }

    #[test]
    fn test_loud_audio_has_no_silence() {
        let audio = audio_with_gaps(5_000, 0.5, &[]);
        let intervals = find_silence_intervals(&audio, 0, 5_000, -35.0, 500);
        assert!(intervals.is_empty());
    }

    #[test]
    fn test_threshold_controls_sensitivity() {
        // -40 dBFS signal: quiet against a -35 dB threshold, loud against -45 dB
        let audio = audio_with_gaps(5_000, 0.01, &[]);
        assert_eq!(find_silence_intervals(&audio, 0, 5_000, -35.0, 500).len(), 1);
        assert!(find_silence_intervals(&audio, 0, 5_000, -45.0, 500).is_empty());
    }

    #[test]
    fn test_gap_spanning_window_end_is_kept() {
        let audio = audio_with_gaps(10_000, 0.5, &[(9_000, 10_000)]);
        let intervals = find_silence_intervals(&audio, 5_000, 10_000, -35.0, 500);
        assert_eq!(intervals.len(), 1);
        assert_eq!(intervals[0].end_ms, 10_000);
    }

    #[test]
    fn test_only_window_contents_are_searched() {
        let audio = audio_with_gaps(10_000, 0.5, &[(1_000, 2_000)]);
        let intervals = find_silence_intervals(&audio, 3_000, 8_000, -35.0, 500);
        assert!(intervals.is_empty());
    }

    #[test]
    fn test_multiple_gaps() {
        let audio = audio_with_gaps(20_000, 0.5, &[(2_000, 3_000), (10_000, 12_000)]);
        let intervals = find_silence_intervals(&audio, 0, 20_000, -35.0, 500);
        assert_eq!(intervals.len(), 2);
        assert_eq!(intervals[1].len_ms(), 2_000);
    }

    #[test]
    fn test_silence_fraction() {
        let intervals = vec![
            SilenceInterval { start_ms: 0, end_ms: 1_000 },
            SilenceInterval { start_ms: 5_000, end_ms: 6_000 },
        ];
        let fraction = silence_fraction(&intervals, 0, 10_000);
        approx::assert_relative_eq!(fraction, 0.2);
        assert_eq!(silence_fraction(&[], 0, 0), 0.0);
    }

    #[test]
    fn test_rms_level_of_known_amplitude() {
        // constant 0.1 amplitude is exactly -20 dBFS
        let audio = audio_with_gaps(1_000, 0.1, &[]);
        approx::assert_relative_eq!(rms_db(&audio, 0, 1_000), -20.0, epsilon = 1e-3);
    }
}
