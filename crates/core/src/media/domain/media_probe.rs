use std::path::Path;

use crate::media::domain::audio_segment::AudioSegment;
use crate::media::domain::error::MediaError;
use crate::shared::audio_asset::AudioAsset;

/// Domain interface for inspecting and decoding audio files.
pub trait MediaProbe: Send + Sync {
    /// Resolve duration, size, and container format without decoding.
    fn probe(&self, path: &Path) -> Result<AudioAsset, MediaError>;

    /// Decode the full audio track to mono PCM at the given sample rate.
    fn decode_mono(&self, path: &Path, sample_rate: u32) -> Result<AudioSegment, MediaError>;
}
