use std::path::{Path, PathBuf};

use crate::media::domain::error::MediaError;
use crate::shared::audio_asset::AudioAsset;

/// Domain interface for physically splitting an audio file at cut points.
///
/// Implementations must return exactly `cut_points_ms.len() + 1` files in
/// source order, and must not leave partial output behind on failure.
pub trait SegmentExtractor: Send + Sync {
    fn extract(
        &self,
        asset: &AudioAsset,
        cut_points_ms: &[u64],
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, MediaError>;
}
