use std::path::Path;

use crate::media::domain::error::MediaError;
use crate::media::domain::segment_extractor::SegmentExtractor;
use crate::segmentation::domain::chunk::{Chunk, ChunkFile};
use crate::segmentation::domain::segment_plan::SegmentPlan;
use crate::shared::audio_asset::AudioAsset;
use crate::shared::files;

/// Turn a plan into chunk files on disk.
///
/// An empty plan produces one borrowed chunk pointing at the source asset.
/// A split that yields fewer files than `cut points + 1` is a hard
/// failure: partial output is deleted and the error propagates.
pub fn materialize(
    asset: &AudioAsset,
    plan: &SegmentPlan,
    extractor: &dyn SegmentExtractor,
    out_dir: &Path,
) -> Result<Vec<Chunk>, MediaError> {
    if plan.is_empty() {
        return Ok(vec![Chunk {
            index: 0,
            start_ms: 0,
            end_ms: asset.duration_ms,
            file: ChunkFile::borrowed(asset.path.clone()),
        }]);
    }

    let paths = extractor.extract(asset, plan.cut_points(), out_dir)?;
    if paths.len() != plan.chunk_count() {
        let produced = paths.len();
        files::remove_files(&paths);
        return Err(MediaError::IncompleteSplit {
            expected: plan.chunk_count(),
            produced,
        });
    }

    Ok(plan
        .ranges()
        .into_iter()
        .zip(paths)
        .enumerate()
        .map(|(index, ((start_ms, end_ms), path))| Chunk {
            index,
            start_ms,
            end_ms,
            file: ChunkFile::owned(path),
        })
        .collect())
}
