/// Ordered cut points for one audio asset.
///
/// Cut points are strictly increasing and lie inside `(0, duration)`.
/// An empty plan means the asset is processed as a single chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentPlan {
    cut_points_ms: Vec<u64>,
    duration_ms: u64,
}

impl SegmentPlan {
    pub fn new(cut_points_ms: Vec<u64>, duration_ms: u64) -> Self {
        debug_assert!(cut_points_ms.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(cut_points_ms.iter().all(|&c| c > 0 && c < duration_ms));
        Self {
            cut_points_ms,
            duration_ms,
        }
    }

    pub fn empty(duration_ms: u64) -> Self {
        Self {
            cut_points_ms: Vec::new(),
            duration_ms,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cut_points_ms.is_empty()
    }

    pub fn cut_points(&self) -> &[u64] {
        &self.cut_points_ms
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn chunk_count(&self) -> usize {
        self.cut_points_ms.len() + 1
    }

    /// Chunk time ranges covering `[0, duration)` without gap or overlap.
    pub fn ranges(&self) -> Vec<(u64, u64)> {
        let mut ranges = Vec::with_capacity(self.chunk_count());
        let mut start = 0;
        for &cut in &self.cut_points_ms {
            ranges.push((start, cut));
            start = cut;
        }
        ranges.push((start, self.duration_ms));
        ranges
    }
}
