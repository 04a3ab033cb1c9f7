/// Outcome of transcribing one chunk, tagged with its position so the
/// aggregator can reorder results arriving from concurrent workers.
#[derive(Clone, Debug)]
pub struct ChunkResult {
    pub index: usize,
    pub text: String,
    pub language: Option<String>,
    pub attempts: u32,
}
