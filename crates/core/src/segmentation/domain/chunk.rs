use std::path::{Path, PathBuf};

use crate::shared::files;

/// File backing one chunk. Owned files were materialized by the pipeline
/// run and are deleted on completion; a borrowed file aliases the source
/// asset (single-chunk case) and is left alone.
#[derive(Clone, Debug)]
pub struct ChunkFile {
    path: PathBuf,
    owned: bool,
}

impl ChunkFile {
    pub fn owned(path: PathBuf) -> Self {
        Self { path, owned: true }
    }

    pub fn borrowed(path: PathBuf) -> Self {
        Self { path, owned: false }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_owned(&self) -> bool {
        self.owned
    }
}

/// A bounded time range of the source audio, backed by its own file.
/// The index defines transcript order.
#[derive(Clone, Debug)]
pub struct Chunk {
    pub index: usize,
    pub start_ms: u64,
    pub end_ms: u64,
    pub file: ChunkFile,
}

/// Delete the files of all owned chunks, returning how many were removed.
pub fn remove_chunk_files(chunks: &[Chunk]) -> usize {
    let owned: Vec<PathBuf> = chunks
        .iter()
        .filter(|c| c.file.is_owned())
        .map(|c| c.file.path().to_path_buf())
        .collect();
    files::remove_files(&owned)
}
