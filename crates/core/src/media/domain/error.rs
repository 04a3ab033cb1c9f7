use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("audio asset not found: {0}")]
    NotFound(PathBuf),

    #[error("no audio stream in {0}")]
    NoAudioStream(PathBuf),

    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: ffmpeg_next::Error,
    },

    #[error("unsupported container format: {0}")]
    UnsupportedFormat(String),

    #[error("segment extraction produced {produced} files, expected {expected}")]
    IncompleteSplit { expected: usize, produced: usize },

    #[error("audio encoder unavailable: {0}")]
    Encoder(String),

    #[error("ffmpeg error: {0}")]
    Ffmpeg(#[from] ffmpeg_next::Error),

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
