use std::path::PathBuf;

/// Audio container formats the pipeline accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerFormat {
    Mp3,
    M4a,
    Wav,
    Ogg,
    Webm,
}

impl ContainerFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp3" => Some(Self::Mp3),
            "m4a" => Some(Self::M4a),
            "wav" => Some(Self::Wav),
            "ogg" => Some(Self::Ogg),
            "webm" => Some(Self::Webm),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::M4a => "m4a",
            Self::Wav => "wav",
            Self::Ogg => "ogg",
            Self::Webm => "webm",
        }
    }

    /// Whether segment boundaries can be cut with a stream copy.
    /// MP3 and WAV frames are self-contained; the other containers go
    /// through the decode/re-encode path.
    pub fn supports_stream_copy(self) -> bool {
        matches!(self, Self::Mp3 | Self::Wav)
    }
}

/// Resolved source audio file. Immutable once probed.
#[derive(Clone, Debug)]
pub struct AudioAsset {
    pub path: PathBuf,
    pub duration_ms: u64,
    pub byte_size: u64,
    pub format: ContainerFormat,
}
