pub mod audio_segment;
pub mod error;
pub mod media_probe;
pub mod segment_extractor;
