pub mod ffmpeg_probe;
pub mod ffmpeg_segment_extractor;
