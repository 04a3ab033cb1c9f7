pub mod jobs;
pub mod media;
pub mod pipeline;
pub mod segmentation;
pub mod shared;
pub mod transcription;
