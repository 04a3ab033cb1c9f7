pub mod audio_asset;
pub mod constants;
pub mod files;
