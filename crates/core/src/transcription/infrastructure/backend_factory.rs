use thiserror::Error;

use crate::transcription::domain::backend::{BackendAdapter, BackendError};
use crate::transcription::infrastructure::assemblyai::AssemblyAiBackend;
use crate::transcription::infrastructure::openai::OpenAiSpeechBackend;

const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";
const ASSEMBLYAI_KEY_VAR: &str = "ASSEMBLYAI_API_KEY";

#[derive(Error, Debug)]
pub enum BackendFactoryError {
    #[error("unknown transcription backend '{0}', expected 'whisper', 'gpt4o', or 'assemblyai'")]
    UnknownBackend(String),

    #[error("environment variable {0} is not set")]
    MissingApiKey(&'static str),

    #[error("failed to initialize backend")]
    Init(#[from] BackendError),
}

/// Builds the adapter named on the command line, reading its API key
/// from the environment.
pub fn create_backend(name: &str) -> Result<Box<dyn BackendAdapter>, BackendFactoryError> {
    match name {
        "whisper" => {
            let key = api_key(OPENAI_KEY_VAR)?;
            Ok(Box::new(OpenAiSpeechBackend::whisper(key)?))
        }
        "gpt4o" => {
            let key = api_key(OPENAI_KEY_VAR)?;
            Ok(Box::new(OpenAiSpeechBackend::gpt4o(key)?))
        }
        "assemblyai" => {
            let key = api_key(ASSEMBLYAI_KEY_VAR)?;
            Ok(Box::new(AssemblyAiBackend::new(key)?))
        }
        other => Err(BackendFactoryError::UnknownBackend(other.to_string())),
    }
}

fn api_key(var: &'static str) -> Result<String, BackendFactoryError> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(BackendFactoryError::MissingApiKey(var))
}
