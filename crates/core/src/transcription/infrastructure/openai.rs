use std::path::Path;
use std::time::Duration;

use log::debug;
use serde::Deserialize;

use crate::transcription::domain::backend::{
    BackendAdapter, BackendCapabilities, BackendError, BackendTranscript,
};
use crate::transcription::infrastructure::http::{classify_status, classify_transport};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const MAX_FILE_BYTES: u64 = 25 * 1024 * 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);
const SUPPORTED_LANGUAGES: &[&str] = &["en", "nl", "fr", "es"];

// gpt-4o-transcribe caps its output tokens, which in practice limits
// how much audio a single request may carry.
const GPT4O_MAX_CHUNK_MS: u64 = 25 * 60 * 1000;

/// One OpenAI speech-to-text model served by the `/audio/transcriptions`
/// multipart endpoint.
#[derive(Clone, Copy)]
struct ModelProfile {
    name: &'static str,
    model: &'static str,
    response_format: &'static str,
    max_chunk_ms: u64,
}

const WHISPER: ModelProfile = ModelProfile {
    name: "whisper",
    model: "whisper-1",
    response_format: "verbose_json",
    max_chunk_ms: u64::MAX,
};

const GPT4O: ModelProfile = ModelProfile {
    name: "gpt4o",
    model: "gpt-4o-transcribe",
    // gpt-4o-transcribe does not offer verbose_json, so no detected
    // language comes back from it
    response_format: "json",
    max_chunk_ms: GPT4O_MAX_CHUNK_MS,
};

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
    language: Option<String>,
}

/// OpenAI speech-to-text over the `/audio/transcriptions` multipart
/// endpoint. Whisper and GPT-4o share the wire format and differ only
/// in model name, response format, and chunk limits.
pub struct OpenAiSpeechBackend {
    base_url: String,
    api_key: String,
    client: reqwest::blocking::Client,
    profile: ModelProfile,
}

impl OpenAiSpeechBackend {
    pub fn whisper(api_key: impl Into<String>) -> Result<Self, BackendError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, WHISPER)
    }

    pub fn gpt4o(api_key: impl Into<String>) -> Result<Self, BackendError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, GPT4O)
    }

    fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        profile: ModelProfile,
    ) -> Result<Self, BackendError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BackendError::Unexpected {
                backend: profile.name,
                message: e.to_string(),
            })?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
            profile,
        })
    }
}

impl BackendAdapter for OpenAiSpeechBackend {
    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            name: self.profile.name,
            max_file_bytes: MAX_FILE_BYTES,
            max_chunk_ms: self.profile.max_chunk_ms,
            supports_language_hint: true,
            supports_context_prompt: true,
        }
    }

    fn transcribe(
        &self,
        chunk: &Path,
        language_hint: Option<&str>,
        context_prompt: &str,
    ) -> Result<BackendTranscript, BackendError> {
        if let Some(code) = language_hint {
            if !SUPPORTED_LANGUAGES.contains(&code) {
                return Err(BackendError::InvalidArgument {
                    backend: self.profile.name,
                    message: format!("unsupported language code '{code}'"),
                });
            }
        }

        let url = format!("{}/audio/transcriptions", self.base_url);
        let mut form = reqwest::blocking::multipart::Form::new()
            .file("file", chunk)
            .map_err(|e| BackendError::Unexpected {
                backend: self.profile.name,
                message: format!("failed to read {}: {e}", chunk.display()),
            })?
            .text("model", self.profile.model)
            .text("response_format", self.profile.response_format);
        if let Some(language) = language_hint {
            form = form.text("language", language.to_string());
        }
        if !context_prompt.is_empty() {
            form = form.text("prompt", context_prompt.to_string());
        }

        debug!("POST {} for {}", url, chunk.display());
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .map_err(|e| classify_transport(self.profile.name, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(classify_status(self.profile.name, status, body));
        }

        let parsed: TranscriptionResponse =
            response.json().map_err(|e| BackendError::Unexpected {
                backend: self.profile.name,
                message: format!("malformed transcription response: {e}"),
            })?;
        Ok(BackendTranscript {
            text: parsed.text.trim().to_string(),
            detected_language: parsed.language,
        })
    }
}
