use std::path::Path;
use std::time::Duration;

use log::debug;
use serde::Deserialize;
use serde_json::json;

use crate::transcription::domain::backend::{
    BackendAdapter, BackendCapabilities, BackendError, BackendTranscript,
};
use crate::transcription::infrastructure::http::{classify_status, classify_transport};

const BACKEND_NAME: &str = "assemblyai";
const DEFAULT_BASE_URL: &str = "https://api.assemblyai.com/v2";
const MAX_FILE_BYTES: u64 = 2 * 1024 * 1024 * 1024;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);
const POLL_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Deserialize)]
struct TranscriptResponse {
    id: String,
    status: String,
    text: Option<String>,
    language_code: Option<String>,
    error: Option<String>,
}

/// AssemblyAI speech-to-text: upload the chunk, create a transcript
/// job, poll until it settles. The API has no prompt parameter, so the
/// context prompt is ignored and the capability flag says so.
pub struct AssemblyAiBackend {
    base_url: String,
    api_key: String,
    client: reqwest::blocking::Client,
    poll_interval: Duration,
}

impl AssemblyAiBackend {
    pub fn new(api_key: impl Into<String>) -> Result<Self, BackendError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, BackendError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| BackendError::Unexpected {
                backend: BACKEND_NAME,
                message: e.to_string(),
            })?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
            poll_interval: POLL_INTERVAL,
        })
    }

    fn upload(&self, chunk: &Path) -> Result<String, BackendError> {
        let bytes = std::fs::read(chunk).map_err(|e| BackendError::Unexpected {
            backend: BACKEND_NAME,
            message: format!("failed to read {}: {e}", chunk.display()),
        })?;
        let url = format!("{}/upload", self.base_url);
        debug!("POST {} ({} bytes)", url, bytes.len());
        let response = self
            .client
            .post(&url)
            .header("authorization", &self.api_key)
            .body(bytes)
            .send()
            .map_err(|e| classify_transport(BACKEND_NAME, e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(classify_status(BACKEND_NAME, status, body));
        }
        let parsed: UploadResponse = response.json().map_err(|e| BackendError::Unexpected {
            backend: BACKEND_NAME,
            message: format!("malformed upload response: {e}"),
        })?;
        Ok(parsed.upload_url)
    }

    fn create_transcript(
        &self,
        audio_url: &str,
        language_hint: Option<&str>,
    ) -> Result<TranscriptResponse, BackendError> {
        let mut body = json!({ "audio_url": audio_url });
        match language_hint {
            Some(code) => body["language_code"] = json!(code),
            None => body["language_detection"] = json!(true),
        }
        let url = format!("{}/transcript", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("authorization", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| classify_transport(BACKEND_NAME, e))?;
        self.parse_transcript(response)
    }

    fn poll_transcript(&self, id: &str) -> Result<TranscriptResponse, BackendError> {
        let url = format!("{}/transcript/{id}", self.base_url);
        loop {
            let response = self
                .client
                .get(&url)
                .header("authorization", &self.api_key)
                .send()
                .map_err(|e| classify_transport(BACKEND_NAME, e))?;
            let transcript = self.parse_transcript(response)?;
            match transcript.status.as_str() {
                "completed" => return Ok(transcript),
                "error" => {
                    return Err(BackendError::Unexpected {
                        backend: BACKEND_NAME,
                        message: transcript
                            .error
                            .unwrap_or_else(|| String::from("transcription failed")),
                    })
                }
                _ => std::thread::sleep(self.poll_interval),
            }
        }
    }

    fn parse_transcript(
        &self,
        response: reqwest::blocking::Response,
    ) -> Result<TranscriptResponse, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(classify_status(BACKEND_NAME, status, body));
        }
        response.json().map_err(|e| BackendError::Unexpected {
            backend: BACKEND_NAME,
            message: format!("malformed transcript response: {e}"),
        })
    }
}

impl BackendAdapter for AssemblyAiBackend {
    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            name: BACKEND_NAME,
            max_file_bytes: MAX_FILE_BYTES,
            max_chunk_ms: u64::MAX,
            supports_language_hint: true,
            supports_context_prompt: false,
        }
    }

    fn transcribe(
        &self,
        chunk: &Path,
        language_hint: Option<&str>,
        _context_prompt: &str,
    ) -> Result<BackendTranscript, BackendError> {
        let audio_url = self.upload(chunk)?;
        let created = self.create_transcript(&audio_url, language_hint)?;
        let finished = self.poll_transcript(&created.id)?;
        Ok(BackendTranscript {
            text: finished.text.unwrap_or_default().trim().to_string(),
            detected_language: finished.language_code,
        })
    }
}
