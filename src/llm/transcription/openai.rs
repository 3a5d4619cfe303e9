use async_trait::async_trait;
use log::{ debug, info };
use reqwest::multipart;
use serde::Deserialize;
use std::path::Path;

use super::{ Transcriber, TranscriptionError };
use crate::llm::chat::openai::DEFAULT_OPENAI_BASE_URL;

const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";

pub struct OpenAIWhisperClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl OpenAIWhisperClient {
    pub fn new(api_key: String, base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_TRANSCRIPTION_MODEL.to_string()),
        }
    }
}

fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("ogg") | Some("oga") | Some("opus") => "audio/ogg",
        Some("wav") => "audio/wav",
        Some("m4a") => "audio/mp4",
        Some("webm") => "audio/webm",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl Transcriber for OpenAIWhisperClient {
    async fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionError> {
        let url = format!("{}/v1/audio/transcriptions", self.base_url.trim_end_matches('/'));
        let audio = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());

        let file_part = multipart::Part::bytes(audio)
            .file_name(file_name)
            .mime_str(mime_for(audio_path))
            .map_err(|e| TranscriptionError::ApiRequestFailed(format!("mime: {}", e)))?;

        let form = multipart::Form::new()
            .text("model", self.model.clone())
            .part("file", file_part);

        debug!("Sending {} to {} ({})", audio_path.display(), url, self.model);

        let response = self.http
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send().await
            .map_err(|e| TranscriptionError::ApiRequestFailed(format!("request: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text().await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(TranscriptionError::ApiRequestFailed(format!("status {}: {}", status, body)));
        }

        let transcript = response
            .json::<TranscriptionResponse>().await
            .map_err(|e| TranscriptionError::ApiRequestFailed(format!("body: {}", e)))?;

        info!("Transcription completed: {} chars", transcript.text.len());

        Ok(transcript.text.trim().to_string())
    }
}
