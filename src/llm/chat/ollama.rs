use async_trait::async_trait;
use log::debug;
use serde::{ Deserialize, Serialize };
use std::error::Error as StdError;

use super::{ ensure_success, ChatClient, CompletionResponse };

pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_OLLAMA_MODEL: &str = "llama3";

/// Local Ollama server, non-streaming `/api/generate`.
#[derive(Debug)]
pub struct OllamaChatClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct Generated {
    response: String,
}

impl OllamaChatClient {
    pub fn new(base_url: Option<String>, model: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_OLLAMA_BASE_URL.to_string()),
            model: model.unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
        }
    }
}

#[async_trait]
impl ChatClient for OllamaChatClient {
    async fn complete(
        &self,
        prompt: &str
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));
        debug!("Sending {} prompt chars to {}", prompt.len(), url);

        let body = GenerateBody { model: &self.model, prompt, stream: false };
        let response = ensure_success(self.http.post(&url).json(&body).send().await?).await?;
        let generated: Generated = response.json().await?;

        Ok(CompletionResponse { response: generated.response.trim().to_string() })
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> &str {
        &self.base_url
    }
}
