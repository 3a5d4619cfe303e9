pub mod ollama;
pub mod openai;

use async_trait::async_trait;
use std::error::Error as StdError;
use std::sync::Arc;

use super::{ ChatConfig, ChatProvider };
pub use self::ollama::OllamaChatClient;
pub use self::openai::OpenAIChatClient;

#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub response: String,
}

/// Text prompt in, reply text out. Failures are returned as-is; callers pick the fallback.
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &str
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>>;

    fn model(&self) -> &str;

    fn endpoint(&self) -> &str;
}

pub fn new_client(
    config: &ChatConfig
) -> Result<Arc<dyn ChatClient>, Box<dyn StdError + Send + Sync>> {
    Ok(match config.provider {
        ChatProvider::OpenAI => {
            let api_key = config.api_key
                .clone()
                .ok_or("an API key is required for the openai chat provider")?;
            Arc::new(OpenAIChatClient::new(api_key, config.model.clone(), config.base_url.clone())?)
        }
        ChatProvider::Ollama =>
            Arc::new(OllamaChatClient::new(config.base_url.clone(), config.model.clone())),
    })
}

/// Turns a non-2xx response into an error that keeps the status and body.
pub(crate) async fn ensure_success(
    response: reqwest::Response
) -> Result<reqwest::Response, Box<dyn StdError + Send + Sync>> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(format!("completion request failed with {}: {}", status, body.trim()).into())
}
