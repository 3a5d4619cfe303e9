use async_trait::async_trait;
use log::debug;
use reqwest::header::{ HeaderMap, HeaderValue, AUTHORIZATION };
use serde::{ Deserialize, Serialize };
use std::error::Error as StdError;

use super::{ ensure_success, ChatClient, CompletionResponse };

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";

/// OpenAI-compatible `/v1/chat/completions`, one user message per prompt.
pub struct OpenAIChatClient {
    http: reqwest::Client,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: [PromptMessage<'a>; 1],
}

#[derive(Serialize)]
struct PromptMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct Completion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

impl OpenAIChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(
            |e| format!("API key is not a valid header value: {}", e)
        )?;
        bearer.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, bearer);

        Ok(Self {
            http: reqwest::Client::builder().default_headers(headers).build()?,
            model: model.unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            base_url: base_url.unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
        })
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn complete(
        &self,
        prompt: &str
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        debug!("Sending {} prompt chars to {}", prompt.len(), url);

        let body = CompletionBody {
            model: &self.model,
            messages: [PromptMessage { role: "user", content: prompt }],
        };
        let response = ensure_success(self.http.post(&url).json(&body).send().await?).await?;
        let completion: Completion = response.json().await?;

        let content = completion.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or("completion response carried no message")?;

        Ok(CompletionResponse { response: content.trim().to_string() })
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> &str {
        &self.base_url
    }
}
