pub mod chat;
pub mod transcription;

use std::fmt;
use std::str::FromStr;

/// Backend that answers prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatProvider {
    OpenAI,
    Ollama,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown chat provider '{0}' (expected openai or ollama)")]
pub struct UnknownProvider(String);

impl FromStr for ChatProvider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            _ => Err(UnknownProvider(s.to_string())),
        }
    }
}

impl fmt::Display for ChatProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OpenAI => "openai",
            Self::Ollama => "ollama",
        })
    }
}

/// Everything needed to build a chat client; `None` means the adapter default.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub provider: ChatProvider,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
}
