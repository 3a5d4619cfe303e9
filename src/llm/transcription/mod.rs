pub mod openai;

use async_trait::async_trait;
use std::path::Path;

pub use self::openai::OpenAIWhisperClient;

/// Audio file in, transcript out. No retries; callers decide what a failure means.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    #[error("reading audio file failed: {0}")]
    ReadFailed(#[from] std::io::Error),
    #[error("api request failed: {0}")]
    ApiRequestFailed(String),
    #[error("transcription timed out after {0}s")]
    TimedOut(u64),
}
