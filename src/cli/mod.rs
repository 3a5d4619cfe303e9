use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Credentials ---
    /// Shared OpenAI API key for completion and transcription.
    #[arg(long, env = "OPENAI_API_KEY", default_value = "")]
    pub openai_api_key: String,

    // --- Chat LLM Provider Args ---
    /// Type of LLM provider for chat completion (openai, ollama)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "openai")]
    pub chat_llm_type: String,

    /// Base URL for the Chat LLM provider API (e.g., http://localhost:11434 for Ollama)
    #[arg(long, env = "CHAT_BASE_URL")] // No default, let adapters handle defaults if None
    pub chat_base_url: Option<String>,

    /// API Key for the Chat LLM provider. Defaults to OPENAI_API_KEY if not set.
    #[arg(long, env = "CHAT_API_KEY")]
    pub chat_api_key: Option<String>,

    /// Model name for chat completion (e.g., gpt-3.5-turbo, llama3)
    #[arg(long, env = "CHAT_MODEL")] // No default, rely on adapter defaults if None
    pub chat_model: Option<String>,

    // --- Transcription Args ---
    /// Base URL for the transcription API (OpenAI compatible).
    #[arg(long, env = "TRANSCRIPTION_BASE_URL")]
    pub transcription_base_url: Option<String>,

    /// API Key for the transcription API. Defaults to OPENAI_API_KEY if not set.
    #[arg(long, env = "TRANSCRIPTION_API_KEY")]
    pub transcription_api_key: Option<String>,

    /// Model name for transcription (e.g., whisper-1)
    #[arg(long, env = "TRANSCRIPTION_MODEL")]
    pub transcription_model: Option<String>,

    // --- Audio Args ---
    /// Directory holding per-chat working files for voice notes.
    #[arg(long, env = "WORK_DIR", default_value = "./media")]
    pub work_dir: String,

    /// ffmpeg executable used to transcode voice notes.
    #[arg(long, env = "FFMPEG_PATH", default_value = "ffmpeg")]
    pub ffmpeg_path: String,

    /// Target format handed to the transcription API.
    #[arg(long, env = "TRANSCODE_FORMAT", default_value = "mp3")]
    pub transcode_format: String,

    // --- History Store Args ---
    /// History chat store type (json, memory)
    #[arg(long, env = "HISTORY_TYPE", default_value = "json")]
    pub history_type: String,

    /// Path of the JSON history document.
    #[arg(long, env = "HISTORY_PATH", default_value = "./chats.json")]
    pub history_path: String,

    /// Create an empty history document when none exists. Without it a missing store is fatal.
    #[arg(long, env = "HISTORY_INIT", default_value = "false")]
    pub history_init: bool,

    // --- Pipeline Args ---
    /// Upper bound in seconds for every external call (download, transcode, transcribe, complete, reply).
    #[arg(long, env = "SERVICE_TIMEOUT_SECS", default_value = "60")]
    pub service_timeout_secs: u64,

    /// Maximum number of message pipelines running at once across all chats.
    #[arg(long, env = "MAX_CONCURRENT_PIPELINES", default_value = "8")]
    pub max_concurrent_pipelines: usize,

    /// Pending messages buffered per chat; further ones are rejected until the lane drains.
    #[arg(long, env = "CHAT_QUEUE_CAPACITY", default_value = "32")]
    pub chat_queue_capacity: usize,

    /// Seconds a chat lane may sit idle before its worker retires.
    #[arg(long, env = "CHAT_LANE_IDLE_SECS", default_value = "300")]
    pub chat_lane_idle_secs: u64,

    /// Reply sent and stored when the completion service fails.
    #[arg(long, env = "FALLBACK_REPLY", default_value = "Something went wrong")]
    pub fallback_reply: String,

    // --- Server Args ---
    /// Host address and port for the bridge WebSocket server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,

    /// Optional API Key required for bridges to connect. If set, the handshake must be signed with it.
    #[arg(long, env = "SERVER_API_KEY")]
    pub server_api_key: Option<String>,

    /// Optional port for the HTTP API (health and history inspection).
    #[arg(long, env = "HTTP_PORT")]
    pub http_port: Option<u16>,

    /// Largest accepted WebSocket frame in bytes.
    #[arg(long, env = "MAX_MESSAGE_BYTES", default_value = "16777216")]
    pub max_message_bytes: usize,
}

impl Args {
    pub fn chat_key(&self) -> Option<String> {
        non_empty(self.chat_api_key.as_deref().unwrap_or(&self.openai_api_key))
    }

    pub fn transcription_key(&self) -> Option<String> {
        non_empty(self.transcription_api_key.as_deref().unwrap_or(&self.openai_api_key))
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s.to_string()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_key_backs_both_adapters() {
        let args = Args::parse_from(["voice-relay", "--openai-api-key", "sk-shared"]);
        assert_eq!(args.chat_key().as_deref(), Some("sk-shared"));
        assert_eq!(args.transcription_key().as_deref(), Some("sk-shared"));
        assert_eq!(args.fallback_reply, "Something went wrong");
    }

    #[test]
    fn per_adapter_key_overrides_shared() {
        let args = Args::parse_from([
            "voice-relay",
            "--openai-api-key",
            "sk-shared",
            "--transcription-api-key",
            "sk-whisper",
        ]);
        assert_eq!(args.chat_key().as_deref(), Some("sk-shared"));
        assert_eq!(args.transcription_key().as_deref(), Some("sk-whisper"));
    }
}
