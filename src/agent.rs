use crate::audio::{ AudioWorkspace, FfmpegTranscoder };
use crate::channel::{ ChannelError, ChatChannel };
use crate::cli::Args;
use crate::history::{ initialize_history_store, HistoryStore };
use crate::ingest::{ self, AudioIngest };
use crate::llm::chat::{ ChatClient, new_client as new_chat_client };
use crate::llm::transcription::{ OpenAIWhisperClient, Transcriber };
use crate::llm::ChatConfig;
use crate::models::chat::{ Exchange, Turn };
use crate::models::inbound::{ InboundEvent, InboundMessage, MediaPayload };

use chrono::{ DateTime, Utc };
use log::{ debug, error, info, warn };
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

pub const DEFAULT_FALLBACK_REPLY: &str = "Something went wrong";

/// Why an event produced neither a reply nor a stored exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    Status,
    UnsupportedMedia(String),
    MediaUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Dropped(DropReason),
    /// `persisted` is false when the reply went out but the history write failed.
    Completed { exchange: Exchange, persisted: bool },
}

/// Routes inbound events: classify, build the prompt, complete, reply, record.
pub struct RelayAgent {
    chat_client: Arc<dyn ChatClient>,
    history_store: Arc<dyn HistoryStore>,
    audio: AudioIngest,
    service_timeout: Duration,
    fallback_reply: String,
}

impl RelayAgent {
    pub fn new(
        chat_client: Arc<dyn ChatClient>,
        history_store: Arc<dyn HistoryStore>,
        audio: AudioIngest,
        service_timeout: Duration
    ) -> Self {
        Self {
            chat_client,
            history_store,
            audio,
            service_timeout,
            fallback_reply: DEFAULT_FALLBACK_REPLY.to_string(),
        }
    }

    pub fn with_fallback_reply(mut self, reply: impl Into<String>) -> Self {
        self.fallback_reply = reply.into();
        self
    }

    pub async fn from_args(args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let chat_config = ChatConfig {
            provider: args.chat_llm_type.parse()?,
            api_key: args.chat_key(),
            model: args.chat_model.clone(),
            base_url: args.chat_base_url.clone(),
        };
        let chat_client = new_chat_client(&chat_config)?;
        info!(
            "Chat client configured: Provider={}, Model={}, Endpoint={}",
            chat_config.provider,
            chat_client.model(),
            chat_client.endpoint()
        );

        let transcription_key = args
            .transcription_key()
            .ok_or_else(|| "A transcription API key is required (OPENAI_API_KEY)".to_string())?;
        let transcriber: Arc<dyn Transcriber> = Arc::new(
            OpenAIWhisperClient::new(
                transcription_key,
                args.transcription_base_url.clone(),
                args.transcription_model.clone()
            )
        );

        let history_store = initialize_history_store(args).await?;
        let service_timeout = Duration::from_secs(args.service_timeout_secs);
        let audio = AudioIngest::new(
            AudioWorkspace::new(&args.work_dir),
            Arc::new(FfmpegTranscoder::new(&args.ffmpeg_path, &args.transcode_format)),
            transcriber,
            service_timeout
        );

        Ok(
            Self::new(chat_client, history_store, audio, service_timeout).with_fallback_reply(
                &args.fallback_reply
            )
        )
    }

    pub fn history_store(&self) -> Arc<dyn HistoryStore> {
        Arc::clone(&self.history_store)
    }

    /// Processes an event that arrives now. See [`RelayAgent::process_message_at`].
    pub async fn process_message(&self, event: &InboundEvent, channel: &dyn ChatChannel) -> Outcome {
        self.process_message_at(event, Utc::now(), channel).await
    }

    /// Never fails: every error along the way is logged and replaced by a fallback.
    /// `received_at` stamps the prompt turn, so queued events keep their arrival time.
    pub async fn process_message_at(
        &self,
        event: &InboundEvent,
        received_at: DateTime<Utc>,
        channel: &dyn ChatChannel
    ) -> Outcome {
        let chat_id = event.from.as_str();

        let media = match self.fetch_media(event, channel).await {
            Ok(m) => m,
            Err(reason) => return Outcome::Dropped(reason),
        };

        let prompt = match InboundMessage::classify(event, media) {
            InboundMessage::Status => {
                debug!("Ignoring status update from {}", chat_id);
                return Outcome::Dropped(DropReason::Status);
            }
            InboundMessage::OtherMedia { mime_type } => {
                info!("Ignoring {} media from {}", mime_type, chat_id);
                return Outcome::Dropped(DropReason::UnsupportedMedia(mime_type));
            }
            InboundMessage::Text { body } => ingest::text::ingest(&body, received_at),
            InboundMessage::Audio { codec, payload } => {
                let transcript = self.audio.ingest(chat_id, codec, &payload).await;
                Turn::at(transcript, received_at)
            }
        };

        let reply = self.complete_or_fallback(chat_id, &prompt.content).await;

        if let Err(e) = self.bounded(channel.reply(event, &reply)).await {
            error!("Failed to send reply to {}: {}", chat_id, e);
        }

        let exchange = Exchange {
            message: prompt,
            response: Turn::now(reply),
        };
        let persisted = match self.history_store.append(chat_id, exchange.clone()).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to record exchange for {}: {}", chat_id, e);
                false
            }
        };

        Outcome::Completed { exchange, persisted }
    }

    /// Media is only fetched for non-status events that announce it.
    async fn fetch_media(
        &self,
        event: &InboundEvent,
        channel: &dyn ChatChannel
    ) -> Result<Option<MediaPayload>, DropReason> {
        if event.is_status || !event.has_media {
            return Ok(None);
        }
        match self.bounded(channel.download_media(event)).await {
            Ok(m) => Ok(Some(m)),
            Err(e) => {
                warn!("Dropping message from {}: media download failed: {}", event.from, e);
                Err(DropReason::MediaUnavailable)
            }
        }
    }

    async fn complete_or_fallback(&self, chat_id: &str, prompt: &str) -> String {
        match timeout(self.service_timeout, self.chat_client.complete(prompt)).await {
            Ok(Ok(resp)) => resp.response,
            Ok(Err(e)) => {
                error!("Completion failed for {}: {}", chat_id, e);
                self.fallback_reply.clone()
            }
            Err(_) => {
                error!(
                    "Completion for {} timed out after {}s",
                    chat_id,
                    self.service_timeout.as_secs()
                );
                self.fallback_reply.clone()
            }
        }
    }

    async fn bounded<T>(
        &self,
        call: impl std::future::Future<Output = Result<T, ChannelError>>
    ) -> Result<T, ChannelError> {
        match timeout(self.service_timeout, call).await {
            Ok(r) => r,
            Err(_) =>
                Err(
                    ChannelError::Other(
                        format!("timed out after {}s", self.service_timeout.as_secs())
                    )
                ),
        }
    }
}
