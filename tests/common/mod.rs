#![allow(dead_code)]

use async_trait::async_trait;
use std::error::Error as StdError;
use std::path::{ Path, PathBuf };
use std::sync::{ Arc, Mutex };
use std::time::Duration;

use voice_relay::agent::RelayAgent;
use voice_relay::audio::{ AudioWorkspace, TranscodeError, Transcoder };
use voice_relay::channel::{ ChannelError, ChatChannel };
use voice_relay::history::{ HistoryStore, MemoryHistoryStore };
use voice_relay::ingest::AudioIngest;
use voice_relay::llm::chat::{ ChatClient, CompletionResponse };
use voice_relay::llm::transcription::{ Transcriber, TranscriptionError };
use voice_relay::models::chat::Exchange;
use voice_relay::models::inbound::{ InboundEvent, MediaPayload };

/// Records replies; hands out the media carried on the event.
#[derive(Default)]
pub struct FakeChannel {
    pub replies: Mutex<Vec<(String, String)>>,
    pub fail_downloads: bool,
}

impl FakeChannel {
    pub fn replies(&self) -> Vec<(String, String)> {
        self.replies.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatChannel for FakeChannel {
    async fn download_media(&self, event: &InboundEvent) -> Result<MediaPayload, ChannelError> {
        if self.fail_downloads {
            return Err(ChannelError::Other("download refused".into()));
        }
        event.media.clone().ok_or_else(|| ChannelError::MediaMissing(event.from.clone()))
    }

    async fn reply(&self, event: &InboundEvent, content: &str) -> Result<(), ChannelError> {
        self.replies.lock().unwrap().push((event.from.clone(), content.to_string()));
        Ok(())
    }
}

/// Answers every prompt with `reply`, or fails when `reply` is None.
pub struct FakeChat {
    pub reply: Option<String>,
    pub delay: Duration,
    pub prompts: Mutex<Vec<String>>,
}

impl FakeChat {
    pub fn replying(reply: &str) -> Self {
        Self { reply: Some(reply.to_string()), delay: Duration::ZERO, prompts: Mutex::new(Vec::new()) }
    }

    pub fn failing() -> Self {
        Self { reply: None, delay: Duration::ZERO, prompts: Mutex::new(Vec::new()) }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatClient for FakeChat {
    async fn complete(
        &self,
        prompt: &str
    ) -> Result<CompletionResponse, Box<dyn StdError + Send + Sync>> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.reply {
            Some(r) => Ok(CompletionResponse { response: r.clone() }),
            None => Err("completion service unreachable".into()),
        }
    }

    fn model(&self) -> &str {
        "fake"
    }

    fn endpoint(&self) -> &str {
        "in-process"
    }
}

pub struct FakeTranscriber {
    pub transcript: Option<String>,
    pub delay: Duration,
    pub inputs: Mutex<Vec<PathBuf>>,
}

impl FakeTranscriber {
    pub fn returning(text: &str) -> Self {
        Self { transcript: Some(text.to_string()), delay: Duration::ZERO, inputs: Mutex::new(Vec::new()) }
    }

    pub fn failing() -> Self {
        Self { transcript: None, delay: Duration::ZERO, inputs: Mutex::new(Vec::new()) }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn inputs(&self) -> Vec<PathBuf> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionError> {
        assert!(audio_path.exists(), "transcriber input {} should exist", audio_path.display());
        self.inputs.lock().unwrap().push(audio_path.to_path_buf());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.transcript {
            Some(t) => Ok(t.clone()),
            None => Err(TranscriptionError::ApiRequestFailed("status 500: boom".into())),
        }
    }
}

/// Copies the input to the output, or fails.
pub struct FakeTranscoder {
    pub succeed: bool,
    pub delay: Duration,
}

impl FakeTranscoder {
    pub fn working() -> Self {
        Self { succeed: true, delay: Duration::ZERO }
    }

    pub fn broken() -> Self {
        Self { succeed: false, delay: Duration::ZERO }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    fn target_format(&self) -> &str {
        "mp3"
    }

    async fn transcode(
        &self,
        input: &Path,
        _input_format: &str,
        output: &Path
    ) -> Result<(), TranscodeError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if !self.succeed {
            return Err(TranscodeError::Failed { status: "exit status: 1".into(), stderr: "bad input".into() });
        }
        tokio::fs::copy(input, output).await?;
        Ok(())
    }
}

pub struct Harness {
    pub agent: Arc<RelayAgent>,
    pub chat: Arc<FakeChat>,
    pub transcriber: Arc<FakeTranscriber>,
    pub store: Arc<dyn HistoryStore>,
    pub work_dir: tempfile::TempDir,
}

pub fn harness(chat: FakeChat, transcriber: FakeTranscriber, transcode_ok: bool) -> Harness {
    let store: Arc<dyn HistoryStore> = Arc::new(MemoryHistoryStore::default());
    harness_with_store(chat, transcriber, transcode_ok, store)
}

pub fn harness_with_store(
    chat: FakeChat,
    transcriber: FakeTranscriber,
    transcode_ok: bool,
    store: Arc<dyn HistoryStore>
) -> Harness {
    let transcoder = if transcode_ok { FakeTranscoder::working() } else { FakeTranscoder::broken() };
    harness_with(chat, transcriber, transcoder, store, Duration::from_secs(5))
}

pub fn harness_with(
    chat: FakeChat,
    transcriber: FakeTranscriber,
    transcoder: FakeTranscoder,
    store: Arc<dyn HistoryStore>,
    service_timeout: Duration
) -> Harness {
    let work_dir = tempfile::tempdir().unwrap();
    let chat = Arc::new(chat);
    let transcriber = Arc::new(transcriber);
    let audio = AudioIngest::new(
        AudioWorkspace::new(work_dir.path()),
        Arc::new(transcoder),
        transcriber.clone(),
        service_timeout
    );
    let agent = Arc::new(RelayAgent::new(chat.clone(), store.clone(), audio, service_timeout));
    Harness { agent, chat, transcriber, store, work_dir }
}

/// True once every per-chat working directory has been removed.
pub fn work_dir_is_empty(h: &Harness) -> bool {
    std::fs::read_dir(h.work_dir.path()).unwrap().next().is_none()
}

pub fn voice_note(from: &str, bytes: &[u8]) -> InboundEvent {
    use base64::{ engine::general_purpose::STANDARD, Engine as _ };
    InboundEvent::with_media(from, MediaPayload {
        mime_type: "audio/ogg; codecs=opus".into(),
        data: STANDARD.encode(bytes),
    })
}

pub async fn conversation(store: &Arc<dyn HistoryStore>, chat_id: &str) -> Vec<Exchange> {
    store.get_conversation(chat_id).await.unwrap().unwrap_or_default()
}

/// Polls until `chat_id` has `count` stored exchanges or five seconds pass.
pub async fn wait_for_exchanges(store: &Arc<dyn HistoryStore>, chat_id: &str, count: usize) -> Vec<Exchange> {
    wait_for_exchanges_within(store, chat_id, count, Duration::from_secs(5)).await
}

pub async fn wait_for_exchanges_within(
    store: &Arc<dyn HistoryStore>,
    chat_id: &str,
    count: usize,
    limit: Duration
) -> Vec<Exchange> {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        let exchanges = conversation(store, chat_id).await;
        if exchanges.len() >= count {
            return exchanges;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    conversation(store, chat_id).await
}
