use base64::{ engine::general_purpose::STANDARD as BASE64, Engine as _ };
use log::{ info, warn };
use std::path::{ Path, PathBuf };
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::audio::{ AudioArtifacts, AudioWorkspace, TranscodeError, Transcoder };
use crate::llm::transcription::{ Transcriber, TranscriptionError };
use crate::models::inbound::{ AudioCodec, MediaPayload };

/// Prompt used when a voice note could not be turned into text.
pub const TRANSCRIPTION_UNAVAILABLE: &str = "[voice note could not be transcribed]";

#[derive(Debug, thiserror::Error)]
enum IngestError {
    #[error("payload is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("writing working file failed: {0}")]
    Store(#[from] std::io::Error),
}

/// Voice note pipeline: decode, write, transcode, transcribe, clean up.
/// Always yields a prompt; failures degrade it instead of aborting.
pub struct AudioIngest {
    workspace: AudioWorkspace,
    transcoder: Arc<dyn Transcoder>,
    transcriber: Arc<dyn Transcriber>,
    service_timeout: Duration,
}

impl AudioIngest {
    pub fn new(
        workspace: AudioWorkspace,
        transcoder: Arc<dyn Transcoder>,
        transcriber: Arc<dyn Transcriber>,
        service_timeout: Duration
    ) -> Self {
        Self { workspace, transcoder, transcriber, service_timeout }
    }

    pub async fn ingest(&self, chat_id: &str, codec: AudioCodec, payload: &MediaPayload) -> String {
        let mut artifacts = match self.stage(chat_id, codec, payload).await {
            Ok(a) => a,
            Err(e) => {
                warn!("Voice note from {} not staged: {}", chat_id, e);
                return TRANSCRIPTION_UNAVAILABLE.to_string();
            }
        };

        let input = self.transcode(&mut artifacts, codec).await;

        let prompt = match self.transcribe(&input).await {
            Ok(transcript) => {
                info!("Transcribed voice note from {} ({} chars)", chat_id, transcript.len());
                transcript
            }
            Err(e) => {
                warn!("Transcription failed for {}: {}", chat_id, e);
                TRANSCRIPTION_UNAVAILABLE.to_string()
            }
        };

        artifacts.cleanup().await;
        prompt
    }

    async fn stage(
        &self,
        chat_id: &str,
        codec: AudioCodec,
        payload: &MediaPayload
    ) -> Result<AudioArtifacts, IngestError> {
        let bytes = BASE64.decode(payload.data.trim())?;
        Ok(self.workspace.store_raw(chat_id, codec.extension(), &bytes).await?)
    }

    /// Returns the file to transcribe: the transcoded one, or the raw one if transcoding failed.
    async fn transcode(&self, artifacts: &mut AudioArtifacts, codec: AudioCodec) -> PathBuf {
        let target = self.transcoder.target_format().to_string();
        if target.eq_ignore_ascii_case(codec.extension()) {
            return artifacts.raw().to_path_buf();
        }

        let output = artifacts.transcoded_path(&target);
        let result = match
            timeout(
                self.service_timeout,
                self.transcoder.transcode(artifacts.raw(), codec.extension(), &output)
            ).await
        {
            Ok(r) => r,
            Err(_) => Err(TranscodeError::TimedOut(self.service_timeout.as_secs())),
        };

        match result {
            Ok(()) => output,
            Err(e) => {
                warn!("Transcoding {} failed, using original file: {}", artifacts.raw().display(), e);
                artifacts.raw().to_path_buf()
            }
        }
    }

    async fn transcribe(&self, input: &Path) -> Result<String, TranscriptionError> {
        match timeout(self.service_timeout, self.transcriber.transcribe(input)).await {
            Ok(r) => r,
            Err(_) => Err(TranscriptionError::TimedOut(self.service_timeout.as_secs())),
        }
    }
}
