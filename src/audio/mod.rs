mod ffmpeg;
mod workspace;

pub use ffmpeg::FfmpegTranscoder;
pub use workspace::{ AudioArtifacts, AudioWorkspace };

use async_trait::async_trait;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("failed to launch transcoder: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("transcoder exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("transcoding timed out after {0}s")]
    TimedOut(u64),
}

/// Converts one audio file into another container/codec.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Format name of the files this transcoder produces, also used as their extension.
    fn target_format(&self) -> &str;

    async fn transcode(
        &self,
        input: &Path,
        input_format: &str,
        output: &Path
    ) -> Result<(), TranscodeError>;
}
