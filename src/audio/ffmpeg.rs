use async_trait::async_trait;
use log::debug;
use std::path::Path;
use tokio::process::Command;

use super::{ TranscodeError, Transcoder };

/// Shells out to an `ffmpeg` binary.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary: String,
    target_format: String,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<String>, target_format: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            target_format: target_format.into(),
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    fn target_format(&self) -> &str {
        &self.target_format
    }

    async fn transcode(
        &self,
        input: &Path,
        input_format: &str,
        output: &Path
    ) -> Result<(), TranscodeError> {
        debug!(
            "Transcoding {} ({}) -> {} ({})",
            input.display(),
            input_format,
            output.display(),
            self.target_format
        );

        let result = Command::new(&self.binary)
            .arg("-y")
            .args(["-loglevel", "error"])
            .args(["-f", input_format])
            .arg("-i")
            .arg(input)
            .args(["-f", self.target_format.as_str()])
            .arg(output)
            .kill_on_drop(true)
            .output().await?;

        if !result.status.success() {
            return Err(TranscodeError::Failed {
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}
