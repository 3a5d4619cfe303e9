use chrono::Utc;
use log::{ debug, warn };
use std::io::ErrorKind;
use std::path::{ Path, PathBuf };
use sha2::{ Digest, Sha256 };
use uuid::Uuid;

/// Root under which each chat gets a lazily created working directory.
#[derive(Debug, Clone)]
pub struct AudioWorkspace {
    root: PathBuf,
}

/// Files written for a single voice note. Dropping this does not delete anything;
/// call [`AudioArtifacts::cleanup`].
#[derive(Debug)]
pub struct AudioArtifacts {
    dir: PathBuf,
    raw: PathBuf,
    transcoded: Option<PathBuf>,
}

impl AudioWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<root>/<sanitized id>-<digest>`. The digest of the raw id keeps chats whose ids
    /// sanitize to the same text in separate directories.
    pub fn chat_dir(&self, chat_id: &str) -> PathBuf {
        self.root.join(format!("{}-{}", sanitize_chat_id(chat_id), chat_digest(chat_id)))
    }

    /// Writes `bytes` to `<root>/<chat>/<timestamp>-<nonce>.<extension>`.
    pub async fn store_raw(
        &self,
        chat_id: &str,
        extension: &str,
        bytes: &[u8]
    ) -> std::io::Result<AudioArtifacts> {
        let dir = self.chat_dir(chat_id);
        tokio::fs::create_dir_all(&dir).await?;

        let raw = dir.join(format!("{}.{}", artifact_stem(), extension));
        tokio::fs::write(&raw, bytes).await?;
        debug!("Stored {} bytes of audio at {}", bytes.len(), raw.display());

        Ok(AudioArtifacts { dir, raw, transcoded: None })
    }
}

impl AudioArtifacts {
    pub fn raw(&self) -> &Path {
        &self.raw
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserves the sibling path the transcoder should write to.
    pub fn transcoded_path(&mut self, format: &str) -> PathBuf {
        let path = self.raw.with_extension(format);
        self.transcoded = Some(path.clone());
        path
    }

    /// Removes every file of this voice note, then the chat directory if nothing else is left.
    /// Failures are logged only.
    pub async fn cleanup(self) {
        let files = std::iter::once(self.raw).chain(self.transcoded);
        for file in files {
            match tokio::fs::remove_file(&file).await {
                Ok(()) => debug!("Removed {}", file.display()),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove {}: {}", file.display(), e),
            }
        }

        match tokio::fs::remove_dir(&self.dir).await {
            Ok(()) => debug!("Removed {}", self.dir.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => debug!("Leaving {} in place: {}", self.dir.display(), e),
        }
    }
}

fn artifact_stem() -> String {
    let nonce = Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().format("%Y%m%dT%H%M%S%.6fZ"), &nonce[..8])
}

fn chat_digest(chat_id: &str) -> String {
    let digest = Sha256::digest(chat_id.as_bytes());
    hex::encode(&digest[..4])
}

pub(crate) fn sanitize_chat_id(chat_id: &str) -> String {
    let cleaned: String = chat_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '_' | '-') { c } else { '_' })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => format!("_{}", cleaned),
        _ => cleaned,
    }
}
