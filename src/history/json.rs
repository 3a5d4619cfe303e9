use async_trait::async_trait;
use log::{ debug, info };
use std::path::{ Path, PathBuf };
use tokio::sync::Mutex;

use super::{ HistoryStore, StoreError };
use crate::models::chat::{ ChatLog, Exchange };

/// Whole-document JSON store. Every append reloads the file, pushes the exchange and
/// writes the document back through a temp file + rename, all under one lock.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Fails when the document is missing (unless `create_if_missing`) or unreadable.
    pub async fn open(path: impl AsRef<Path>, create_if_missing: bool) -> Result<Self, StoreError> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        };

        if !tokio::fs::try_exists(&store.path).await? {
            if !create_if_missing {
                return Err(StoreError::Missing(store.path.display().to_string()));
            }
            if let Some(parent) = store.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await?;
            }
            store.write(&ChatLog::default()).await?;
            info!("Created empty history store at {}", store.path.display());
        }

        let log = store.read().await?;
        info!(
            "History store {} holds {} chat(s)",
            store.path.display(),
            log.chats.len()
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<ChatLog, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::Missing(self.path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        serde_json
            ::from_slice(&bytes)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", self.path.display(), e)))
    }

    async fn write(&self, log: &ChatLog) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(log)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!("Wrote {} bytes to {}", bytes.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for JsonFileStore {
    async fn append(&self, chat_id: &str, exchange: Exchange) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut log = self.read().await?;
        log.push(chat_id, exchange);
        self.write(&log).await
    }

    async fn load(&self) -> Result<ChatLog, StoreError> {
        self.read().await
    }

    async fn save(&self, log: &ChatLog) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.write(log).await
    }
}
