mod json;
mod memory;

pub use json::JsonFileStore;
pub use memory::MemoryHistoryStore;

use async_trait::async_trait;
use log::info;
use std::error::Error;
use std::sync::Arc;
use crate::cli::Args;
use crate::models::chat::{ ChatLog, Exchange };

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("history store not found at {0}")]
    Missing(String),
    #[error("history store is corrupt: {0}")]
    Corrupt(String),
    #[error("history store io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("history serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Process-wide chat history. Appends to any chat are serialized by the store.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, chat_id: &str, exchange: Exchange) -> Result<(), StoreError>;

    async fn load(&self) -> Result<ChatLog, StoreError>;

    async fn save(&self, log: &ChatLog) -> Result<(), StoreError>;

    async fn get_conversation(&self, chat_id: &str) -> Result<Option<Vec<Exchange>>, StoreError> {
        Ok(self.load().await?.chats.remove(chat_id))
    }
}

pub async fn create_history_store(
    args: &Args
) -> Result<Arc<dyn HistoryStore>, Box<dyn Error + Send + Sync>> {
    match args.history_type.to_lowercase().as_str() {
        "json" => {
            let store = JsonFileStore::open(&args.history_path, args.history_init).await?;
            Ok(Arc::new(store))
        }
        "memory" => Ok(Arc::new(MemoryHistoryStore::default())),
        _ =>
            Err(
                Box::new(
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        format!("Unsupported history store type: {}", args.history_type)
                    )
                )
            ),
    }
}

pub async fn initialize_history_store(
    args: &Args
) -> Result<Arc<dyn HistoryStore>, Box<dyn Error + Send + Sync>> {
    info!("Chat history will be stored in: {} at {}", args.history_type, args.history_path);
    create_history_store(args).await
}
