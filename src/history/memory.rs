use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{ HistoryStore, StoreError };
use crate::models::chat::{ ChatLog, Exchange };

/// Keeps the chat log in process memory; nothing survives a restart.
#[derive(Default)]
pub struct MemoryHistoryStore {
    log: Mutex<ChatLog>,
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, chat_id: &str, exchange: Exchange) -> Result<(), StoreError> {
        self.log.lock().await.push(chat_id, exchange);
        Ok(())
    }

    async fn load(&self) -> Result<ChatLog, StoreError> {
        Ok(self.log.lock().await.clone())
    }

    async fn save(&self, log: &ChatLog) -> Result<(), StoreError> {
        *self.log.lock().await = log.clone();
        Ok(())
    }
}
