use async_trait::async_trait;
use crate::models::inbound::{ InboundEvent, MediaPayload };

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("message {0} carries no media")]
    MediaMissing(String),
    #[error("messaging client disconnected")]
    Disconnected,
    #[error("messaging client error: {0}")]
    Other(String),
}

/// The two things the relay needs from the messaging client.
#[async_trait]
pub trait ChatChannel: Send + Sync {
    async fn download_media(&self, event: &InboundEvent) -> Result<MediaPayload, ChannelError>;

    /// Fire-and-forget from the relay's point of view; no delivery receipt is awaited.
    async fn reply(&self, event: &InboundEvent, content: &str) -> Result<(), ChannelError>;
}
