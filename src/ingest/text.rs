use chrono::{ DateTime, Utc };
use crate::models::chat::Turn;

/// The body is the prompt, untouched. Empty bodies pass through.
pub fn ingest(body: &str, received_at: DateTime<Utc>) -> Turn {
    Turn::at(body, received_at)
}
