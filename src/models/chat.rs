use chrono::{ DateTime, Utc };
use serde::{ Serialize, Deserialize };
use std::collections::BTreeMap;

/// RFC-1123 with every space replaced by `-`, e.g. `Mon,-19-Oct-2026-14:22:05-GMT`.
pub const SENT_DATE_FORMAT: &str = "%a,-%d-%b-%Y-%H:%M:%S-GMT";

pub fn format_sent_date(at: DateTime<Utc>) -> String {
    at.format(SENT_DATE_FORMAT).to_string()
}

/// One side of an exchange: what was said and when.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub content: String,
    #[serde(rename = "sentDate")]
    pub sent_date: String,
}

impl Turn {
    pub fn at(content: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            content: content.into(),
            sent_date: format_sent_date(at),
        }
    }

    pub fn now(content: impl Into<String>) -> Self {
        Self::at(content, Utc::now())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub message: Turn,
    pub response: Turn,
}

/// The whole persisted document: `{"chats": {<chat id>: [exchange, ...]}}`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatLog {
    pub chats: BTreeMap<String, Vec<Exchange>>,
}

impl ChatLog {
    pub fn push(&mut self, chat_id: &str, exchange: Exchange) {
        self.chats.entry(chat_id.to_string()).or_default().push(exchange);
    }

    pub fn conversation(&self, chat_id: &str) -> Option<&[Exchange]> {
        self.chats.get(chat_id).map(Vec::as_slice)
    }
}
