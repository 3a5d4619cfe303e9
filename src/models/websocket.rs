use serde::{ Serialize, Deserialize };
use super::inbound::InboundEvent;

/// Frames sent by the messaging bridge.
#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "message")] Message(InboundEvent),
}

/// Frames sent back to the messaging bridge.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "reply")] Reply {
        to: String,
        #[serde(rename = "messageId", skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
        content: String,
    },
    #[serde(rename = "error")] Error {
        message: String,
    },
}
