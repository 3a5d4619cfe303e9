pub mod chat;
pub mod inbound;
pub mod websocket;
