pub mod api;
pub mod websocket;

use crate::cli::Args;
use crate::dispatch::Dispatcher;
use std::error::Error;

/// Listener settings pulled out of [`Args`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub ws_addr: String,
    pub http_port: Option<u16>,
    pub api_key: Option<String>,
    pub max_message_bytes: usize,
}

impl From<&Args> for ServerConfig {
    fn from(args: &Args) -> Self {
        Self {
            ws_addr: args.server_addr.clone(),
            http_port: args.http_port,
            api_key: args.server_api_key.clone().filter(|k| !k.is_empty()),
            max_message_bytes: args.max_message_bytes,
        }
    }
}

pub struct Server {
    config: ServerConfig,
    dispatcher: Dispatcher,
}

impl Server {
    pub fn new(config: ServerConfig, dispatcher: Dispatcher) -> Self {
        Self { config, dispatcher }
    }

    /// Starts the inspection API in the background when a port is configured, then serves
    /// bridge connections until the listener fails.
    pub async fn run(self) -> Result<(), Box<dyn Error + Send + Sync>> {
        if let Some(port) = self.config.http_port {
            api::start_http_server(port, self.dispatcher.agent().history_store()).await?;
        }

        websocket::start_ws_server(
            &self.config.ws_addr,
            self.dispatcher,
            self.config.api_key,
            self.config.max_message_bytes
        ).await
    }
}
