pub mod agent;
pub mod audio;
pub mod channel;
pub mod cli;
pub mod dispatch;
pub mod history;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod server;

use agent::RelayAgent;
use cli::Args;
use dispatch::{ DispatchConfig, Dispatcher };
use log::info;
use server::{ Server, ServerConfig };
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("HTTP Port: {:?}", args.http_port);
    info!("Chat LLM Type: {}", args.chat_llm_type);
    info!("Chat Model: {}", args.chat_model.as_deref().unwrap_or("adapter default"));
    info!("Transcription Model: {}", args.transcription_model.as_deref().unwrap_or("adapter default"));
    info!("History Store Type: {}", args.history_type);
    info!("History Store Path: {}", args.history_path);
    info!("Work Dir: {}", args.work_dir);
    info!("Transcoder: {} -> {}", args.ffmpeg_path, args.transcode_format);
    info!("Service Timeout: {}s", args.service_timeout_secs);
    info!("Max Concurrent Pipelines: {}", args.max_concurrent_pipelines);
    info!("Bridge Auth Enabled: {}", args.server_api_key.as_deref().is_some_and(|k| !k.is_empty()));
    info!("-------------------------");

    let agent = Arc::new(RelayAgent::from_args(&args).await?);
    let dispatcher = Dispatcher::new(agent, DispatchConfig {
        max_concurrent_pipelines: args.max_concurrent_pipelines,
        lane_capacity: args.chat_queue_capacity,
        lane_idle: Duration::from_secs(args.chat_lane_idle_secs),
    });

    info!("Starting server on: {}", args.server_addr);
    Server::new(ServerConfig::from(&args), dispatcher).run().await
}
