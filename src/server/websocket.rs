use crate::channel::{ ChannelError, ChatChannel };
use crate::dispatch::{ DispatchError, Dispatcher };
use crate::models::inbound::{ InboundEvent, MediaPayload };
use crate::models::websocket::{ ClientMessage, ServerMessage };

use std::collections::HashMap;
use std::error::Error;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{ AsyncRead, AsyncWrite };
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use tokio_tungstenite::{ accept_hdr_async, WebSocketStream };
use tokio_tungstenite::tungstenite::handshake::server::{ Request, Response, ErrorResponse };
use tokio_tungstenite::tungstenite::protocol::Message;

use governor::{ RateLimiter, Quota };
use hmac::{ Hmac, Mac };
use sha2::Sha256;
use chrono::Utc;
use url::form_urlencoded;

use log::{ debug, info, warn, error };
use futures::{ SinkExt, StreamExt };
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const CONNECTIONS_PER_SECOND: u32 = 10;
const SIGNATURE_WINDOW_SECS: i64 = 300;
const OUTBOUND_QUEUE: usize = 64;

/// Reply path back to one connected messaging bridge.
pub struct WsChannel {
    outbound: mpsc::Sender<Message>,
}

impl WsChannel {
    pub fn new(outbound: mpsc::Sender<Message>) -> Self {
        Self { outbound }
    }
}

#[async_trait]
impl ChatChannel for WsChannel {
    /// The bridge ships media inline with the event.
    async fn download_media(&self, event: &InboundEvent) -> Result<MediaPayload, ChannelError> {
        event.media
            .clone()
            .ok_or_else(|| ChannelError::MediaMissing(event.id.clone().unwrap_or_else(|| event.from.clone())))
    }

    async fn reply(&self, event: &InboundEvent, content: &str) -> Result<(), ChannelError> {
        let reply = ServerMessage::Reply {
            to: event.from.clone(),
            message_id: event.id.clone(),
            content: content.to_string(),
        };
        let json = serde_json::to_string(&reply).map_err(|e| ChannelError::Other(e.to_string()))?;
        self.outbound.send(Message::Text(json)).await.map_err(|_| ChannelError::Disconnected)
    }
}

/// Checks `sig == hex(HMAC-SHA256(secret, ts))` with `ts` within the allowed clock window.
pub fn verify_signature(secret: &str, ts: &str, sig: &str, now: i64) -> Result<(), &'static str> {
    let ts_i: i64 = ts.parse().map_err(|_| "bad timestamp")?;
    if (now - ts_i).abs() > SIGNATURE_WINDOW_SECS {
        return Err("timestamp out of range");
    }
    let sig_bytes = hex::decode(sig).map_err(|_| "bad signature")?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| "bad key")?;
    mac.update(ts.as_bytes());
    mac.verify_slice(&sig_bytes).map_err(|_| "bad signature")
}

pub async fn start_ws_server(
    addr: &str,
    dispatcher: Dispatcher,
    api_key: Option<String>,
    max_message_bytes: usize,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    info!("Bridge WS server listening on: {}", addr);

    let rate = NonZeroU32::new(CONNECTIONS_PER_SECOND).ok_or("connection rate must be non-zero")?;
    let limiter = RateLimiter::direct(Quota::per_second(rate));

    loop {
        let (stream, peer) = listener.accept().await?;

        if limiter.check().is_err() {
            warn!("Global connection rate limit exceeded for {}. Dropping connection.", peer);
            continue;
        }

        info!("Incoming connection from: {}", peer);
        let dispatcher = dispatcher.clone();
        let required_api_key = api_key.clone();

        tokio::spawn(async move {
            if let Err(e) = process_connection(peer, stream, dispatcher, required_api_key, max_message_bytes).await {
                error!("Failed to process connection for {}: {}", peer, e);
            }
        });
    }
}

async fn process_connection<S>(
    peer: SocketAddr,
    stream: S,
    dispatcher: Dispatcher,
    required_api_key: Option<String>,
    max_message_bytes: usize,
) -> Result<(), Box<dyn Error + Send + Sync>>
    where S: AsyncRead + AsyncWrite + Unpin + Send + 'static
{
    let auth_callback = |req: &Request, response: Response| -> Result<Response, ErrorResponse> {
        let secret = match &required_api_key {
            Some(k) if !k.is_empty() => k,
            _ => return Ok(response),
        };

        let qs = req.uri().query().unwrap_or("");
        let params: HashMap<String, String> =
            form_urlencoded::parse(qs.as_bytes()).into_owned().collect();

        let reason = match (params.get("ts"), params.get("sig")) {
            (Some(ts), Some(sig)) => match verify_signature(secret, ts, sig, Utc::now().timestamp()) {
                Ok(()) => return Ok(response),
                Err(reason) => reason,
            },
            _ => "missing ts/sig",
        };

        warn!("Rejected handshake from {}: {}", peer, reason);
        let mut res = ErrorResponse::new(Some(reason.to_string()));
        *res.status_mut() = tokio_tungstenite::tungstenite::http::StatusCode::UNAUTHORIZED;
        Err(res)
    };

    match accept_hdr_async(stream, auth_callback).await {
        Ok(ws) => {
            handle_connection(peer, ws, dispatcher, max_message_bytes).await;
            Ok(())
        }
        Err(e) => {
            error!("Handshake failed for {}: {}", peer, e);
            Err(Box::new(e) as _)
        }
    }
}

fn frame(message: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(message) {
        Ok(json) => Some(Message::Text(json)),
        Err(e) => {
            error!("Failed to encode frame: {}", e);
            None
        }
    }
}

pub async fn handle_connection<S>(
    peer: SocketAddr,
    websocket: WebSocketStream<S>,
    dispatcher: Dispatcher,
    max_message_bytes: usize,
)
    where S: AsyncRead + AsyncWrite + Unpin + Send + 'static
{
    info!("New bridge connection: {}", peer);

    let (mut sink, mut rx) = websocket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<Message>(OUTBOUND_QUEUE);

    // Replies can still be queued by pipelines after the read loop ends.
    tokio::spawn(async move {
        while let Some(message) = out_rx.recv().await {
            if let Err(e) = sink.send(message).await {
                error!("Error sending frame to {}: {}", peer, e);
                break;
            }
        }
        let _ = sink.close().await;
    });

    let channel: Arc<dyn ChatChannel> = Arc::new(WsChannel::new(out_tx.clone()));

    while let Some(msg) = rx.next().await {
        match msg {
            Ok(message) => {
                if message.len() > max_message_bytes {
                    warn!(
                        "Message from {} exceeds size limit ({} > {})",
                        peer,
                        message.len(),
                        max_message_bytes
                    );
                    let error_msg = ServerMessage::Error {
                        message: "Message too large".to_string(),
                    };
                    if let Some(f) = frame(&error_msg) {
                        let _ = out_tx.send(f).await;
                    }
                    break;
                }

                match message {
                    Message::Text(text) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Message(mut event)) => {
                                if event.id.is_none() {
                                    event.id = Some(Uuid::new_v4().to_string());
                                }
                                debug!("Event {:?} from chat {} via {}", event.id, event.from, peer);
                                if let Err(e) = dispatcher.dispatch(event, Arc::clone(&channel)).await {
                                    let DispatchError::LaneFull { ref event, .. } = e;
                                    let busy = ServerMessage::Error {
                                        message: format!(
                                            "{}; message {} was not accepted",
                                            e,
                                            event.id.as_deref().unwrap_or("?")
                                        ),
                                    };
                                    if let Some(f) = frame(&busy) {
                                        if out_tx.send(f).await.is_err() {
                                            break;
                                        }
                                    }
                                }
                            }
                            Err(e) => {
                                error!("Failed to parse message from {}: {}", peer, e);
                                let error_msg = ServerMessage::Error {
                                    message: format!("Failed to parse message: {}", e),
                                };
                                if let Some(f) = frame(&error_msg) {
                                    if out_tx.send(f).await.is_err() {
                                        break;
                                    }
                                }
                            }
                        }
                    }
                    Message::Close(_) => {
                        info!("Received close frame from {}", peer);
                        break;
                    }
                    Message::Ping(ping_data) => {
                        if out_tx.send(Message::Pong(ping_data)).await.is_err() {
                            error!("Failed to send pong to {}", peer);
                            break;
                        }
                    }
                    Message::Pong(_) => {}
                    Message::Binary(_) => {
                        warn!("Ignoring binary message from {}", peer);
                    }
                    Message::Frame(_) => {}
                }
            }
            Err(e) => {
                match e {
                    | tokio_tungstenite::tungstenite::Error::ConnectionClosed
                    | tokio_tungstenite::tungstenite::Error::Protocol(_)
                    | tokio_tungstenite::tungstenite::Error::Utf8 => {
                        info!("Bridge connection closed or protocol error for {}: {}", peer, e);
                    }
                    tokio_tungstenite::tungstenite::Error::Io(ref io_err) if
                        io_err.kind() == std::io::ErrorKind::ConnectionReset
                    => {
                        info!("Bridge connection reset by peer {}", peer);
                    }
                    _ => {
                        error!("Error receiving message from {}: {}", peer, e);
                    }
                }
                break;
            }
        }
    }
    info!("Bridge connection closed for {}", peer);
}
