use crate::agent::{ Outcome, RelayAgent };
use crate::channel::ChatChannel;
use crate::models::inbound::InboundEvent;

use chrono::{ DateTime, Utc };
use log::{ debug, error, info, warn };
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{ mpsc, Mutex, Semaphore };
use tokio::time::timeout;

/// An inbound event, when it arrived, and the channel its reply goes back through.
pub struct Envelope {
    pub event: InboundEvent,
    pub received_at: DateTime<Utc>,
    pub channel: Arc<dyn ChatChannel>,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The chat already has `lane_capacity` messages waiting; the event was not queued.
    #[error("chat {chat_id} has too many pending messages")]
    LaneFull { chat_id: String, event: Box<InboundEvent> },
}

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub max_concurrent_pipelines: usize,
    pub lane_capacity: usize,
    pub lane_idle: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent_pipelines: 8,
            lane_capacity: 32,
            lane_idle: Duration::from_secs(300),
        }
    }
}

struct Shared {
    agent: Arc<RelayAgent>,
    lanes: Mutex<HashMap<String, mpsc::Sender<Envelope>>>,
    permits: Semaphore,
    config: DispatchConfig,
}

/// Fans events out to one FIFO lane per chat. A lane handles its chat's messages one at a
/// time in arrival order; a shared semaphore caps how many lanes run a pipeline at once.
#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<Shared>,
}

impl Dispatcher {
    pub fn new(agent: Arc<RelayAgent>, config: DispatchConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                agent,
                lanes: Mutex::new(HashMap::new()),
                permits: Semaphore::new(config.max_concurrent_pipelines.max(1)),
                config,
            }),
        }
    }

    pub fn agent(&self) -> &Arc<RelayAgent> {
        &self.shared.agent
    }

    /// Queues the event on its chat's lane without waiting, so one busy chat never holds up
    /// the ingress loop. A full lane hands the event back.
    pub async fn dispatch(
        &self,
        event: InboundEvent,
        channel: Arc<dyn ChatChannel>
    ) -> Result<(), DispatchError> {
        let mut envelope = Envelope { event, received_at: Utc::now(), channel };
        loop {
            let chat_id = envelope.event.from.clone();
            let lane = {
                let mut lanes = self.shared.lanes.lock().await;
                match lanes.get(&chat_id) {
                    Some(lane) => lane.clone(),
                    None => open_lane(&self.shared, &mut lanes, &chat_id),
                }
            };
            match lane.try_send(envelope) {
                Ok(()) => return Ok(()),
                Err(mpsc::error::TrySendError::Full(returned)) => {
                    warn!("Lane for {} is full, rejecting message {:?}", chat_id, returned.event.id);
                    return Err(DispatchError::LaneFull {
                        chat_id,
                        event: Box::new(returned.event),
                    });
                }
                Err(mpsc::error::TrySendError::Closed(returned)) => {
                    // The worker retired between lookup and send.
                    let mut lanes = self.shared.lanes.lock().await;
                    if lanes.get(&chat_id).is_some_and(|l| l.same_channel(&lane)) {
                        lanes.remove(&chat_id);
                    }
                    envelope = returned;
                }
            }
        }
    }

    /// Number of chats that currently have a live lane worker.
    pub async fn active_lanes(&self) -> usize {
        self.shared.lanes.lock().await.len()
    }
}

/// Caller holds the lane map lock.
fn open_lane(
    shared: &Arc<Shared>,
    lanes: &mut HashMap<String, mpsc::Sender<Envelope>>,
    chat_id: &str
) -> mpsc::Sender<Envelope> {
    let (tx, rx) = mpsc::channel(shared.config.lane_capacity.max(1));
    lanes.insert(chat_id.to_string(), tx.clone());
    debug!("Opened lane for {}", chat_id);

    let worker = LaneWorker {
        chat_id: chat_id.to_string(),
        shared: Arc::clone(shared),
    };
    tokio::spawn(worker.run(rx));
    tx
}

struct LaneWorker {
    chat_id: String,
    shared: Arc<Shared>,
}

impl LaneWorker {
    async fn run(self, mut rx: mpsc::Receiver<Envelope>) {
        loop {
            match timeout(self.shared.config.lane_idle, rx.recv()).await {
                Ok(Some(envelope)) => self.handle(envelope).await,
                Ok(None) => break,
                Err(_) => {
                    self.retire(&mut rx).await;
                    break;
                }
            }
        }
        debug!("Lane for {} retired", self.chat_id);
    }

    /// Anything that slipped into the queue after the idle timeout moves, in order,
    /// to a fresh lane before the map lock is released.
    async fn retire(&self, rx: &mut mpsc::Receiver<Envelope>) {
        let mut lanes = self.shared.lanes.lock().await;
        rx.close();
        lanes.remove(&self.chat_id);

        let mut leftovers = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            leftovers.push(envelope);
        }
        if leftovers.is_empty() {
            return;
        }

        let lane = open_lane(&self.shared, &mut lanes, &self.chat_id);
        for envelope in leftovers {
            if let Err(e) = lane.try_send(envelope) {
                error!("Lost queued message for {} while retiring lane: {}", self.chat_id, e);
            }
        }
    }

    async fn handle(&self, envelope: Envelope) {
        let _permit = match self.shared.permits.acquire().await {
            Ok(p) => p,
            Err(e) => {
                error!("Pipeline pool closed, dropping message from {}: {}", self.chat_id, e);
                return;
            }
        };

        let Envelope { event, received_at, channel } = envelope;
        let agent = Arc::clone(&self.shared.agent);
        let pipeline = tokio::spawn(async move {
            agent.process_message_at(&event, received_at, channel.as_ref()).await
        });

        match pipeline.await {
            Ok(Outcome::Completed { persisted, .. }) => {
                info!("Completed exchange for {} (persisted: {})", self.chat_id, persisted);
            }
            Ok(Outcome::Dropped(reason)) => {
                debug!("Dropped message from {}: {:?}", self.chat_id, reason);
            }
            Err(e) => {
                error!("Pipeline for {} aborted: {}", self.chat_id, e);
            }
        }
    }
}
