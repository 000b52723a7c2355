use anyhow::{Context, Result};
use futures::stream::StreamExt;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::messages::{MediaChunkMessage, ServerEvent, ServerEventMessage};
use super::{ChannelEvent, MediaChunk, RemoteChannel};

/// Reference [`RemoteChannel`] adapter over NATS.
///
/// Media chunks are published as JSON to `live.<session>.media`; server
/// events are consumed from `live.<session>.server` and filtered by session
/// id. Hosts with a different transport implement the trait themselves.
pub struct NatsChannel {
    url: String,
    session_id: String,
    client: Mutex<Option<async_nats::Client>>,
    forward_task: Mutex<Option<JoinHandle<()>>>,
    sequence: AtomicU32,
}

impl NatsChannel {
    /// Creates an unconnected channel for the given NATS url and session.
    pub fn new(url: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            session_id: session_id.into(),
            client: Mutex::new(None),
            forward_task: Mutex::new(None),
            sequence: AtomicU32::new(0),
        }
    }

    fn media_subject(&self) -> String {
        format!("live.{}.media", self.session_id)
    }

    fn server_subject(&self) -> String {
        format!("live.{}.server", self.session_id)
    }
}

fn map_event(event: ServerEvent) -> ChannelEvent {
    match event {
        ServerEvent::Ready => ChannelEvent::Ready,
        ServerEvent::Text { text } => ChannelEvent::Text(text),
        ServerEvent::Speaking { active } => ChannelEvent::SpeakingChange(active),
        ServerEvent::OutputLevel { level } => ChannelEvent::OutputLevel(level.min(100)),
    }
}

#[async_trait::async_trait]
impl RemoteChannel for NatsChannel {
    async fn connect(&self) -> Result<mpsc::Receiver<ChannelEvent>> {
        info!("Connecting to NATS at {}", self.url);

        let client = async_nats::connect(&self.url)
            .await
            .context("Failed to connect to NATS")?;

        let mut subscriber = client
            .subscribe(self.server_subject())
            .await
            .context("Failed to subscribe to server events")?;

        info!("Connected to NATS, subscribed to {}", self.server_subject());

        let (tx, rx) = mpsc::channel(32);
        let session_id = self.session_id.clone();

        let forward = tokio::spawn(async move {
            while let Some(msg) = subscriber.next().await {
                match serde_json::from_slice::<ServerEventMessage>(&msg.payload) {
                    Ok(event) => {
                        // Filter by session_id
                        if event.session_id != session_id {
                            continue;
                        }
                        if tx.send(map_event(event.event)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to parse server event: {}", e);
                    }
                }
            }
            let _ = tx
                .send(ChannelEvent::Closed {
                    reason: "server event stream ended".to_string(),
                })
                .await;
        });

        // Reconnect replaces the previous stream
        if let Some(old) = self.forward_task.lock().await.replace(forward) {
            old.abort();
        }
        *self.client.lock().await = Some(client);

        Ok(rx)
    }

    async fn send_media_chunk(&self, chunk: MediaChunk) -> Result<()> {
        let client = self.client.lock().await;
        let client = client.as_ref().context("NATS channel is not connected")?;

        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let message = MediaChunkMessage {
            session_id: self.session_id.clone(),
            sequence,
            data: chunk.data,
            mime_type: chunk.mime.as_str().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let payload = serde_json::to_vec(&message)?;

        client
            .publish(self.media_subject(), payload.into())
            .await
            .context("Failed to publish media chunk")?;

        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        info!("Closing NATS channel for session {}", self.session_id);

        if let Some(task) = self.forward_task.lock().await.take() {
            task.abort();
        }
        // async-nats handles cleanup on drop
        self.client.lock().await.take();

        Ok(())
    }
}
