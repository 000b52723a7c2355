use serde::{Deserialize, Serialize};

/// Media chunk message published to the transport
#[derive(Debug, Serialize, Deserialize)]
pub struct MediaChunkMessage {
    pub session_id: String,
    pub sequence: u32,
    /// Base64-encoded payload (PCM bytes or JPEG)
    pub data: String,
    pub mime_type: String,
    /// RFC3339 timestamp
    pub timestamp: String,
}

/// Event payload received from the remote service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Handshake complete, media may flow
    Ready,
    /// Finalized text reply
    Text { text: String },
    /// Synthesized-speech activity changed
    Speaking { active: bool },
    /// Remote playback level, 0-100
    OutputLevel { level: u8 },
}

/// Envelope for server events, filtered by session id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerEventMessage {
    pub session_id: String,
    pub timestamp: String,
    #[serde(flatten)]
    pub event: ServerEvent,
}
