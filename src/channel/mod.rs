//! Remote channel contract
//!
//! The session controller consumes a persistent bidirectional transport
//! through the [`RemoteChannel`] trait: outbound media chunks go through
//! `send_media_chunk`, inbound replies arrive as a [`ChannelEvent`] stream
//! returned by `connect()`.
//!
//! [`NatsChannel`] is a reference adapter over NATS subjects;
//! [`MockChannel`] records traffic for tests.

mod messages;
mod mock;
mod nats;

pub use messages::{MediaChunkMessage, ServerEvent, ServerEventMessage};
pub use mock::MockChannel;
pub use nats::NatsChannel;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Payload type of an outbound media chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaMime {
    /// 16-bit little-endian PCM audio.
    #[serde(rename = "audio/pcm")]
    AudioPcm,
    /// JPEG-compressed video frame.
    #[serde(rename = "image/jpeg")]
    ImageJpeg,
}

impl MediaMime {
    /// The wire mime-type string.
    pub fn as_str(self) -> &'static str {
        match self {
            MediaMime::AudioPcm => "audio/pcm",
            MediaMime::ImageJpeg => "image/jpeg",
        }
    }
}

/// One outbound media sample: base64 payload plus its mime type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaChunk {
    /// Base64-armored payload.
    pub data: String,
    /// Payload type.
    pub mime: MediaMime,
}

impl MediaChunk {
    /// An audio chunk (base64 PCM).
    pub fn audio(data: String) -> Self {
        Self {
            data,
            mime: MediaMime::AudioPcm,
        }
    }

    /// A video chunk (base64 JPEG).
    pub fn video(data: String) -> Self {
        Self {
            data,
            mime: MediaMime::ImageJpeg,
        }
    }
}

/// Inbound events from the remote service.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// The ready handshake completed; media may flow.
    Ready,
    /// A finalized text reply.
    Text(String),
    /// The remote party started or stopped emitting synthesized speech.
    SpeakingChange(bool),
    /// Remote playback level, 0-100.
    OutputLevel(u8),
    /// The transport closed; no further events will arrive.
    Closed {
        /// Why the transport closed.
        reason: String,
    },
}

/// A persistent bidirectional transport to the remote conversational service.
///
/// Implementations are external collaborators; the controller only requires
/// the three operations below. All methods take `&self` so the connected
/// channel can be shared between the producer tasks.
#[async_trait::async_trait]
pub trait RemoteChannel: Send + Sync {
    /// Opens the transport and returns the inbound event stream.
    ///
    /// The stream stays open until the transport closes; a dropped stream is
    /// treated as a mid-stream disconnect. Reconnecting through a second
    /// `connect()` call replaces the previous event stream.
    async fn connect(&self) -> Result<mpsc::Receiver<ChannelEvent>>;

    /// Sends one media chunk. Valid only after the ready handshake.
    async fn send_media_chunk(&self, chunk: MediaChunk) -> Result<()>;

    /// Closes the transport.
    async fn disconnect(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_strings() {
        assert_eq!(MediaMime::AudioPcm.as_str(), "audio/pcm");
        assert_eq!(MediaMime::ImageJpeg.as_str(), "image/jpeg");
    }

    #[test]
    fn test_chunk_constructors() {
        assert_eq!(MediaChunk::audio("aGk=".into()).mime, MediaMime::AudioPcm);
        assert_eq!(MediaChunk::video("aGk=".into()).mime, MediaMime::ImageJpeg);
    }
}
