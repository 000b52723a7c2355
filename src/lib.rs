//! visavis: client-side controller for live camera+microphone conversation
//! sessions. Captures device tracks, chunks them into base64 PCM/JPEG media
//! samples, and streams them over a bidirectional channel while consuming
//! transcribed text and speaking-state events coming back.

pub mod channel;
pub mod config;
pub mod device;
pub mod error;
pub mod event;
pub mod media;
pub mod session;

pub use channel::{
    ChannelEvent, MediaChunk, MediaMime, MockChannel, NatsChannel, RemoteChannel,
};
pub use config::{AudioConstraints, SessionConfig};
pub use device::{
    AudioTrack, DeviceError, Facing, MediaDevices, MediaSession, MockDevices, VideoImage,
    VideoTrack,
};
pub use error::SessionError;
pub use event::{
    event_callback, EventCallback, SessionCallbacks, SessionEvent, TranscriptionCallback,
};
pub use media::{AudioFrame, VideoFrame};
pub use session::{ConnectionState, LiveSession, SessionStats};
