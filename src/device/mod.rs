//! Device layer abstractions
//!
//! This module defines the seam between the session controller and the
//! platform's camera/microphone hardware:
//! - `MediaDevices` hands out live tracks for a facing side / constraint set
//! - `VideoTrack` / `AudioTrack` are the per-device handles
//! - `MediaSession` pairs one of each under a stable identity
//!
//! Video and audio are requested independently so an audio denial never masks
//! a video grant, and vice versa.

mod media_session;
mod mock;

pub use media_session::MediaSession;
pub use mock::MockDevices;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::config::AudioConstraints;

/// Which physical camera is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    /// Front camera, pointed at the user.
    User,
    /// Back camera, pointed away from the user.
    Environment,
}

impl Facing {
    /// The other side.
    pub fn flipped(self) -> Self {
        match self {
            Facing::User => Facing::Environment,
            Facing::Environment => Facing::User,
        }
    }

    /// Whether sampled video is mirrored for this side, by convention.
    pub fn default_mirror(self) -> bool {
        matches!(self, Facing::User)
    }
}

/// A raw video frame snapshot (RGB8, interleaved, row-major).
#[derive(Debug, Clone)]
pub struct VideoImage {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Pixel data, `width * height * 3` bytes
    pub pixels: Vec<u8>,
}

/// Errors reported by the device layer when a grant fails.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// The user or OS denied the capture permission.
    #[error("permission denied for {kind} capture")]
    PermissionDenied {
        /// "video" or "audio".
        kind: &'static str,
    },

    /// No hardware matches the request.
    #[error("no {kind} device matching the request")]
    NoDevice {
        /// "video" or "audio".
        kind: &'static str,
    },

    /// An error from the underlying platform backend.
    #[error("device backend error: {0}")]
    Backend(String),
}

/// Hands out live capture tracks.
///
/// Implementations wrap the platform media stack; [`MockDevices`] provides a
/// hardware-free implementation for tests and demos.
#[async_trait::async_trait]
pub trait MediaDevices: Send + Sync {
    /// Requests a camera track for the given facing side.
    ///
    /// Resolution is left to the device. Suspends until the platform grants
    /// or denies the request (permission prompt).
    async fn acquire_video(&self, facing: Facing) -> Result<Box<dyn VideoTrack>, DeviceError>;

    /// Requests a microphone track honoring the given constraints.
    async fn acquire_audio(
        &self,
        constraints: AudioConstraints,
    ) -> Result<Box<dyn AudioTrack>, DeviceError>;
}

/// A live camera track.
///
/// The handle owns a hardware resource; `stop()` releases it and is called
/// exactly once per track by the session controller.
#[async_trait::async_trait]
pub trait VideoTrack: Send + Sync {
    /// Which side this track was acquired for.
    fn facing(&self) -> Facing;

    /// Native resolution of the track.
    fn resolution(&self) -> (u32, u32);

    /// Snapshot of the current frame at the track's native resolution.
    async fn capture_frame(&self) -> Result<VideoImage, DeviceError>;

    /// Releases the hardware handle.
    async fn stop(&mut self);
}

/// A live microphone track.
#[async_trait::async_trait]
pub trait AudioTrack: Send + Sync {
    /// Takes the live sample stream.
    ///
    /// Yields batches of interleaved i16 PCM samples as the hardware delivers
    /// them. Returns `None` after the first call; there is one consumer.
    fn take_samples(&mut self) -> Option<mpsc::Receiver<Vec<i16>>>;

    /// Releases the hardware handle.
    async fn stop(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facing_flipped() {
        assert_eq!(Facing::User.flipped(), Facing::Environment);
        assert_eq!(Facing::Environment.flipped(), Facing::User);
    }

    #[test]
    fn test_facing_mirror_convention() {
        assert!(Facing::User.default_mirror());
        assert!(!Facing::Environment.default_mirror());
    }
}
