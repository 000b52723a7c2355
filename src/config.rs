use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::device::Facing;

/// Configuration for a live session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier (e.g., "live-2026-08-07-demo")
    pub session_id: String,

    /// Sample rate for audio capture and processing
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono)
    pub channels: u16,

    /// Samples accumulated before an audio frame is emitted
    /// Default: 4096 (~256ms at 16kHz)
    pub audio_buffer_size: usize,

    /// Interval between video frame samples
    /// Default: 1000ms
    pub video_frame_interval: Duration,

    /// JPEG quality for sampled video frames (0-100)
    pub jpeg_quality: u8,

    /// Which camera the session opens with
    pub initial_facing: Facing,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("live-{}", uuid::Uuid::new_v4()),
            sample_rate: 16000,      // Remote service expects 16kHz
            channels: 1,             // Mono
            audio_buffer_size: 4096, // ~256ms buffers
            video_frame_interval: Duration::from_millis(1000),
            jpeg_quality: 80,
            initial_facing: Facing::User,
        }
    }
}

impl SessionConfig {
    /// Audio constraints derived from this configuration.
    pub fn audio_constraints(&self) -> AudioConstraints {
        AudioConstraints {
            sample_rate: self.sample_rate,
            channels: self.channels,
            echo_cancellation: true,
            auto_gain_control: true,
            noise_suppression: true,
        }
    }
}

/// Constraints passed to the device layer when requesting an audio track.
///
/// The device layer applies these as-is; no further negotiation occurs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AudioConstraints {
    pub sample_rate: u32,
    pub channels: u16,
    pub echo_cancellation: bool,
    pub auto_gain_control: bool,
    pub noise_suppression: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::default();
        assert_eq!(config.sample_rate, 16000);
        assert_eq!(config.channels, 1);
        assert_eq!(config.audio_buffer_size, 4096);
        assert_eq!(config.video_frame_interval, Duration::from_millis(1000));
        assert_eq!(config.jpeg_quality, 80);
        assert_eq!(config.initial_facing, Facing::User);
    }

    #[test]
    fn test_audio_constraints_from_config() {
        let constraints = SessionConfig::default().audio_constraints();
        assert_eq!(constraints.sample_rate, 16000);
        assert_eq!(constraints.channels, 1);
        assert!(constraints.echo_cancellation);
        assert!(constraints.auto_gain_control);
        assert!(constraints.noise_suppression);
    }
}
