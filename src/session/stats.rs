use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ConnectionState;

/// Statistics about a live session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Current lifecycle state
    pub state: ConnectionState,

    /// Whether a camera switch is in flight
    pub switching: bool,

    /// When the session last started, if it ever did
    pub started_at: Option<DateTime<Utc>>,

    /// Seconds since the session started
    pub duration_secs: f64,

    /// Audio frames delivered to the channel
    pub audio_frames_sent: u64,

    /// Video frames delivered to the channel
    pub video_frames_sent: u64,

    /// Audio frames withheld while the remote party was speaking
    pub frames_suppressed: u64,
}
