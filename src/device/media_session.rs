use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, Mutex};
use tracing::info;

use super::{AudioTrack, DeviceError, Facing, VideoImage, VideoTrack};

/// The live unit of capture: one video track and one audio track under a
/// single logical handle.
///
/// Owned exclusively by the session controller. The handle's identity (its
/// `id`) stays stable across video track substitution, so anything bound to
/// the session survives a camera switch.
pub struct MediaSession {
    id: String,
    video: Mutex<Box<dyn VideoTrack>>,
    audio: Mutex<Box<dyn AudioTrack>>,
    released: AtomicBool,
}

impl MediaSession {
    pub(crate) fn new(video: Box<dyn VideoTrack>, audio: Box<dyn AudioTrack>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            video: Mutex::new(video),
            audio: Mutex::new(audio),
            released: AtomicBool::new(false),
        }
    }

    /// Stable identifier of the combined handle.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Facing side of the currently attached video track.
    pub async fn video_facing(&self) -> Facing {
        self.video.lock().await.facing()
    }

    pub(crate) async fn capture_frame(&self) -> Result<VideoImage, DeviceError> {
        self.video.lock().await.capture_frame().await
    }

    pub(crate) async fn take_audio_samples(&self) -> Option<mpsc::Receiver<Vec<i16>>> {
        self.audio.lock().await.take_samples()
    }

    /// Swaps the video track in place: stops and detaches the old track, then
    /// attaches the new one. The handle identity is unchanged.
    pub(crate) async fn replace_video(&self, new_track: Box<dyn VideoTrack>) {
        let mut video = self.video.lock().await;
        video.stop().await;
        *video = new_track;
    }

    /// Releases both hardware tracks. Idempotent; each track is stopped
    /// exactly once.
    pub(crate) async fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        self.video.lock().await.stop().await;
        self.audio.lock().await.stop().await;
        info!("Released media session {}", self.id);
    }
}
