//! Mock device layer for testing without hardware.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use super::{AudioTrack, DeviceError, Facing, MediaDevices, VideoImage, VideoTrack};
use crate::config::AudioConstraints;

/// A mock device layer that hands out synthetic tracks.
///
/// Tracks carry acquire/stop counters so tests can assert the no-leak
/// property (stops == acquires on every exit path), and the audio track's
/// sample stream is fed by the test through [`MockDevices::audio_feed`].
///
/// # Example
///
/// ```rust,ignore
/// let devices = Arc::new(MockDevices::new());
/// devices.deny_audio();
///
/// let err = session.start().await.unwrap_err();
/// assert_eq!(devices.open_tracks(), 0);
/// ```
pub struct MockDevices {
    video_acquired: AtomicUsize,
    audio_acquired: AtomicUsize,
    video_stopped: Arc<AtomicUsize>,
    audio_stopped: Arc<AtomicUsize>,
    deny_video: AtomicBool,
    deny_audio: AtomicBool,
    no_audio_stream: AtomicBool,
    audio_feed: Mutex<Option<mpsc::Sender<Vec<i16>>>>,
    resolution: (u32, u32),
}

impl MockDevices {
    /// Creates a mock device layer with a small fixed camera resolution.
    pub fn new() -> Self {
        Self {
            video_acquired: AtomicUsize::new(0),
            audio_acquired: AtomicUsize::new(0),
            video_stopped: Arc::new(AtomicUsize::new(0)),
            audio_stopped: Arc::new(AtomicUsize::new(0)),
            deny_video: AtomicBool::new(false),
            deny_audio: AtomicBool::new(false),
            no_audio_stream: AtomicBool::new(false),
            audio_feed: Mutex::new(None),
            resolution: (32, 16),
        }
    }

    /// Makes every subsequent video grant fail with a permission error.
    pub fn deny_video(&self) {
        self.deny_video.store(true, Ordering::SeqCst);
    }

    /// Makes every subsequent audio grant fail with a permission error.
    pub fn deny_audio(&self) {
        self.deny_audio.store(true, Ordering::SeqCst);
    }

    /// Re-allows grants after a deny.
    pub fn allow_all(&self) {
        self.deny_video.store(false, Ordering::SeqCst);
        self.deny_audio.store(false, Ordering::SeqCst);
    }

    /// Grants audio tracks whose sample stream is unavailable, simulating a
    /// processing-context failure after the permission succeeded.
    pub fn break_audio_stream(&self) {
        self.no_audio_stream.store(true, Ordering::SeqCst);
    }

    /// Number of video tracks handed out.
    pub fn video_acquired(&self) -> usize {
        self.video_acquired.load(Ordering::SeqCst)
    }

    /// Number of audio tracks handed out.
    pub fn audio_acquired(&self) -> usize {
        self.audio_acquired.load(Ordering::SeqCst)
    }

    /// Number of video tracks stopped.
    pub fn video_stopped(&self) -> usize {
        self.video_stopped.load(Ordering::SeqCst)
    }

    /// Number of audio tracks stopped.
    pub fn audio_stopped(&self) -> usize {
        self.audio_stopped.load(Ordering::SeqCst)
    }

    /// Tracks currently open (acquired and not yet stopped).
    pub fn open_tracks(&self) -> usize {
        let acquired = self.video_acquired() + self.audio_acquired();
        let stopped = self.video_stopped() + self.audio_stopped();
        acquired - stopped
    }

    /// Sender feeding the most recently acquired audio track, if any.
    ///
    /// Tests push sample batches through this to drive the audio pipeline.
    pub fn audio_feed(&self) -> Option<mpsc::Sender<Vec<i16>>> {
        self.audio_feed.lock().unwrap().clone()
    }
}

impl Default for MockDevices {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl MediaDevices for MockDevices {
    async fn acquire_video(&self, facing: Facing) -> Result<Box<dyn VideoTrack>, DeviceError> {
        if self.deny_video.load(Ordering::SeqCst) {
            return Err(DeviceError::PermissionDenied { kind: "video" });
        }
        self.video_acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockVideoTrack {
            facing,
            resolution: self.resolution,
            stops: Arc::clone(&self.video_stopped),
            stopped: false,
        }))
    }

    async fn acquire_audio(
        &self,
        _constraints: AudioConstraints,
    ) -> Result<Box<dyn AudioTrack>, DeviceError> {
        if self.deny_audio.load(Ordering::SeqCst) {
            return Err(DeviceError::PermissionDenied { kind: "audio" });
        }
        self.audio_acquired.fetch_add(1, Ordering::SeqCst);
        let samples = if self.no_audio_stream.load(Ordering::SeqCst) {
            None
        } else {
            let (tx, rx) = mpsc::channel(32);
            *self.audio_feed.lock().unwrap() = Some(tx);
            Some(rx)
        };
        Ok(Box::new(MockAudioTrack {
            samples,
            stops: Arc::clone(&self.audio_stopped),
            stopped: false,
        }))
    }
}

struct MockVideoTrack {
    facing: Facing,
    resolution: (u32, u32),
    stops: Arc<AtomicUsize>,
    stopped: bool,
}

#[async_trait::async_trait]
impl VideoTrack for MockVideoTrack {
    fn facing(&self) -> Facing {
        self.facing
    }

    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    async fn capture_frame(&self) -> Result<VideoImage, DeviceError> {
        let (width, height) = self.resolution;
        // Horizontal gradient, asymmetric so mirroring is observable
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for _y in 0..height {
            for x in 0..width {
                let v = (x * 255 / width.max(1)) as u8;
                pixels.extend_from_slice(&[v, v / 2, 0]);
            }
        }
        Ok(VideoImage {
            width,
            height,
            pixels,
        })
    }

    async fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }
}

struct MockAudioTrack {
    samples: Option<mpsc::Receiver<Vec<i16>>>,
    stops: Arc<AtomicUsize>,
    stopped: bool,
}

#[async_trait::async_trait]
impl AudioTrack for MockAudioTrack {
    fn take_samples(&mut self) -> Option<mpsc::Receiver<Vec<i16>>> {
        self.samples.take()
    }

    async fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }
}
