use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::channel::{ChannelEvent, RemoteChannel};
use crate::config::SessionConfig;
use crate::device::{Facing, MediaDevices, MediaSession};
use crate::error::SessionError;
use crate::event::{SessionCallbacks, SessionEvent};
use crate::media::{run_audio_pipeline, run_video_sampler};
use crate::session::{ConnectionState, LifecycleEvent, SessionShared, SessionStats};

/// The session controller: owns the media tracks, the channel handshake, and
/// the producer tasks, and exposes the lifecycle to the host UI.
///
/// # Example
///
/// ```rust,ignore
/// let session = LiveSession::new(
///     SessionConfig::default(),
///     Arc::new(devices),
///     Arc::new(channel),
///     SessionCallbacks::new(|text| println!("remote: {text}")),
/// );
///
/// session.start().await?;
/// // ... media flows once the channel reports ready ...
/// session.switch_camera().await?;
/// let stats = session.stop().await;
/// ```
pub struct LiveSession {
    runtime: Arc<SessionRuntime>,
}

impl LiveSession {
    /// Creates an idle session over the given device layer and channel.
    pub fn new(
        config: SessionConfig,
        devices: Arc<dyn MediaDevices>,
        channel: Arc<dyn RemoteChannel>,
        callbacks: SessionCallbacks,
    ) -> Self {
        let shared = Arc::new(SessionShared::new(config.initial_facing));
        Self {
            runtime: Arc::new(SessionRuntime {
                config,
                devices,
                channel,
                callbacks,
                shared,
                media: Mutex::new(None),
                tasks: TaskSlots::new(),
                channel_epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Starts the session: acquires tracks, opens the channel, and moves to
    /// connecting. Valid only from idle; a start while live logs a warning
    /// and returns without effect.
    pub async fn start(&self) -> Result<(), SessionError> {
        self.runtime.start().await
    }

    /// Stops the session, tearing down producers, channel, and tracks in
    /// that order, and returns the final stats.
    pub async fn stop(&self) -> SessionStats {
        self.runtime.stop().await
    }

    /// Toggles the active camera in place. Non-fatal on failure: the
    /// previous camera keeps running.
    pub async fn switch_camera(&self) -> Result<(), SessionError> {
        self.runtime.switch_camera().await
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.runtime.shared.state()
    }

    /// Whether a camera switch is in flight.
    pub fn is_switching(&self) -> bool {
        self.runtime.shared.is_switching()
    }

    /// Whether the remote party is currently emitting synthesized speech.
    pub fn is_remote_speaking(&self) -> bool {
        self.runtime.shared.is_remote_speaking()
    }

    /// Local microphone level, 0-100.
    pub fn audio_level(&self) -> u8 {
        self.runtime.shared.audio_level()
    }

    /// Remote playback level, 0-100.
    pub fn output_level(&self) -> u8 {
        self.runtime.shared.output_level()
    }

    /// The level a host UI meter shows: remote playback while the remote
    /// party speaks, the local microphone otherwise.
    pub fn display_level(&self) -> u8 {
        if self.is_remote_speaking() {
            self.output_level()
        } else {
            self.audio_level()
        }
    }

    /// Whether sampled video is horizontally flipped before encoding.
    pub fn is_mirrored(&self) -> bool {
        self.runtime.shared.is_mirrored()
    }

    /// Overrides the mirror flag, independent of the facing convention.
    pub fn set_mirrored(&self, mirrored: bool) {
        self.runtime.shared.set_mirrored(mirrored);
    }

    /// Flips the mirror flag; returns the new value.
    pub fn toggle_mirror(&self) -> bool {
        let mirrored = !self.is_mirrored();
        self.set_mirrored(mirrored);
        mirrored
    }

    /// The active facing side.
    pub fn facing(&self) -> Facing {
        self.runtime.shared.facing()
    }

    /// Whether the audio pipeline is attached and emitting.
    pub fn audio_enabled(&self) -> bool {
        self.runtime.shared.audio_active()
    }

    /// Session identifier from the configuration.
    pub fn session_id(&self) -> &str {
        &self.runtime.config.session_id
    }

    /// Snapshot of the current session statistics.
    pub fn stats(&self) -> SessionStats {
        self.runtime.stats()
    }
}

struct TaskSlots {
    video: Mutex<Option<JoinHandle<()>>>,
    audio: Mutex<Option<JoinHandle<()>>>,
    channel: Mutex<Option<JoinHandle<()>>>,
}

impl TaskSlots {
    fn new() -> Self {
        Self {
            video: Mutex::new(None),
            audio: Mutex::new(None),
            channel: Mutex::new(None),
        }
    }
}

async fn abort_and_join(slot: &Mutex<Option<JoinHandle<()>>>) {
    if let Some(handle) = slot.lock().await.take() {
        handle.abort();
        let _ = handle.await;
    }
}

struct SessionRuntime {
    config: SessionConfig,
    devices: Arc<dyn MediaDevices>,
    channel: Arc<dyn RemoteChannel>,
    callbacks: SessionCallbacks,
    shared: Arc<SessionShared>,
    media: Mutex<Option<Arc<MediaSession>>>,
    tasks: TaskSlots,
    /// Generation counter for the inbound event task; a stale task's fatal
    /// path is ignored after a reconnect or stop superseded it.
    channel_epoch: AtomicU64,
}

/// Clears the switching indicator on every exit path.
struct SwitchingGuard {
    shared: Arc<SessionShared>,
    callbacks: SessionCallbacks,
}

impl Drop for SwitchingGuard {
    fn drop(&mut self) {
        self.shared.set_switching(false);
        self.callbacks.emit(SessionEvent::SwitchingChanged(false));
    }
}

impl SessionRuntime {
    async fn start(self: &Arc<Self>) -> Result<(), SessionError> {
        if self.shared.state() != ConnectionState::Idle {
            warn!("Session start requested while already live");
            return Ok(());
        }

        info!("Starting live session: {}", self.config.session_id);

        let facing = self.config.initial_facing;

        // Independent grants: an audio denial must not mask a video grant,
        // and vice versa.
        let video = self.devices.acquire_video(facing).await;
        let audio = self
            .devices
            .acquire_audio(self.config.audio_constraints())
            .await;

        let (video, audio) = match (video, audio) {
            (Ok(video), Ok(audio)) => (video, audio),
            (Ok(mut video), Err(e)) => {
                video.stop().await;
                return Err(SessionError::device(e.to_string()));
            }
            (Err(e), Ok(mut audio)) => {
                audio.stop().await;
                return Err(SessionError::device(e.to_string()));
            }
            (Err(e), Err(_)) => return Err(SessionError::device(e.to_string())),
        };

        let media = Arc::new(MediaSession::new(video, audio));
        info!("Acquired media session {} ({:?} camera)", media.id(), facing);

        self.shared.begin(facing);
        *self.media.lock().await = Some(media);

        self.transition(LifecycleEvent::StartRequested);

        match self.channel.connect().await {
            Ok(events) => {
                self.spawn_channel_task(events).await;
                Ok(())
            }
            Err(e) => {
                error!("Channel handshake failed: {}", e);
                self.release_media().await;
                self.transition(LifecycleEvent::ChannelFailed);
                self.shared.reset_idle();
                Err(SessionError::channel(e.to_string()))
            }
        }
    }

    async fn stop(self: &Arc<Self>) -> SessionStats {
        if self.shutdown(LifecycleEvent::StopRequested, false).await {
            info!("Live session stopped");
        } else {
            warn!("Session stop requested while idle");
        }
        self.stats()
    }

    async fn switch_camera(self: &Arc<Self>) -> Result<(), SessionError> {
        let media = self.media.lock().await.clone();
        let Some(media) = media else {
            warn!("Camera switch requested with no live session");
            return Ok(());
        };

        self.shared.set_switching(true);
        self.callbacks.emit(SessionEvent::SwitchingChanged(true));
        let _guard = SwitchingGuard {
            shared: Arc::clone(&self.shared),
            callbacks: self.callbacks.clone(),
        };

        // The facing side flips first; the mirror convention follows it.
        let new_facing = self.shared.facing().flipped();
        self.shared.set_facing(new_facing);
        self.shared.set_mirrored(new_facing.default_mirror());
        info!("Switching camera to {:?}", new_facing);

        match self.devices.acquire_video(new_facing).await {
            Ok(new_track) => {
                // The old track kept running until this point; the combined
                // handle's identity is preserved across the swap.
                media.replace_video(new_track).await;
                info!("Camera switched to {:?}", new_facing);
                Ok(())
            }
            Err(e) => {
                warn!("Camera switch failed, keeping previous track: {}", e);

                // A stalled handshake is the most likely silent failure to
                // surface alongside a camera error; reissue it, but only if
                // the channel never became ready.
                if self.shared.state() != ConnectionState::Connected {
                    info!("Reissuing channel handshake after camera failure");
                    // The stale event task goes first, so it cannot mistake
                    // its replaced stream for a mid-stream disconnect.
                    abort_and_join(&self.tasks.channel).await;
                    match self.channel.connect().await {
                        Ok(events) => self.spawn_channel_task(events).await,
                        Err(ce) => warn!("Channel handshake reissue failed: {}", ce),
                    }
                }

                Err(SessionError::camera_switch(e.to_string()))
            }
        }
    }

    /// Applies a lifecycle event; on transition, logs and notifies the host.
    fn transition(&self, event: LifecycleEvent) -> Option<ConnectionState> {
        let next = self.shared.apply(event)?;
        info!("Session state -> {:?}", next);
        self.callbacks.emit(SessionEvent::StateChanged(next));
        Some(next)
    }

    async fn spawn_channel_task(self: &Arc<Self>, mut events: mpsc::Receiver<ChannelEvent>) {
        let epoch = self.channel_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let runtime = Arc::clone(self);

        let handle = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    ChannelEvent::Ready => {
                        if runtime.transition(LifecycleEvent::ChannelReady).is_some() {
                            runtime.on_channel_ready().await;
                        }
                    }
                    ChannelEvent::Text(text) => {
                        (runtime.callbacks.on_transcription)(text);
                    }
                    ChannelEvent::SpeakingChange(active) => {
                        runtime.shared.set_speaking(active);
                        runtime.callbacks.emit(SessionEvent::RemoteSpeaking(active));
                    }
                    ChannelEvent::OutputLevel(level) => {
                        runtime.shared.set_output_level(level);
                    }
                    ChannelEvent::Closed { reason } => {
                        runtime.channel_failed(epoch, reason).await;
                        return;
                    }
                }
            }
            // The transport dropped the stream without a close event.
            runtime
                .channel_failed(epoch, "channel event stream ended".to_string())
                .await;
        });

        *self.tasks.channel.lock().await = Some(handle);
    }

    /// Starts the producers once the ready handshake completes.
    async fn on_channel_ready(self: &Arc<Self>) {
        let media = self.media.lock().await.clone();
        let Some(media) = media else {
            // Stopped between the ready event and here; nothing to start.
            return;
        };

        // The cadence task exists only while "streaming requested" and
        // "channel ready" both hold; teardown aborts it the moment either
        // stops holding.
        let sampler = tokio::spawn(run_video_sampler(
            self.config.video_frame_interval,
            self.config.jpeg_quality,
            Arc::clone(&media),
            Arc::clone(&self.shared),
            Arc::clone(&self.channel),
        ));
        if let Some(old) = self.tasks.video.lock().await.replace(sampler) {
            old.abort();
        }

        self.setup_audio(&media).await;
    }

    /// Attaches the audio pipeline. Idempotent; a failure disables audio
    /// emission without touching the rest of the session.
    async fn setup_audio(self: &Arc<Self>, media: &Arc<MediaSession>) {
        if !self.shared.try_begin_audio_setup() {
            return;
        }

        match media.take_audio_samples().await {
            Some(samples_rx) => {
                let pipeline = tokio::spawn(run_audio_pipeline(
                    samples_rx,
                    self.config.audio_buffer_size,
                    Arc::clone(&self.shared),
                    Arc::clone(&self.channel),
                ));
                *self.tasks.audio.lock().await = Some(pipeline);
                self.shared.finish_audio_setup(true);
            }
            None => {
                self.shared.finish_audio_setup(false);
                let err = SessionError::AudioSetup {
                    reason: "audio sample stream unavailable".to_string(),
                };
                warn!("{}; continuing without audio", err);
                self.callbacks.emit(SessionEvent::AudioDisabled {
                    reason: err.to_string(),
                });
            }
        }
    }

    /// Fatal-channel path, entered only by the inbound event task.
    async fn channel_failed(self: &Arc<Self>, epoch: u64, reason: String) {
        // A reconnect or stop superseded this event task.
        if self.channel_epoch.load(Ordering::SeqCst) != epoch {
            return;
        }

        if self.shutdown(LifecycleEvent::ChannelFailed, true).await {
            error!("Channel failed: {}", reason);
            self.callbacks.emit(SessionEvent::ConnectionFailed { reason });
        }
    }

    /// Tears the session down. Returns false if it was already idle.
    ///
    /// Order matters: the cadence task and audio pipeline stop producing
    /// before the channel closes, and the channel closes before the hardware
    /// tracks are released.
    async fn shutdown(self: &Arc<Self>, event: LifecycleEvent, from_channel_task: bool) -> bool {
        if self.transition(event).is_none() {
            return false;
        }

        // Invalidate any in-flight event task before tearing down.
        self.channel_epoch.fetch_add(1, Ordering::SeqCst);

        abort_and_join(&self.tasks.video).await;
        abort_and_join(&self.tasks.audio).await;

        if let Err(e) = self.channel.disconnect().await {
            warn!("Channel disconnect failed: {}", e);
        }
        if from_channel_task {
            // This is the event task itself; it exits after teardown instead
            // of aborting its own handle.
            self.tasks.channel.lock().await.take();
        } else {
            abort_and_join(&self.tasks.channel).await;
        }

        self.release_media().await;
        self.shared.reset_idle();
        true
    }

    async fn release_media(&self) {
        if let Some(media) = self.media.lock().await.take() {
            media.release().await;
        }
    }

    fn stats(&self) -> SessionStats {
        let started_at = self.shared.started_at();
        let duration_secs = started_at
            .map(|t| Utc::now().signed_duration_since(t).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0);

        SessionStats {
            state: self.shared.state(),
            switching: self.shared.is_switching(),
            started_at,
            duration_secs,
            audio_frames_sent: self.shared.audio_frames_sent(),
            video_frames_sent: self.shared.video_frames_sent(),
            frames_suppressed: self.shared.frames_suppressed(),
        }
    }
}
