//! Lifecycle state machine and the shared session state.
//!
//! Transitions go through [`transition`], a pure function of
//! (state, event) -> next state. [`SessionShared`] is the single home for
//! everything the producer tasks and inbound event task both touch; each
//! field is updated atomically so interleaved tasks never observe a torn
//! value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Mutex;

use crate::device::Facing;

/// Lifecycle state of a session, as the host UI sees it.
///
/// A camera switch is a busy flag nested under `Connected`, not a state of
/// its own: the channel never observes it and frames keep flowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No live session.
    Idle,
    /// Tracks are acquired and the handshake is in flight. There is no
    /// timeout; this state persists until ready, stop, or failure.
    Connecting,
    /// The ready handshake completed; media flows.
    Connected,
}

/// Events that drive lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LifecycleEvent {
    StartRequested,
    ChannelReady,
    StopRequested,
    ChannelFailed,
}

/// The transition table. Returns `None` for events that do not apply in the
/// current state.
pub(crate) fn transition(
    state: ConnectionState,
    event: LifecycleEvent,
) -> Option<ConnectionState> {
    use ConnectionState::*;
    use LifecycleEvent::*;

    match (state, event) {
        (Idle, StartRequested) => Some(Connecting),
        (Connecting, ChannelReady) => Some(Connected),
        (Connecting | Connected, StopRequested) => Some(Idle),
        (Connecting | Connected, ChannelFailed) => Some(Idle),
        _ => None,
    }
}

/// State shared between the controller, the inbound event task, and the
/// producer tasks.
pub(crate) struct SessionShared {
    state: Mutex<ConnectionState>,
    switching: AtomicBool,
    speaking: AtomicBool,
    audio_level: AtomicU8,
    output_level: AtomicU8,
    mirrored: AtomicBool,
    facing: Mutex<Facing>,
    audio_active: AtomicBool,
    audio_setup_pending: AtomicBool,
    audio_frames_sent: AtomicU64,
    video_frames_sent: AtomicU64,
    frames_suppressed: AtomicU64,
    started_at: Mutex<Option<DateTime<Utc>>>,
}

impl SessionShared {
    pub(crate) fn new(facing: Facing) -> Self {
        Self {
            state: Mutex::new(ConnectionState::Idle),
            switching: AtomicBool::new(false),
            speaking: AtomicBool::new(false),
            audio_level: AtomicU8::new(0),
            output_level: AtomicU8::new(0),
            mirrored: AtomicBool::new(facing.default_mirror()),
            facing: Mutex::new(facing),
            audio_active: AtomicBool::new(false),
            audio_setup_pending: AtomicBool::new(false),
            audio_frames_sent: AtomicU64::new(0),
            video_frames_sent: AtomicU64::new(0),
            frames_suppressed: AtomicU64::new(0),
            started_at: Mutex::new(None),
        }
    }

    /// Applies a lifecycle event; returns the new state if it transitioned.
    ///
    /// This is the single writer of the state field: whichever caller gets
    /// the transition owns the side effects that follow it.
    pub(crate) fn apply(&self, event: LifecycleEvent) -> Option<ConnectionState> {
        let mut state = self.state.lock().unwrap();
        let next = transition(*state, event)?;
        *state = next;
        Some(next)
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap()
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Resets per-session state at the start of a new session.
    pub(crate) fn begin(&self, facing: Facing) {
        *self.facing.lock().unwrap() = facing;
        self.mirrored.store(facing.default_mirror(), Ordering::SeqCst);
        self.audio_frames_sent.store(0, Ordering::SeqCst);
        self.video_frames_sent.store(0, Ordering::SeqCst);
        self.frames_suppressed.store(0, Ordering::SeqCst);
        *self.started_at.lock().unwrap() = Some(Utc::now());
    }

    /// Clears transient state after a session ends. Frame counters and the
    /// start timestamp survive so post-session stats stay meaningful.
    pub(crate) fn reset_idle(&self) {
        self.switching.store(false, Ordering::SeqCst);
        self.speaking.store(false, Ordering::SeqCst);
        self.audio_level.store(0, Ordering::SeqCst);
        self.output_level.store(0, Ordering::SeqCst);
        self.audio_active.store(false, Ordering::SeqCst);
        self.audio_setup_pending.store(false, Ordering::SeqCst);
    }

    pub(crate) fn set_switching(&self, on: bool) {
        self.switching.store(on, Ordering::SeqCst);
    }

    pub(crate) fn is_switching(&self) -> bool {
        self.switching.load(Ordering::SeqCst)
    }

    pub(crate) fn set_speaking(&self, active: bool) {
        self.speaking.store(active, Ordering::SeqCst);
    }

    pub(crate) fn is_remote_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    pub(crate) fn set_audio_level(&self, level: u8) {
        self.audio_level.store(level.min(100), Ordering::SeqCst);
    }

    pub(crate) fn audio_level(&self) -> u8 {
        self.audio_level.load(Ordering::SeqCst)
    }

    pub(crate) fn set_output_level(&self, level: u8) {
        self.output_level.store(level.min(100), Ordering::SeqCst);
    }

    pub(crate) fn output_level(&self) -> u8 {
        self.output_level.load(Ordering::SeqCst)
    }

    pub(crate) fn set_mirrored(&self, mirrored: bool) {
        self.mirrored.store(mirrored, Ordering::SeqCst);
    }

    pub(crate) fn is_mirrored(&self) -> bool {
        self.mirrored.load(Ordering::SeqCst)
    }

    pub(crate) fn set_facing(&self, facing: Facing) {
        *self.facing.lock().unwrap() = facing;
    }

    pub(crate) fn facing(&self) -> Facing {
        *self.facing.lock().unwrap()
    }

    /// Claims the audio setup slot. Returns false if setup already ran or is
    /// in flight.
    pub(crate) fn try_begin_audio_setup(&self) -> bool {
        if self.audio_active.load(Ordering::SeqCst) {
            return false;
        }
        !self.audio_setup_pending.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn finish_audio_setup(&self, attached: bool) {
        self.audio_active.store(attached, Ordering::SeqCst);
        self.audio_setup_pending.store(false, Ordering::SeqCst);
    }

    pub(crate) fn audio_active(&self) -> bool {
        self.audio_active.load(Ordering::SeqCst)
    }

    pub(crate) fn note_audio_frame_sent(&self) {
        self.audio_frames_sent.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn note_video_frame_sent(&self) {
        self.video_frames_sent.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn note_frame_suppressed(&self) {
        self.frames_suppressed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn audio_frames_sent(&self) -> u64 {
        self.audio_frames_sent.load(Ordering::SeqCst)
    }

    pub(crate) fn video_frames_sent(&self) -> u64 {
        self.video_frames_sent.load(Ordering::SeqCst)
    }

    pub(crate) fn frames_suppressed(&self) -> u64 {
        self.frames_suppressed.load(Ordering::SeqCst)
    }

    pub(crate) fn started_at(&self) -> Option<DateTime<Utc>> {
        *self.started_at.lock().unwrap()
    }
}
