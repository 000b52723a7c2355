//! Host-facing session events.
//!
//! Events are notifications for the host UI (connection overlays, busy
//! spinners, error toasts). The session keeps running (or has already finished
//! its own teardown) by the time an event is delivered; nothing here requires
//! a response.

use std::sync::Arc;

use crate::session::ConnectionState;

/// Events emitted while a session runs.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The lifecycle state changed (idle / connecting / connected).
    ///
    /// A persistent `Connecting` with no follow-up is how a stalled handshake
    /// surfaces; there is no timeout.
    StateChanged(ConnectionState),

    /// A camera switch started or finished.
    SwitchingChanged(bool),

    /// The remote party started or stopped speaking.
    RemoteSpeaking(bool),

    /// Audio emission was disabled after a pipeline setup failure.
    ///
    /// Video is unaffected; the session stays live.
    AudioDisabled {
        /// Why the pipeline could not be set up.
        reason: String,
    },

    /// The session ended because the channel failed.
    ConnectionFailed {
        /// What the transport reported.
        reason: String,
    },
}

/// Callback type for receiving session events.
pub type EventCallback = Arc<dyn Fn(SessionEvent) + Send + Sync>;

/// Callback invoked with each finalized text reply from the remote service.
pub type TranscriptionCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure.
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(SessionEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Host callbacks wired into a session at construction.
#[derive(Clone)]
pub struct SessionCallbacks {
    /// Finalized remote text, one call per reply.
    pub on_transcription: TranscriptionCallback,
    /// Optional lifecycle/diagnostic events.
    pub on_event: Option<EventCallback>,
}

impl SessionCallbacks {
    /// Creates callbacks with just a transcription handler.
    pub fn new<F>(on_transcription: F) -> Self
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        Self {
            on_transcription: Arc::new(on_transcription),
            on_event: None,
        }
    }

    /// Attaches a session event handler.
    pub fn with_event(mut self, on_event: EventCallback) -> Self {
        self.on_event = Some(on_event);
        self
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        if let Some(cb) = &self.on_event {
            cb(event);
        }
    }
}
