//! Error types for visavis.
//!
//! Only two variants are fatal to a live session: [`SessionError::DeviceAccess`]
//! prevents a session from starting at all, and [`SessionError::Channel`]
//! returns a running session to idle. The other variants degrade or leave the
//! session running.

/// Errors surfaced by the session controller.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A device grant failed (permission denied or no matching hardware).
    ///
    /// Fatal to session start: the session stays idle and any track that did
    /// open is released before this is returned.
    #[error("device access failed: {reason}")]
    DeviceAccess {
        /// What the device layer reported.
        reason: String,
    },

    /// The audio pipeline could not be set up.
    ///
    /// Non-fatal: audio emission is disabled, video continues.
    #[error("audio pipeline setup failed: {reason}")]
    AudioSetup {
        /// Why setup failed.
        reason: String,
    },

    /// The remote channel failed to connect, or disconnected mid-stream.
    ///
    /// Fatal: the session returns to idle and all resources are released.
    #[error("channel error: {reason}")]
    Channel {
        /// What the transport reported.
        reason: String,
    },

    /// Acquiring a track for the other camera failed during a switch.
    ///
    /// Non-fatal: the previous camera keeps running.
    #[error("camera switch failed: {reason}")]
    CameraSwitch {
        /// Why the new track could not be acquired.
        reason: String,
    },
}

impl SessionError {
    pub(crate) fn device(reason: impl Into<String>) -> Self {
        Self::DeviceAccess {
            reason: reason.into(),
        }
    }

    pub(crate) fn channel(reason: impl Into<String>) -> Self {
        Self::Channel {
            reason: reason.into(),
        }
    }

    pub(crate) fn camera_switch(reason: impl Into<String>) -> Self {
        Self::CameraSwitch {
            reason: reason.into(),
        }
    }
}
