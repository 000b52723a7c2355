//! Live session management
//!
//! This module provides the `LiveSession` controller that owns:
//! - Track acquisition and the combined `MediaSession` handle
//! - The remote-channel handshake and inbound event handling
//! - The audio pipeline and video sampler producer tasks
//! - Camera switching and teardown ordering

mod controller;
mod state;
mod stats;

pub use controller::LiveSession;
pub use state::ConnectionState;
pub use stats::SessionStats;

pub(crate) use state::{LifecycleEvent, SessionShared};
