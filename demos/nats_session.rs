// NATS Session Example: stream mock-device media over a real transport
//
// Publishes media chunks to `live.<session>.media` and consumes server
// events from `live.<session>.server`. A peer service (or a second terminal
// with the nats CLI) plays the remote side:
//
//   nats pub live.demo.server '{"session_id":"demo","timestamp":"2026-01-01T00:00:00Z","type":"ready"}'
//   nats sub 'live.demo.media'
//
// Prerequisites:
// - NATS server running: docker run -p 4222:4222 nats
//
// Usage: cargo run --example nats_session

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::info;
use visavis::{
    event_callback, LiveSession, MockDevices, NatsChannel, SessionCallbacks, SessionConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = SessionConfig {
        session_id: "demo".to_string(),
        ..SessionConfig::default()
    };

    // Mock tracks stand in for camera/microphone hardware; swap in a real
    // MediaDevices implementation to capture from the platform.
    let devices = Arc::new(MockDevices::new());
    let channel = Arc::new(NatsChannel::new("nats://localhost:4222", "demo"));

    let callbacks = SessionCallbacks::new(|text| {
        info!("remote: {}", text);
    })
    .with_event(event_callback(|event| {
        info!("session event: {:?}", event);
    }));

    let session = LiveSession::new(config, devices.clone(), channel, callbacks);

    session.start().await?;
    info!("Session started; waiting for the server to report ready");

    // Feed synthetic microphone audio while the session runs
    for _ in 0..120 {
        if let Some(feed) = devices.audio_feed() {
            let _ = feed.send(vec![4000i16; 1024]).await;
        }
        sleep(Duration::from_millis(250)).await;
    }

    let stats = session.stop().await;
    info!(
        "stopped: {} audio frames, {} video frames sent",
        stats.audio_frames_sent, stats.video_frames_sent
    );

    Ok(())
}
