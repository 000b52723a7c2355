// Mock Session Example: full session lifecycle without hardware or network
//
// Drives a complete session against the mock device layer and mock channel:
// 1. start() acquires mock tracks and opens the channel
// 2. A scripted "server" replies ready, then speaks and sends text
// 3. Audio/video frames flow (and audio is suppressed while it speaks)
// 4. The camera is switched in place, then the session stops
//
// Usage: cargo run --example mock_session

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::info;
use visavis::{
    event_callback, ChannelEvent, LiveSession, MockChannel, MockDevices, SessionCallbacks,
    SessionConfig,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let devices = Arc::new(MockDevices::new());
    let channel = Arc::new(MockChannel::new());

    let callbacks = SessionCallbacks::new(|text| {
        info!("transcription: {}", text);
    })
    .with_event(event_callback(|event| {
        info!("session event: {:?}", event);
    }));

    let session = LiveSession::new(
        SessionConfig::default(),
        devices.clone(),
        channel.clone(),
        callbacks,
    );

    session.start().await?;

    // Scripted server: handshake completes, then a short exchange
    channel.push_event(ChannelEvent::Ready).await;
    sleep(Duration::from_millis(100)).await;

    // Microphone activity: two full buffers at half scale
    if let Some(feed) = devices.audio_feed() {
        feed.send(vec![i16::MAX / 2; 4096]).await?;
        feed.send(vec![i16::MAX / 2; 4096]).await?;
    }

    // The remote starts speaking; local audio backs off
    channel.push_event(ChannelEvent::SpeakingChange(true)).await;
    channel.push_event(ChannelEvent::OutputLevel(70)).await;
    if let Some(feed) = devices.audio_feed() {
        feed.send(vec![i16::MAX / 2; 4096]).await?;
    }
    channel
        .push_event(ChannelEvent::Text("I can see your camera feed.".to_string()))
        .await;
    channel.push_event(ChannelEvent::SpeakingChange(false)).await;

    // Let a couple of video cadence ticks pass
    sleep(Duration::from_millis(2100)).await;

    info!("display level: {}", session.display_level());
    session.switch_camera().await?;
    info!(
        "facing: {:?}, mirrored: {}",
        session.facing(),
        session.is_mirrored()
    );

    sleep(Duration::from_millis(1100)).await;

    let stats = session.stop().await;
    info!(
        "stopped after {:.1}s: {} audio frames, {} video frames, {} suppressed",
        stats.duration_secs,
        stats.audio_frames_sent,
        stats.video_frames_sent,
        stats.frames_suppressed
    );
    info!(
        "chunks recorded by the mock channel: {}",
        channel.sent_chunks().len()
    );

    Ok(())
}
