// Integration tests for the session lifecycle
//
// These tests drive a full session against the mock device layer and mock
// channel: start, ready handshake, frame cadence, stop, and the failure
// paths that must leave no track open.

use anyhow::Result;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::advance;
use visavis::{
    ChannelEvent, ConnectionState, LiveSession, MediaMime, MockChannel, MockDevices,
    SessionCallbacks, SessionConfig, SessionError, SessionEvent,
};

fn fixture() -> (LiveSession, Arc<MockDevices>, Arc<MockChannel>) {
    let devices = Arc::new(MockDevices::new());
    let channel = Arc::new(MockChannel::new());
    let session = LiveSession::new(
        SessionConfig {
            session_id: "test-session".to_string(),
            ..SessionConfig::default()
        },
        devices.clone(),
        channel.clone(),
        SessionCallbacks::new(|_| {}),
    );
    (session, devices, channel)
}

/// Lets the spawned controller tasks run without advancing the clock.
async fn settle() {
    for _ in 0..25 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_start_acquires_tracks_and_enters_connecting() -> Result<()> {
    let (session, devices, channel) = fixture();

    session.start().await?;

    assert_eq!(session.state(), ConnectionState::Connecting);
    assert_eq!(devices.video_acquired(), 1);
    assert_eq!(devices.audio_acquired(), 1);
    assert_eq!(channel.connect_count(), 1);
    assert!(session.is_mirrored(), "user-facing start mirrors by default");

    session.stop().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_ready_transitions_to_connected() -> Result<()> {
    let (session, _devices, channel) = fixture();

    session.start().await?;
    channel.push_event(ChannelEvent::Ready).await;
    settle().await;

    assert_eq!(session.state(), ConnectionState::Connected);

    session.stop().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_full_cycle_sends_one_frame_per_tick_then_releases() -> Result<()> {
    let (session, devices, channel) = fixture();

    session.start().await?;
    assert_eq!(session.state(), ConnectionState::Connecting);

    channel.push_event(ChannelEvent::Ready).await;
    settle().await;
    assert_eq!(session.state(), ConnectionState::Connected);
    assert_eq!(channel.sent_count(MediaMime::ImageJpeg), 0);

    // One cadence interval: exactly one video frame
    advance(Duration::from_millis(1000)).await;
    settle().await;
    assert_eq!(channel.sent_count(MediaMime::ImageJpeg), 1);

    let stats = session.stop().await;
    assert_eq!(stats.state, ConnectionState::Idle);
    assert_eq!(stats.video_frames_sent, 1);

    // Exactly two track stops: one video, one audio
    assert_eq!(devices.video_stopped(), 1);
    assert_eq!(devices.audio_stopped(), 1);
    assert_eq!(devices.open_tracks(), 0);
    assert_eq!(channel.disconnect_count(), 1);

    // Producers are gone: further time produces no frames
    advance(Duration::from_millis(3000)).await;
    settle().await;
    assert_eq!(channel.sent_count(MediaMime::ImageJpeg), 1);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_no_frames_before_ready() -> Result<()> {
    let (session, devices, channel) = fixture();

    session.start().await?;

    // Channel never reports ready; time passes, samples arrive
    advance(Duration::from_millis(3000)).await;
    settle().await;
    if let Some(feed) = devices.audio_feed() {
        let _ = feed.send(vec![500i16; 4096]).await;
    }
    settle().await;

    assert_eq!(session.state(), ConnectionState::Connecting);
    assert!(channel.sent_chunks().is_empty(), "nothing sent while un-ready");

    session.stop().await;
    assert_eq!(devices.open_tracks(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_double_start_is_a_noop() -> Result<()> {
    let (session, devices, channel) = fixture();

    session.start().await?;
    session.start().await?;

    assert_eq!(devices.video_acquired(), 1);
    assert_eq!(devices.audio_acquired(), 1);
    assert_eq!(channel.connect_count(), 1);

    session.stop().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_stop_while_idle_is_a_noop() {
    let (session, devices, channel) = fixture();

    let stats = session.stop().await;

    assert_eq!(stats.state, ConnectionState::Idle);
    assert_eq!(devices.video_acquired(), 0);
    assert_eq!(channel.disconnect_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_audio_grant_denied_leaves_nothing_open() {
    let (session, devices, _channel) = fixture();
    devices.deny_audio();

    let err = session.start().await.unwrap_err();

    assert!(matches!(err, SessionError::DeviceAccess { .. }));
    assert_eq!(session.state(), ConnectionState::Idle);
    // The video grant succeeded and was released again
    assert_eq!(devices.video_acquired(), 1);
    assert_eq!(devices.open_tracks(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_video_grant_denied_leaves_nothing_open() {
    let (session, devices, channel) = fixture();
    devices.deny_video();

    let err = session.start().await.unwrap_err();

    assert!(matches!(err, SessionError::DeviceAccess { .. }));
    assert_eq!(session.state(), ConnectionState::Idle);
    assert_eq!(devices.open_tracks(), 0);
    assert_eq!(channel.connect_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_channel_handshake_failure_is_fatal() {
    let (session, devices, channel) = fixture();
    channel.deny_connect();

    let err = session.start().await.unwrap_err();

    assert!(matches!(err, SessionError::Channel { .. }));
    assert_eq!(session.state(), ConnectionState::Idle);
    assert_eq!(devices.open_tracks(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_mid_stream_disconnect_returns_to_idle() -> Result<()> {
    let events: Arc<Mutex<Vec<SessionEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let events_clone = events.clone();

    let devices = Arc::new(MockDevices::new());
    let channel = Arc::new(MockChannel::new());
    let session = LiveSession::new(
        SessionConfig::default(),
        devices.clone(),
        channel.clone(),
        SessionCallbacks::new(|_| {}).with_event(visavis::event_callback(move |e| {
            events_clone.lock().unwrap().push(e);
        })),
    );

    session.start().await?;
    channel.push_event(ChannelEvent::Ready).await;
    settle().await;

    channel
        .push_event(ChannelEvent::Closed {
            reason: "socket reset".to_string(),
        })
        .await;
    settle().await;

    assert_eq!(session.state(), ConnectionState::Idle);
    assert_eq!(devices.open_tracks(), 0);
    assert_eq!(channel.disconnect_count(), 1);

    let seen = events.lock().unwrap();
    assert!(seen
        .iter()
        .any(|e| matches!(e, SessionEvent::ConnectionFailed { .. })));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_transcriptions_reach_the_callback() -> Result<()> {
    let texts: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let texts_clone = texts.clone();

    let devices = Arc::new(MockDevices::new());
    let channel = Arc::new(MockChannel::new());
    let session = LiveSession::new(
        SessionConfig::default(),
        devices.clone(),
        channel.clone(),
        SessionCallbacks::new(move |text| {
            texts_clone.lock().unwrap().push(text);
        }),
    );

    session.start().await?;
    channel.push_event(ChannelEvent::Ready).await;
    channel
        .push_event(ChannelEvent::Text("hello there".to_string()))
        .await;
    settle().await;

    assert_eq!(texts.lock().unwrap().as_slice(), ["hello there"]);

    session.stop().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_speaking_and_output_level_events_update_state() -> Result<()> {
    let (session, _devices, channel) = fixture();

    session.start().await?;
    channel.push_event(ChannelEvent::Ready).await;
    channel.push_event(ChannelEvent::SpeakingChange(true)).await;
    channel.push_event(ChannelEvent::OutputLevel(63)).await;
    settle().await;

    assert!(session.is_remote_speaking());
    assert_eq!(session.output_level(), 63);
    assert_eq!(session.display_level(), 63);
    // Speaking state never changes the lifecycle
    assert_eq!(session.state(), ConnectionState::Connected);

    channel.push_event(ChannelEvent::SpeakingChange(false)).await;
    settle().await;
    assert!(!session.is_remote_speaking());
    assert_eq!(session.display_level(), session.audio_level());

    session.stop().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_repeated_start_stop_never_leaks_tracks() -> Result<()> {
    let (session, devices, channel) = fixture();

    for _ in 0..3 {
        session.start().await?;
        channel.push_event(ChannelEvent::Ready).await;
        settle().await;
        session.stop().await;
    }

    assert_eq!(devices.video_acquired(), devices.video_stopped());
    assert_eq!(devices.audio_acquired(), devices.audio_stopped());
    assert_eq!(devices.open_tracks(), 0);
    Ok(())
}
