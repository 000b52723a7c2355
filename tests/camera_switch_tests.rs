// Integration tests for in-place camera switching
//
// A switch swaps the video track without recreating the session or the
// channel. Failure must leave the previous camera running, and must reissue
// the handshake only when the channel never became ready.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::advance;
use visavis::{
    ChannelEvent, ConnectionState, Facing, LiveSession, MediaMime, MockChannel, MockDevices,
    SessionCallbacks, SessionConfig, SessionError,
};

fn fixture() -> (LiveSession, Arc<MockDevices>, Arc<MockChannel>) {
    let devices = Arc::new(MockDevices::new());
    let channel = Arc::new(MockChannel::new());
    let session = LiveSession::new(
        SessionConfig {
            session_id: "switch-test".to_string(),
            ..SessionConfig::default()
        },
        devices.clone(),
        channel.clone(),
        SessionCallbacks::new(|_| {}),
    );
    (session, devices, channel)
}

async fn settle() {
    for _ in 0..25 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_switch_success_keeps_channel_untouched() -> Result<()> {
    let (session, devices, channel) = fixture();

    session.start().await?;
    channel.push_event(ChannelEvent::Ready).await;
    settle().await;

    session.switch_camera().await?;

    assert_eq!(session.facing(), Facing::Environment);
    assert!(!session.is_mirrored(), "environment side is not mirrored");
    assert!(!session.is_switching());

    // The old track was stopped, a new one acquired, and the channel was
    // never cycled
    assert_eq!(devices.video_acquired(), 2);
    assert_eq!(devices.video_stopped(), 1);
    assert_eq!(channel.connect_count(), 1);
    assert_eq!(channel.disconnect_count(), 0);

    session.stop().await;
    assert_eq!(devices.open_tracks(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_frames_keep_flowing_after_switch() -> Result<()> {
    let (session, _devices, channel) = fixture();

    session.start().await?;
    channel.push_event(ChannelEvent::Ready).await;
    settle().await;

    advance(Duration::from_millis(1000)).await;
    settle().await;
    assert_eq!(channel.sent_count(MediaMime::ImageJpeg), 1);

    session.switch_camera().await?;

    advance(Duration::from_millis(1000)).await;
    settle().await;
    assert_eq!(channel.sent_count(MediaMime::ImageJpeg), 2);

    session.stop().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_switch_failure_keeps_previous_track_when_ready() -> Result<()> {
    let (session, devices, channel) = fixture();

    session.start().await?;
    channel.push_event(ChannelEvent::Ready).await;
    settle().await;

    devices.deny_video();
    let err = session.switch_camera().await.unwrap_err();

    assert!(matches!(err, SessionError::CameraSwitch { .. }));
    assert!(!session.is_switching(), "switching cleared on failure");

    // Original track still attached and running
    assert_eq!(devices.video_acquired(), 1);
    assert_eq!(devices.video_stopped(), 0);

    // Channel was ready: zero reconnects
    assert_eq!(channel.connect_count(), 1);

    // The session is still connected and still sampling
    advance(Duration::from_millis(1000)).await;
    settle().await;
    assert_eq!(channel.sent_count(MediaMime::ImageJpeg), 1);

    session.stop().await;
    assert_eq!(devices.open_tracks(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_switch_failure_reissues_handshake_when_not_ready() -> Result<()> {
    let (session, devices, channel) = fixture();

    session.start().await?;
    assert_eq!(session.state(), ConnectionState::Connecting);

    devices.deny_video();
    let err = session.switch_camera().await.unwrap_err();
    settle().await;

    assert!(matches!(err, SessionError::CameraSwitch { .. }));
    // Channel was not ready: exactly one reissued connect
    assert_eq!(channel.connect_count(), 2);
    assert_eq!(session.state(), ConnectionState::Connecting);

    // The reissued handshake can still complete
    channel.push_event(ChannelEvent::Ready).await;
    settle().await;
    assert_eq!(session.state(), ConnectionState::Connected);

    session.stop().await;
    assert_eq!(devices.open_tracks(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_switch_with_no_session_is_a_noop() -> Result<()> {
    let (session, devices, channel) = fixture();

    session.switch_camera().await?;

    assert_eq!(devices.video_acquired(), 0);
    assert_eq!(channel.connect_count(), 0);
    assert_eq!(session.state(), ConnectionState::Idle);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_mirror_follows_facing_across_switches() -> Result<()> {
    let (session, _devices, channel) = fixture();

    session.start().await?;
    channel.push_event(ChannelEvent::Ready).await;
    settle().await;

    assert_eq!(session.facing(), Facing::User);
    assert!(session.is_mirrored());

    session.switch_camera().await?;
    assert_eq!(session.facing(), Facing::Environment);
    assert!(!session.is_mirrored());

    session.switch_camera().await?;
    assert_eq!(session.facing(), Facing::User);
    assert!(session.is_mirrored());

    session.stop().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_manual_mirror_toggle_overrides_convention() -> Result<()> {
    let (session, _devices, channel) = fixture();

    session.start().await?;
    channel.push_event(ChannelEvent::Ready).await;
    settle().await;

    assert!(session.is_mirrored());
    assert!(!session.toggle_mirror());
    assert!(!session.is_mirrored());

    // The next switch reapplies the facing convention
    session.switch_camera().await?;
    assert!(!session.is_mirrored());
    session.switch_camera().await?;
    assert!(session.is_mirrored());

    session.stop().await;
    Ok(())
}
