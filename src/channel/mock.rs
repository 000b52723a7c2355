//! Mock channel for testing without a transport.

use anyhow::{bail, Result};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

use super::{ChannelEvent, MediaChunk, MediaMime, RemoteChannel};

/// A [`RemoteChannel`] that records outbound traffic and lets the test drive
/// inbound events.
///
/// Each `connect()` yields a fresh event stream; the test pushes events
/// (ready, speaking, text) through [`MockChannel::push_event`]. Sent chunks
/// and connect/disconnect calls are counted for assertions.
pub struct MockChannel {
    connects: AtomicUsize,
    disconnects: AtomicUsize,
    deny_connect: AtomicBool,
    sent: Mutex<Vec<MediaChunk>>,
    events_tx: Mutex<Option<mpsc::Sender<ChannelEvent>>>,
}

impl MockChannel {
    pub fn new() -> Self {
        Self {
            connects: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            deny_connect: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            events_tx: Mutex::new(None),
        }
    }

    /// Makes subsequent `connect()` calls fail.
    pub fn deny_connect(&self) {
        self.deny_connect.store(true, Ordering::SeqCst);
    }

    /// Number of `connect()` calls observed.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Number of `disconnect()` calls observed.
    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    /// Snapshot of every chunk sent so far.
    pub fn sent_chunks(&self) -> Vec<MediaChunk> {
        self.sent.lock().unwrap().clone()
    }

    /// Number of sent chunks with the given mime type.
    pub fn sent_count(&self, mime: MediaMime) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.mime == mime)
            .count()
    }

    /// Delivers an inbound event on the current stream.
    ///
    /// Panics if the channel was never connected; returns quietly if the
    /// stream has been dropped (the session tore down).
    pub async fn push_event(&self, event: ChannelEvent) {
        let tx = self
            .events_tx
            .lock()
            .unwrap()
            .clone()
            .expect("push_event before connect()");
        let _ = tx.send(event).await;
    }

    /// Drops the current event stream, simulating a mid-stream disconnect.
    pub fn drop_event_stream(&self) {
        self.events_tx.lock().unwrap().take();
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RemoteChannel for MockChannel {
    async fn connect(&self) -> Result<mpsc::Receiver<ChannelEvent>> {
        if self.deny_connect.load(Ordering::SeqCst) {
            bail!("mock connect denied");
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(32);
        *self.events_tx.lock().unwrap() = Some(tx);
        Ok(rx)
    }

    async fn send_media_chunk(&self, chunk: MediaChunk) -> Result<()> {
        self.sent.lock().unwrap().push(chunk);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.events_tx.lock().unwrap().take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_channel_records_sends() {
        let channel = MockChannel::new();
        let _rx = channel.connect().await.unwrap();

        channel
            .send_media_chunk(MediaChunk::audio("cGNt".into()))
            .await
            .unwrap();
        channel
            .send_media_chunk(MediaChunk::video("anBn".into()))
            .await
            .unwrap();

        assert_eq!(channel.sent_count(MediaMime::AudioPcm), 1);
        assert_eq!(channel.sent_count(MediaMime::ImageJpeg), 1);
        assert_eq!(channel.connect_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_channel_event_stream() {
        let channel = MockChannel::new();
        let mut rx = channel.connect().await.unwrap();

        channel.push_event(ChannelEvent::Ready).await;
        assert!(matches!(rx.recv().await, Some(ChannelEvent::Ready)));

        channel.drop_event_stream();
        assert!(rx.recv().await.is_none());
    }
}
