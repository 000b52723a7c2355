use base64::Engine;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::channel::{MediaChunk, RemoteChannel};
use crate::session::SessionShared;

/// One emitted audio sample: base64 PCM plus its metered level.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Base64-armored little-endian 16-bit PCM.
    pub data: String,
    /// Peak amplitude, 0-100.
    pub level: u8,
}

/// Accumulates incoming sample batches into fixed-size buffers.
///
/// Hardware delivers samples in whatever batch sizes it likes; one frame is
/// emitted per `capacity` samples, carrying any remainder forward.
pub(crate) struct PcmAccumulator {
    buf: Vec<i16>,
    capacity: usize,
}

impl PcmAccumulator {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Feeds a batch, returning every buffer that filled.
    pub(crate) fn feed(&mut self, samples: &[i16]) -> Vec<Vec<i16>> {
        let mut full = Vec::new();
        for &sample in samples {
            self.buf.push(sample);
            if self.buf.len() == self.capacity {
                full.push(std::mem::replace(
                    &mut self.buf,
                    Vec::with_capacity(self.capacity),
                ));
            }
        }
        full
    }

    #[cfg(test)]
    fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// Peak amplitude of a buffer mapped to 0-100.
pub(crate) fn peak_level(samples: &[i16]) -> u8 {
    let peak = samples
        .iter()
        .map(|&s| (s as i32).unsigned_abs())
        .max()
        .unwrap_or(0);
    (((peak as f32 / i16::MAX as f32) * 100.0).round() as u32).min(100) as u8
}

/// Base64-armors a buffer as little-endian PCM bytes.
pub(crate) fn encode_pcm(samples: &[i16]) -> String {
    let pcm_bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    base64::engine::general_purpose::STANDARD.encode(pcm_bytes)
}

/// Drains a live audio track into fixed-size frames and sends them upstream.
///
/// Metering always updates; emission is gated on the remote party not
/// speaking and the session being connected. Send failures are logged, never
/// propagated; an escaping error would silently end all future emission.
pub(crate) async fn run_audio_pipeline(
    mut samples_rx: mpsc::Receiver<Vec<i16>>,
    buffer_size: usize,
    shared: Arc<SessionShared>,
    channel: Arc<dyn RemoteChannel>,
) {
    info!("Audio pipeline started ({} sample buffers)", buffer_size);

    let mut accumulator = PcmAccumulator::new(buffer_size);

    while let Some(batch) = samples_rx.recv().await {
        for samples in accumulator.feed(&batch) {
            let frame = AudioFrame {
                data: encode_pcm(&samples),
                level: peak_level(&samples),
            };

            shared.set_audio_level(frame.level);

            // The remote party is speaking: meter, but do not feed its own
            // speech back upstream.
            if shared.is_remote_speaking() {
                shared.note_frame_suppressed();
                continue;
            }

            if !shared.is_connected() {
                continue;
            }

            match channel.send_media_chunk(MediaChunk::audio(frame.data)).await {
                Ok(()) => shared.note_audio_frame_sent(),
                Err(e) => error!("Failed to send audio frame: {}", e),
            }
        }
    }

    info!("Audio pipeline stopped");
}
