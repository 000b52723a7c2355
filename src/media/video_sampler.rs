use anyhow::{Context, Result};
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::channel::{MediaChunk, RemoteChannel};
use crate::device::{MediaSession, VideoImage};
use crate::session::SessionShared;

/// One emitted video sample: base64 JPEG at the track's native resolution.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Base64-armored JPEG.
    pub data: String,
}

/// Flips an image horizontally in place (RGB8, 3 bytes per pixel).
pub(crate) fn mirror_horizontal(image: &mut VideoImage) {
    if image.width == 0 {
        return;
    }
    let row_len = image.width as usize * 3;
    for row in image.pixels.chunks_exact_mut(row_len) {
        let mut left = 0;
        let mut right = image.width as usize - 1;
        while left < right {
            for i in 0..3 {
                row.swap(left * 3 + i, right * 3 + i);
            }
            left += 1;
            right -= 1;
        }
    }
}

/// JPEG-compresses an RGB frame at the given quality.
pub(crate) fn encode_jpeg(image: &VideoImage, quality: u8) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
    encoder
        .encode(
            &image.pixels,
            image.width,
            image.height,
            image::ColorType::Rgb8,
        )
        .context("Failed to encode video frame as JPEG")?;
    Ok(out)
}

/// Samples the current video frame on a fixed cadence and sends it upstream.
///
/// The task exists only while the session is live and the channel ready; the
/// controller starts it on the ready handshake and aborts it on teardown, so
/// no sample is ever taken against a stale or absent track. Each tick is
/// additionally gated on the connected state. Capture, encode, and send
/// failures are logged and the cadence continues.
pub(crate) async fn run_video_sampler(
    interval: Duration,
    quality: u8,
    media: Arc<MediaSession>,
    shared: Arc<SessionShared>,
    channel: Arc<dyn RemoteChannel>,
) {
    info!("Video sampler started ({}ms cadence)", interval.as_millis());

    loop {
        sleep(interval).await;

        if !shared.is_connected() {
            continue;
        }

        let mut image = match media.capture_frame().await {
            Ok(image) => image,
            Err(e) => {
                warn!("Video frame capture failed: {}", e);
                continue;
            }
        };

        if shared.is_mirrored() {
            mirror_horizontal(&mut image);
        }

        let frame = match encode_jpeg(&image, quality) {
            Ok(jpeg) => VideoFrame {
                data: base64::engine::general_purpose::STANDARD.encode(jpeg),
            },
            Err(e) => {
                error!("{}", e);
                continue;
            }
        };

        match channel.send_media_chunk(MediaChunk::video(frame.data)).await {
            Ok(()) => shared.note_video_frame_sent(),
            Err(e) => error!("Failed to send video frame: {}", e),
        }
    }
}
