//! Thumbnail extraction
//!
//! Two strategies: a live grab from the active video source at stop time
//! (preferred, instant), and a post-hoc seek over the finished blob
//! behind the [`BlobVideoSource`] seam. Both produce a 320px-wide JPEG
//! data URL and both are optional: failures omit the thumbnail, never
//! the recording.

use crate::media::{MediaTrack, VideoFrame};
use crate::recorder::RecordingBlob;
use crate::utils::error::ThumbnailError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::time::Duration;

/// Output thumbnail width; height follows the source aspect ratio.
pub const THUMBNAIL_WIDTH: u32 = 320;
/// JPEG quality (0-100).
pub const JPEG_QUALITY: u8 = 60;
/// Where the post-hoc path seeks to, unless the clip is shorter.
pub const POSTHOC_SEEK_SECS: f64 = 1.0;
/// Hard deadline for the post-hoc path in case the seek never completes.
pub const POSTHOC_TIMEOUT: Duration = Duration::from_secs(10);
/// Frames a live source must have decoded before it is usable.
pub const MIN_DECODED_FRAMES: u64 = 2;

/// Grab a still from the live video source. Returns `None` (not an
/// error) when no suitable frame is available.
pub fn capture_live(track: &MediaTrack) -> Option<String> {
    if track.frames_decoded() < MIN_DECODED_FRAMES {
        return None;
    }
    let frame = track.latest_frame()?;
    match encode_jpeg_data_url(&frame) {
        Ok(data_url) => {
            tracing::debug!("thumbnail captured from live stream");
            Some(data_url)
        }
        Err(err) => {
            tracing::warn!("live thumbnail capture failed: {err}");
            None
        }
    }
}

/// A temporary video resource opened over a finished blob, mirroring an
/// off-DOM video element with an object URL.
///
/// `release` revokes the temporary resource handle and is called exactly
/// once per extraction attempt, on success, failure, and timeout alike.
#[async_trait]
pub trait BlobVideoSource: Send {
    /// Load the blob until metadata is available.
    async fn load(&mut self, blob: &RecordingBlob) -> Result<(), ThumbnailError>;

    /// Clip duration in seconds, valid after `load`.
    fn duration_secs(&self) -> f64;

    /// Seek and decode the frame at the given time.
    async fn seek_to(&mut self, secs: f64) -> Result<VideoFrame, ThumbnailError>;

    /// Revoke the temporary resource handle.
    fn release(&mut self);
}

/// Post-hoc extraction over an already-finalized blob: seek to 1 second
/// (or 0 for shorter clips), grab the frame, encode.
pub async fn capture_from_blob(
    source: &mut dyn BlobVideoSource,
    blob: &RecordingBlob,
) -> Result<String, ThumbnailError> {
    let attempt = async {
        source.load(blob).await?;
        let seek = if source.duration_secs() > POSTHOC_SEEK_SECS {
            POSTHOC_SEEK_SECS
        } else {
            0.0
        };
        let frame = source.seek_to(seek).await?;
        encode_jpeg_data_url(&frame)
    };

    let result = match tokio::time::timeout(POSTHOC_TIMEOUT, attempt).await {
        Ok(result) => result,
        Err(_) => Err(ThumbnailError::Timeout),
    };
    source.release();

    if let Err(err) = &result {
        tracing::warn!("post-hoc thumbnail extraction failed: {err}");
    }
    result
}

/// Scale to [`THUMBNAIL_WIDTH`] preserving aspect ratio and encode as a
/// JPEG data URL.
fn encode_jpeg_data_url(frame: &VideoFrame) -> Result<String, ThumbnailError> {
    let width = THUMBNAIL_WIDTH;
    let height = ((width as f64 / frame.aspect()).round() as u32).max(1);
    let scaled = frame.scale_to(width, height);

    let rgba = image::RgbaImage::from_raw(width, height, scaled.data)
        .ok_or_else(|| ThumbnailError::EncodeFailed("frame buffer size mismatch".to_string()))?;
    let rgb = image::DynamicImage::ImageRgba8(rgba).to_rgb8();

    let mut bytes = Vec::new();
    let mut encoder =
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, JPEG_QUALITY);
    encoder
        .encode(rgb.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .map_err(|err| ThumbnailError::EncodeFailed(err.to_string()))?;

    Ok(format!("data:image/jpeg;base64,{}", BASE64.encode(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::TrackSettings;

    #[test]
    fn test_encode_preserves_aspect_ratio_header() {
        let frame = VideoFrame::solid(1920, 1080, [40, 80, 120, 255]);
        let data_url = encode_jpeg_data_url(&frame).unwrap();
        assert!(data_url.starts_with("data:image/jpeg;base64,"));

        let bytes = BASE64
            .decode(data_url.trim_start_matches("data:image/jpeg;base64,"))
            .unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), 320);
        assert_eq!(decoded.height(), 180);
    }

    #[test]
    fn test_live_capture_requires_two_decoded_frames() {
        let track = MediaTrack::video("screen", TrackSettings::default());
        assert!(capture_live(&track).is_none());

        track.push_frame(VideoFrame::solid(64, 36, [1, 2, 3, 255]));
        assert!(capture_live(&track).is_none());

        track.push_frame(VideoFrame::solid(64, 36, [1, 2, 3, 255]));
        assert!(capture_live(&track).is_some());
    }
}
