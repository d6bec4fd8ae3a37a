//! Encoder seam
//!
//! Models the platform media encoder: container probing, timeslice-based
//! data segments, and pause/resume without finalizing. The controller
//! owns one encoder per recording and drains its segments into the chunk
//! buffer.

use crate::media::MediaStream;
use crate::utils::error::RecorderError;
use std::time::Duration;
use tokio::sync::mpsc;

/// Container/codec preference order; the first supported entry wins.
pub const SUPPORTED_MIME_TYPES: [&str; 5] = [
    "video/webm;codecs=vp9,opus",
    "video/webm;codecs=vp8,opus",
    "video/webm;codecs=vp9",
    "video/webm;codecs=vp8",
    "video/webm",
];

/// Fallback when the encoder supports none of the preferred types.
pub const DEFAULT_MIME_TYPE: &str = "video/webm";

/// Target video bitrate in bits per second.
pub const VIDEO_BITRATE: u32 = 2_500_000;

/// The encoder emits a data segment at least this often.
pub const TIMESLICE: Duration = Duration::from_secs(1);

/// Options resolved once at recording start.
#[derive(Debug, Clone)]
pub struct EncoderOptions {
    pub mime_type: String,
    pub video_bits_per_second: u32,
    pub timeslice: Duration,
}

impl EncoderOptions {
    pub fn new(mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            video_bits_per_second: VIDEO_BITRATE,
            timeslice: TIMESLICE,
        }
    }
}

/// Encoder lifecycle, mirroring the platform recorder object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderState {
    Inactive,
    Recording,
    Paused,
}

/// The platform encoder boundary.
///
/// `start` binds the encoder to the combined stream and the segment sink;
/// the implementation must emit encoded segments through the sink at
/// least once per timeslice and drop the sink after `stop` has flushed
/// any pending data.
pub trait MediaEncoder: Send {
    /// Whether the given container/codec string is supported.
    fn is_type_supported(&self, mime_type: &str) -> bool;

    fn start(
        &mut self,
        stream: MediaStream,
        options: EncoderOptions,
        sink: mpsc::UnboundedSender<Vec<u8>>,
    ) -> Result<(), RecorderError>;

    /// Suspend encoding without finalizing.
    fn pause(&mut self) -> Result<(), RecorderError>;

    /// Resume a paused encoder.
    fn resume(&mut self) -> Result<(), RecorderError>;

    /// Finalize: flush pending segments, then release the sink.
    fn stop(&mut self) -> Result<(), RecorderError>;

    fn state(&self) -> EncoderState;
}

/// Probe the preference list against the encoder; default WebM when
/// nothing reports support.
pub fn select_mime_type(encoder: &dyn MediaEncoder) -> String {
    SUPPORTED_MIME_TYPES
        .iter()
        .find(|mime| encoder.is_type_supported(mime))
        .map(|mime| mime.to_string())
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string())
}
