//! Platform media backend
//!
//! The acquisition seam between the pipeline and whatever platform
//! actually produces pixels and samples. Everything above this trait is
//! testable without real hardware.

use super::track::MediaStream;
use crate::utils::error::CaptureError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Constraints for display (screen/window/tab) capture.
#[derive(Debug, Clone)]
pub struct DisplayConstraints {
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub frame_rate: u32,
    /// Request the system-audio track alongside video.
    pub system_audio: bool,
}

impl Default for DisplayConstraints {
    fn default() -> Self {
        Self {
            ideal_width: 1920,
            ideal_height: 1080,
            frame_rate: 30,
            system_audio: true,
        }
    }
}

/// Constraints for webcam capture. Video only: narration audio comes from
/// a dedicated microphone stream so it can be muted independently.
#[derive(Debug, Clone)]
pub struct CameraConstraints {
    pub device_id: Option<String>,
    pub width: u32,
    pub height: u32,
}

impl Default for CameraConstraints {
    fn default() -> Self {
        Self {
            device_id: None,
            width: 320,
            height: 320,
        }
    }
}

/// Constraints for microphone capture.
#[derive(Debug, Clone, Default)]
pub struct MicrophoneConstraints {
    pub device_id: Option<String>,
}

/// Kind of an enumerable input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Camera,
    Microphone,
}

/// Information about one camera or microphone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub device_id: String,
    pub label: String,
    pub kind: DeviceKind,
}

/// Platform acquisition backend.
///
/// Acquisition calls may stay pending indefinitely while the user decides
/// on a permission prompt; a denial resolves the same call with
/// [`CaptureError::PermissionDenied`].
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Acquire a display stream (video plus optional system audio).
    async fn acquire_display(
        &self,
        constraints: &DisplayConstraints,
    ) -> Result<MediaStream, CaptureError>;

    /// Acquire a video-only webcam stream.
    async fn acquire_camera(
        &self,
        constraints: &CameraConstraints,
    ) -> Result<MediaStream, CaptureError>;

    /// Acquire an audio-only microphone stream.
    async fn acquire_microphone(
        &self,
        constraints: &MicrophoneConstraints,
    ) -> Result<MediaStream, CaptureError>;

    /// List attached cameras and microphones.
    async fn enumerate_devices(&self) -> anyhow::Result<Vec<DeviceInfo>>;

    /// Subscribe to hardware hot-plug notifications.
    fn device_changes(&self) -> broadcast::Receiver<()>;
}
