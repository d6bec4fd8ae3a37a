//! Capture session
//!
//! Owns the screen, webcam, and microphone streams for one recording
//! session. At most one of each is active at a time; tracks are stopped
//! exactly once, on explicit release or teardown. Everything else in the
//! pipeline only borrows these streams.

use crate::compositor::OverlayPosition;
use crate::media::{
    CameraConstraints, DisplayConstraints, MediaBackend, MediaStream, MediaTrack,
    MicrophoneConstraints,
};
use crate::utils::error::CaptureError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// User-selected capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureConfig {
    pub include_microphone: bool,
    pub include_webcam: bool,
    pub camera_device_id: Option<String>,
    pub microphone_device_id: Option<String>,
    pub overlay_position: OverlayPosition,
    /// Webcam overlay diameter in pixels.
    pub overlay_diameter: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            include_microphone: true,
            include_webcam: false,
            camera_device_id: None,
            microphone_device_id: None,
            overlay_position: OverlayPosition::default(),
            overlay_diameter: crate::compositor::WEBCAM_DIAMETER,
        }
    }
}

/// Exclusive owner of the three capture streams.
pub struct CaptureSession {
    backend: Arc<dyn MediaBackend>,
    config: CaptureConfig,
    screen: Option<MediaStream>,
    webcam: Option<MediaStream>,
    microphone: Option<MediaStream>,
}

impl CaptureSession {
    pub fn new(backend: Arc<dyn MediaBackend>, config: CaptureConfig) -> Self {
        Self {
            backend,
            config,
            screen: None,
            webcam: None,
            microphone: None,
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut CaptureConfig {
        &mut self.config
    }

    pub fn screen(&self) -> Option<&MediaStream> {
        self.screen.as_ref()
    }

    pub fn webcam(&self) -> Option<&MediaStream> {
        self.webcam.as_ref()
    }

    pub fn microphone(&self) -> Option<&MediaStream> {
        self.microphone.as_ref()
    }

    /// The screen stream's video track, if a screen is being captured.
    pub fn screen_video_track(&self) -> Option<MediaTrack> {
        self.screen
            .as_ref()
            .and_then(|s| s.video_tracks().into_iter().next())
    }

    /// The webcam stream's video track, if the webcam is active.
    pub fn webcam_video_track(&self) -> Option<MediaTrack> {
        self.webcam
            .as_ref()
            .and_then(|s| s.video_tracks().into_iter().next())
    }

    /// Request display capture (1920x1080 ideal at 30fps, with system
    /// audio). Replaces any previous screen stream.
    pub async fn acquire_screen(&mut self) -> Result<MediaStream, CaptureError> {
        if let Some(old) = self.screen.take() {
            tracing::warn!("replacing an existing screen stream");
            old.stop_all();
        }

        let stream = self
            .backend
            .acquire_display(&DisplayConstraints::default())
            .await?;
        tracing::info!(stream = %stream.id(), "screen capture acquired");
        self.screen = Some(stream.clone());
        Ok(stream)
    }

    /// Request a 320x320 video-only webcam stream. Failure is non-fatal.
    pub async fn acquire_webcam(&mut self) -> Result<MediaStream, CaptureError> {
        self.release_webcam();

        let constraints = CameraConstraints {
            device_id: self.config.camera_device_id.clone(),
            ..CameraConstraints::default()
        };
        let stream = self
            .backend
            .acquire_camera(&constraints)
            .await
            .map_err(|err| CaptureError::DeviceAcquisitionFailed(err.to_string()))?;
        tracing::info!(stream = %stream.id(), "webcam acquired");
        self.webcam = Some(stream.clone());
        Ok(stream)
    }

    /// Request an audio-only microphone stream. Failure is non-fatal:
    /// recording proceeds without narration.
    pub async fn acquire_microphone(&mut self) -> Result<MediaStream, CaptureError> {
        self.release_microphone();

        let constraints = MicrophoneConstraints {
            device_id: self.config.microphone_device_id.clone(),
        };
        let stream = self
            .backend
            .acquire_microphone(&constraints)
            .await
            .map_err(|err| CaptureError::DeviceAcquisitionFailed(err.to_string()))?;
        tracing::info!(
            stream = %stream.id(),
            tracks = stream.audio_tracks().len(),
            "microphone acquired"
        );
        self.microphone = Some(stream.clone());
        Ok(stream)
    }

    /// Stop and clear the webcam stream. Idempotent.
    pub fn release_webcam(&mut self) {
        if let Some(stream) = self.webcam.take() {
            stream.stop_all();
        }
    }

    /// Stop and clear the microphone stream. Idempotent.
    pub fn release_microphone(&mut self) {
        if let Some(stream) = self.microphone.take() {
            stream.stop_all();
        }
    }

    /// Stop every track of every stream and clear them. Safe to call
    /// multiple times and from any state.
    pub fn teardown(&mut self) {
        for stream in [
            self.screen.take(),
            self.webcam.take(),
            self.microphone.take(),
        ]
        .into_iter()
        .flatten()
        {
            stream.stop_all();
        }
        tracing::debug!("capture session torn down");
    }

    /// Number of tracks across all owned streams that are still live.
    pub fn live_track_count(&self) -> usize {
        [&self.screen, &self.webcam, &self.microphone]
            .into_iter()
            .flatten()
            .map(|s| s.live_track_count())
            .sum()
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
