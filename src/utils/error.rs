//! Error types and handling
//!
//! Common error types used across the pipeline, plus the code/message
//! response shape handed to the embedding UI.

use crate::recorder::state::{RecorderInput, RecorderState};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Acquisition errors.
///
/// Screen acquisition failures are fatal to that attempt; webcam and
/// microphone failures are non-fatal and only disable the feature.
#[derive(Error, Debug)]
pub enum CaptureError {
    /// The user declined a capture or device prompt.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Platform-level acquisition failure (no device, hardware busy).
    #[error("capture failed: {0}")]
    CaptureFailed(String),

    /// Webcam or microphone could not be acquired; the session continues
    /// without that feature.
    #[error("device acquisition failed: {0}")]
    DeviceAcquisitionFailed(String),
}

/// Recording controller errors.
#[derive(Error, Debug)]
pub enum RecorderError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("invalid transition from {state} on {input:?}")]
    InvalidTransition {
        state: RecorderState,
        input: RecorderInput,
    },

    #[error("no active screen stream")]
    NoScreenStream,

    #[error("encoder error: {0}")]
    Encoder(String),
}

/// Thumbnail extraction errors. All non-fatal: the thumbnail is simply
/// omitted.
#[derive(Error, Debug)]
pub enum ThumbnailError {
    #[error("failed to load video for thumbnail: {0}")]
    LoadFailed(String),

    #[error("thumbnail generation timed out")]
    Timeout,

    #[error("thumbnail encoding failed: {0}")]
    EncodeFailed(String),
}

/// Upload boundary errors, reported by the external adapter.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("upload failed: {0}")]
    Failed(String),
}

/// Error response for the embedding frontend.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<&CaptureError> for ErrorResponse {
    fn from(error: &CaptureError) -> Self {
        let code = match error {
            CaptureError::PermissionDenied(_) => "PERMISSION_DENIED",
            CaptureError::CaptureFailed(_) => "CAPTURE_FAILED",
            CaptureError::DeviceAcquisitionFailed(_) => "DEVICE_ACQUISITION_FAILED",
        };
        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

impl From<&RecorderError> for ErrorResponse {
    fn from(error: &RecorderError) -> Self {
        let code = match error {
            RecorderError::Capture(inner) => return ErrorResponse::from(inner),
            RecorderError::InvalidTransition { .. } => "INVALID_TRANSITION",
            RecorderError::NoScreenStream => "NO_SCREEN_STREAM",
            RecorderError::Encoder(_) => "ENCODER_ERROR",
        };
        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

impl From<&ThumbnailError> for ErrorResponse {
    fn from(error: &ThumbnailError) -> Self {
        let code = match error {
            ThumbnailError::LoadFailed(_) => "THUMBNAIL_LOAD_FAILED",
            ThumbnailError::Timeout => "THUMBNAIL_TIMEOUT",
            ThumbnailError::EncodeFailed(_) => "THUMBNAIL_ENCODE_FAILED",
        };
        ErrorResponse {
            code: code.to_string(),
            message: error.to_string(),
        }
    }
}

impl From<&UploadError> for ErrorResponse {
    fn from(error: &UploadError) -> Self {
        ErrorResponse {
            code: "UPLOAD_FAILED".to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type alias for capture operations.
pub type CaptureResult<T> = Result<T, CaptureError>;
