//! Upload boundary
//!
//! The core hands the finished blob to an external adapter and only
//! supplies metadata values; byte transfer and persistence live outside
//! this crate.

use crate::recorder::RecordingBlob;
use crate::utils::error::UploadError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-side processing status of a recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingStatus {
    Processing,
    Ready,
    Failed,
}

/// Create-recording payload supplied by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecording {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Duration in seconds.
    pub duration: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_webcam: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// JPEG data URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// A recording record as persisted by the external store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingRecord {
    pub id: String,
    pub title: String,
    pub blob_url: String,
    pub file_size: u64,
    pub duration: f64,
    pub mime_type: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub has_webcam: bool,
    pub thumbnail: Option<String>,
    pub view_count: u32,
    pub status: RecordingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial patch applied to a recording after upload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RecordingStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// Percent-complete callback, 0.0 to 100.0.
pub type ProgressFn = dyn Fn(f32) + Send + Sync;

/// External adapter that transfers the blob to storage and persists the
/// final metadata. Called once per completed recording after the user
/// confirms save.
#[async_trait]
pub trait UploadAdapter: Send + Sync {
    async fn upload(
        &self,
        blob: &RecordingBlob,
        recording_id: &str,
        on_progress: &ProgressFn,
    ) -> Result<RecordingRecord, UploadError>;
}
