//! Recorder state machine
//!
//! The lifecycle is a pure function of (state, input) so it can be tested
//! without media hardware; the controller applies the table and performs
//! the side effects.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of the recording controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecorderState {
    /// No capture in progress.
    #[default]
    Idle,
    /// Screen acquired, previewing before recording.
    Previewing,
    /// The UI is counting down to the start.
    Countdown,
    /// Actively encoding.
    Recording,
    /// Encoding suspended; duration frozen.
    Paused,
    /// Finalized: output blob available, streams still alive for preview.
    Stopped,
    /// Blob handed to the upload boundary.
    Uploading,
    /// Upload complete; session fully torn down.
    Done,
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecorderState::Idle => "IDLE",
            RecorderState::Previewing => "PREVIEWING",
            RecorderState::Countdown => "COUNTDOWN",
            RecorderState::Recording => "RECORDING",
            RecorderState::Paused => "PAUSED",
            RecorderState::Stopped => "STOPPED",
            RecorderState::Uploading => "UPLOADING",
            RecorderState::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// Named events that drive the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderInput {
    ScreenAcquired,
    CountdownStarted,
    StartRequested,
    PauseRequested,
    ResumeRequested,
    StopRequested,
    UploadStarted,
    UploadFinished,
    UploadFailed,
    Discarded,
    /// The screen track ended (e.g. the browser's "stop sharing" button).
    ScreenEnded,
}

/// The transition table. Returns `None` for invalid transitions.
pub fn next_state(state: RecorderState, input: RecorderInput) -> Option<RecorderState> {
    use RecorderInput::*;
    use RecorderState::*;

    match (state, input) {
        (Idle, ScreenAcquired) => Some(Previewing),
        (Previewing, CountdownStarted) => Some(Countdown),
        (Previewing | Countdown, StartRequested) => Some(Recording),
        (Recording, PauseRequested) => Some(Paused),
        (Paused, ResumeRequested) => Some(Recording),
        (Recording | Paused, StopRequested) => Some(Stopped),
        (Stopped, UploadStarted) => Some(Uploading),
        (Uploading, UploadFinished) => Some(Done),
        // A failed upload keeps the blob so retry needs no re-recording.
        (Uploading, UploadFailed) => Some(Stopped),
        // An actively encoding session stops gracefully; any other state
        // tears down to idle.
        (Recording, ScreenEnded) => Some(Stopped),
        (Previewing | Countdown | Paused, ScreenEnded) => Some(Idle),
        (_, Discarded) => Some(Idle),
        _ => None,
    }
}

/// The video stream fed to the encoder, resolved once at recording start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VideoSource {
    /// The raw screen stream.
    RawScreen,
    /// The compositor's canvas-derived stream (webcam overlay active).
    CompositedCanvas,
}

/// The finished recording: every emitted data segment concatenated into
/// one immutable binary, tagged with the resolved container type.
#[derive(Debug, Clone)]
pub struct RecordingBlob {
    data: Vec<u8>,
    mime_type: String,
}

impl RecordingBlob {
    pub fn from_chunks(chunks: Vec<Vec<u8>>, mime_type: impl Into<String>) -> Self {
        Self {
            data: chunks.concat(),
            mime_type: mime_type.into(),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
