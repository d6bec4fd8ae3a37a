//! Media primitives
//!
//! Streams, tracks, and raw frame/sample payloads shared by the capture
//! pipeline, plus the platform backend trait that produces them.

pub mod backend;
pub mod frame;
pub mod track;

pub use backend::{
    CameraConstraints, DeviceInfo, DeviceKind, DisplayConstraints, MediaBackend,
    MicrophoneConstraints,
};
pub use frame::{AudioChunk, VideoFrame};
pub use track::{MediaStream, MediaTrack, TrackKind, TrackSettings};
