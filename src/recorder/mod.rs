//! Recording system module
//!
//! The recording controller and its collaborators:
//! - a pure state machine (`state`) driven by named events
//! - the `MediaEncoder` seam (`encoder`) modeling the platform encoder
//! - the effectful `RecordingController` (`controller`) orchestrating
//!   capture, compositing, mixing, and chunk accumulation

pub mod controller;
pub mod encoder;
pub mod state;

pub use controller::{watch_screen_ended, ControllerEvent, RecordingController};
pub use encoder::{select_mime_type, EncoderOptions, EncoderState, MediaEncoder};
pub use state::{next_state, RecorderInput, RecorderState, RecordingBlob, VideoSource};
