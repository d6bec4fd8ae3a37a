//! Loopcast - screen recording capture pipeline.
//!
//! The client-side core of a screen recorder: device enumeration, screen/
//! webcam/microphone capture sessions, live canvas compositing of a
//! circular webcam overlay, multi-source audio mixing, a chunked
//! recording state machine, and thumbnail extraction. Platform
//! acquisition, encoding, and upload sit behind traits so the whole
//! lifecycle is testable without real media hardware.

pub mod capture;
pub mod compositor;
pub mod devices;
pub mod media;
pub mod mixer;
pub mod recorder;
pub mod thumbnail;
pub mod upload;
pub mod utils;

pub use capture::{CaptureConfig, CaptureSession};
pub use compositor::{Compositor, CompositorConfig, OverlayPosition};
pub use devices::{DeviceEnumerator, DeviceLists, DeviceWatcher};
pub use media::{MediaBackend, MediaStream, MediaTrack};
pub use mixer::MixedAudio;
pub use recorder::{
    ControllerEvent, MediaEncoder, RecorderState, RecordingBlob, RecordingController,
};
pub use upload::UploadAdapter;
pub use utils::error::{CaptureError, RecorderError, ThumbnailError, UploadError};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging for an embedding application.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loopcast=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
