//! Test doubles for the platform seams: a scriptable media backend, a
//! deterministic encoder, and a blob video source for the post-hoc
//! thumbnail path.
#![allow(dead_code)]

use async_trait::async_trait;
use loopcast::media::{
    CameraConstraints, DeviceInfo, DisplayConstraints, MediaBackend, MediaStream, MediaTrack,
    MicrophoneConstraints, TrackSettings, VideoFrame,
};
use loopcast::recorder::{EncoderOptions, EncoderState, MediaEncoder, RecordingBlob};
use loopcast::thumbnail::BlobVideoSource;
use loopcast::utils::error::{CaptureError, RecorderError, ThumbnailError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

/// Scriptable in-memory backend.
pub struct MockBackend {
    pub deny_screen: bool,
    pub fail_camera: bool,
    pub fail_microphone: bool,
    pub system_audio: bool,
    pub devices: Mutex<Vec<DeviceInfo>>,
    change_tx: broadcast::Sender<()>,
}

impl MockBackend {
    pub fn granting() -> Self {
        let (change_tx, _) = broadcast::channel(8);
        Self {
            deny_screen: false,
            fail_camera: false,
            fail_microphone: false,
            system_audio: true,
            devices: Mutex::new(Vec::new()),
            change_tx,
        }
    }

    pub fn denying_screen() -> Self {
        Self {
            deny_screen: true,
            ..Self::granting()
        }
    }

    pub fn without_system_audio() -> Self {
        Self {
            system_audio: false,
            ..Self::granting()
        }
    }

    pub fn fire_device_change(&self) {
        let _ = self.change_tx.send(());
    }

    pub fn change_listener_count(&self) -> usize {
        self.change_tx.receiver_count()
    }
}

#[async_trait]
impl MediaBackend for MockBackend {
    async fn acquire_display(
        &self,
        constraints: &DisplayConstraints,
    ) -> Result<MediaStream, CaptureError> {
        if self.deny_screen {
            return Err(CaptureError::PermissionDenied(
                "user declined screen share".to_string(),
            ));
        }
        let video = MediaTrack::video(
            "mock-screen",
            TrackSettings {
                width: Some(constraints.ideal_width),
                height: Some(constraints.ideal_height),
                frame_rate: Some(constraints.frame_rate as f64),
                device_id: None,
            },
        );
        // Two frames so the live-thumbnail readiness check passes.
        video.push_frame(VideoFrame::solid(64, 36, [20, 20, 20, 255]));
        video.push_frame(VideoFrame::solid(64, 36, [21, 21, 21, 255]));

        let mut tracks = vec![video];
        if self.system_audio && constraints.system_audio {
            tracks.push(MediaTrack::audio("mock-system-audio", TrackSettings::default()));
        }
        Ok(MediaStream::new(tracks))
    }

    async fn acquire_camera(
        &self,
        constraints: &CameraConstraints,
    ) -> Result<MediaStream, CaptureError> {
        if self.fail_camera {
            return Err(CaptureError::CaptureFailed("camera busy".to_string()));
        }
        let video = MediaTrack::video(
            "mock-webcam",
            TrackSettings {
                width: Some(constraints.width),
                height: Some(constraints.height),
                frame_rate: None,
                device_id: constraints.device_id.clone(),
            },
        );
        video.push_frame(VideoFrame::solid(32, 32, [200, 40, 40, 255]));
        Ok(MediaStream::new(vec![video]))
    }

    async fn acquire_microphone(
        &self,
        constraints: &MicrophoneConstraints,
    ) -> Result<MediaStream, CaptureError> {
        if self.fail_microphone {
            return Err(CaptureError::CaptureFailed("no microphone".to_string()));
        }
        let audio = MediaTrack::audio(
            "mock-mic",
            TrackSettings {
                device_id: constraints.device_id.clone(),
                ..TrackSettings::default()
            },
        );
        Ok(MediaStream::new(vec![audio]))
    }

    async fn enumerate_devices(&self) -> anyhow::Result<Vec<DeviceInfo>> {
        Ok(self.devices.lock().clone())
    }

    fn device_changes(&self) -> broadcast::Receiver<()> {
        self.change_tx.subscribe()
    }
}

/// What the mock encoder observed, shared with the test body.
#[derive(Default)]
pub struct EncoderProbe {
    pub started_with: Option<MediaStream>,
    pub options: Option<EncoderOptions>,
    pub pauses: u32,
    pub resumes: u32,
    pub stops: u32,
}

/// Deterministic encoder: one segment on start, one on stop.
pub struct MockEncoder {
    supported: Vec<&'static str>,
    emit_segments: bool,
    stop_delay: Duration,
    state: EncoderState,
    sink: Option<mpsc::UnboundedSender<Vec<u8>>>,
    probe: Arc<Mutex<EncoderProbe>>,
}

impl MockEncoder {
    pub fn new() -> Self {
        Self::supporting(vec![
            "video/webm;codecs=vp9,opus",
            "video/webm;codecs=vp8,opus",
            "video/webm;codecs=vp9",
            "video/webm;codecs=vp8",
            "video/webm",
        ])
    }

    pub fn supporting(supported: Vec<&'static str>) -> Self {
        Self {
            supported,
            emit_segments: true,
            stop_delay: Duration::ZERO,
            state: EncoderState::Inactive,
            sink: None,
            probe: Arc::new(Mutex::new(EncoderProbe::default())),
        }
    }

    /// An encoder whose finalization takes a while.
    pub fn with_stop_delay(mut self, delay: Duration) -> Self {
        self.stop_delay = delay;
        self
    }

    /// An encoder that never emits a data segment.
    pub fn silent() -> Self {
        Self {
            emit_segments: false,
            ..Self::new()
        }
    }

    pub fn probe(&self) -> Arc<Mutex<EncoderProbe>> {
        Arc::clone(&self.probe)
    }
}

impl MediaEncoder for MockEncoder {
    fn is_type_supported(&self, mime_type: &str) -> bool {
        self.supported.contains(&mime_type)
    }

    fn start(
        &mut self,
        stream: MediaStream,
        options: EncoderOptions,
        sink: mpsc::UnboundedSender<Vec<u8>>,
    ) -> Result<(), RecorderError> {
        if self.state != EncoderState::Inactive {
            return Err(RecorderError::Encoder("already started".to_string()));
        }
        if self.emit_segments {
            let _ = sink.send(b"SEG0".to_vec());
        }
        let mut probe = self.probe.lock();
        probe.started_with = Some(stream);
        probe.options = Some(options);
        self.sink = Some(sink);
        self.state = EncoderState::Recording;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), RecorderError> {
        if self.state != EncoderState::Recording {
            return Err(RecorderError::Encoder("not recording".to_string()));
        }
        self.probe.lock().pauses += 1;
        self.state = EncoderState::Paused;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), RecorderError> {
        if self.state != EncoderState::Paused {
            return Err(RecorderError::Encoder("not paused".to_string()));
        }
        self.probe.lock().resumes += 1;
        self.state = EncoderState::Recording;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RecorderError> {
        if self.state == EncoderState::Inactive {
            return Err(RecorderError::Encoder("not started".to_string()));
        }
        if !self.stop_delay.is_zero() {
            std::thread::sleep(self.stop_delay);
        }
        if let Some(sink) = self.sink.take() {
            if self.emit_segments {
                let _ = sink.send(b"FINAL".to_vec());
            }
        }
        self.probe.lock().stops += 1;
        self.state = EncoderState::Inactive;
        Ok(())
    }

    fn state(&self) -> EncoderState {
        self.state
    }
}

/// Blob video source with scriptable load/seek behavior.
pub struct MockBlobVideoSource {
    pub fail_load: bool,
    pub hang_seek: bool,
    pub duration: f64,
    pub frame: VideoFrame,
    pub releases: Arc<AtomicUsize>,
    pub seeked_to: Option<f64>,
}

impl MockBlobVideoSource {
    pub fn new(duration: f64) -> Self {
        Self {
            fail_load: false,
            hang_seek: false,
            duration,
            frame: VideoFrame::solid(64, 36, [90, 90, 90, 255]),
            releases: Arc::new(AtomicUsize::new(0)),
            seeked_to: None,
        }
    }

    pub fn release_count(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlobVideoSource for MockBlobVideoSource {
    async fn load(&mut self, blob: &RecordingBlob) -> Result<(), ThumbnailError> {
        if self.fail_load || blob.is_empty() {
            return Err(ThumbnailError::LoadFailed(
                "malformed container".to_string(),
            ));
        }
        Ok(())
    }

    fn duration_secs(&self) -> f64 {
        self.duration
    }

    async fn seek_to(&mut self, secs: f64) -> Result<VideoFrame, ThumbnailError> {
        if self.hang_seek {
            // Never completes; the extractor's timeout must fire.
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        }
        self.seeked_to = Some(secs);
        Ok(self.frame.clone())
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}
