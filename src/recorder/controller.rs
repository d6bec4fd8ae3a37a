//! Recording controller
//!
//! Orchestrates the capture session, compositor, mixer, and encoder
//! through the record/pause/resume/stop/discard lifecycle, accumulates
//! encoded data segments, and produces the final output blob plus an
//! optional thumbnail.

use super::encoder::{select_mime_type, EncoderOptions, EncoderState, MediaEncoder};
use super::state::{next_state, RecorderInput, RecorderState, RecordingBlob, VideoSource};
use crate::capture::{CaptureConfig, CaptureSession};
use crate::compositor::{Compositor, CompositorConfig, RECORDING_FPS};
use crate::media::{MediaBackend, MediaStream, MediaTrack};
use crate::mixer::{self, MixedAudio};
use crate::thumbnail;
use crate::utils::error::{CaptureError, RecorderError};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// How often the elapsed duration is sampled for display.
pub const PROGRESS_INTERVAL: Duration = Duration::from_millis(100);

/// Seconds the UI counts down before recording starts.
pub const COUNTDOWN_SECS: u32 = 3;

/// Events emitted during recording.
#[derive(Debug, Clone)]
pub enum ControllerEvent {
    /// Recording started.
    Started,
    /// Recording stopped; the output blob is available.
    Stopped,
    /// Recording paused.
    Paused,
    /// Recording resumed.
    Resumed,
    /// Non-fatal error surfaced to the UI.
    Error(String),
    /// Elapsed recording duration in seconds.
    Progress(f64),
}

/// Wall-clock duration accounting: advances only while recording, frozen
/// across pause segments.
#[derive(Debug, Default)]
struct DurationTimer {
    started_at: Option<Instant>,
    base_secs: f64,
}

impl DurationTimer {
    fn elapsed_secs(&self) -> f64 {
        let running = self
            .started_at
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        self.base_secs + running
    }

    fn start_segment(&mut self) {
        self.started_at = Some(Instant::now());
    }

    fn freeze(&mut self) {
        if let Some(started) = self.started_at.take() {
            self.base_secs += started.elapsed().as_secs_f64();
        }
    }

    fn reset(&mut self) {
        self.started_at = None;
        self.base_secs = 0.0;
    }
}

/// Drives one recording session end to end.
pub struct RecordingController {
    state: Arc<RwLock<RecorderState>>,
    session: CaptureSession,
    encoder: Box<dyn MediaEncoder>,

    video_source: Option<VideoSource>,
    compositor: Option<Compositor>,
    audio: Option<MixedAudio>,

    chunks: Arc<Mutex<Vec<Vec<u8>>>>,
    drain: Option<JoinHandle<()>>,
    progress: Option<JoinHandle<()>>,
    timer: Arc<Mutex<DurationTimer>>,

    mime_type: String,
    blob: Option<RecordingBlob>,
    thumbnail: Option<String>,
    last_error: Option<String>,

    event_tx: broadcast::Sender<ControllerEvent>,
}

impl RecordingController {
    pub fn new(
        backend: Arc<dyn MediaBackend>,
        encoder: Box<dyn MediaEncoder>,
        config: CaptureConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(RecorderState::Idle)),
            session: CaptureSession::new(backend, config),
            encoder,
            video_source: None,
            compositor: None,
            audio: None,
            chunks: Arc::new(Mutex::new(Vec::new())),
            drain: None,
            progress: None,
            timer: Arc::new(Mutex::new(DurationTimer::default())),
            mime_type: super::encoder::DEFAULT_MIME_TYPE.to_string(),
            blob: None,
            thumbnail: None,
            last_error: None,
            event_tx,
        }
    }

    pub fn state(&self) -> RecorderState {
        *self.state.read()
    }

    /// Subscribe to recording events.
    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.event_tx.subscribe()
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn config_mut(&mut self) -> &mut CaptureConfig {
        self.session.config_mut()
    }

    /// Final output blob, once stopped.
    pub fn blob(&self) -> Option<&RecordingBlob> {
        self.blob.as_ref()
    }

    /// Thumbnail data URL captured at stop time, if any.
    pub fn thumbnail(&self) -> Option<&str> {
        self.thumbnail.as_deref()
    }

    /// The resolved container type for the current/last recording.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Which video stream fed the encoder, resolved at recording start.
    pub fn video_source(&self) -> Option<VideoSource> {
        self.video_source
    }

    /// Last user-visible error message, if any.
    pub fn error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Elapsed recording duration in seconds; frozen while paused.
    pub fn duration_secs(&self) -> f64 {
        self.timer.lock().elapsed_secs()
    }

    fn apply(&self, input: RecorderInput) -> Result<RecorderState, RecorderError> {
        let mut state = self.state.write();
        match next_state(*state, input) {
            Some(next) => {
                tracing::debug!(from = %*state, to = %next, ?input, "state transition");
                *state = next;
                Ok(next)
            }
            None => Err(RecorderError::InvalidTransition {
                state: *state,
                input,
            }),
        }
    }

    fn check(&self, input: RecorderInput) -> Result<(), RecorderError> {
        let state = *self.state.read();
        match next_state(state, input) {
            Some(_) => Ok(()),
            None => Err(RecorderError::InvalidTransition { state, input }),
        }
    }

    /// Acquire the screen stream and move to `PREVIEWING`. Microphone and
    /// webcam follow per the pre-selected toggles; their failures are
    /// non-fatal.
    pub async fn start_screen_capture(&mut self) -> Result<(), RecorderError> {
        self.check(RecorderInput::ScreenAcquired)?;
        self.last_error = None;

        match self.session.acquire_screen().await {
            Ok(_) => {}
            Err(err) => {
                self.last_error = Some(match &err {
                    CaptureError::PermissionDenied(_) => "Screen sharing was denied".to_string(),
                    _ => "Failed to capture screen".to_string(),
                });
                let _ = self.event_tx.send(ControllerEvent::Error(err.to_string()));
                return Err(err.into());
            }
        }

        self.apply(RecorderInput::ScreenAcquired)?;

        if self.session.config().include_microphone {
            self.enable_microphone().await;
        }
        if self.session.config().include_webcam {
            self.enable_webcam().await;
        }
        Ok(())
    }

    /// Acquire the microphone per the current config. Non-fatal: on
    /// failure recording proceeds without narration audio.
    pub async fn enable_microphone(&mut self) -> bool {
        self.session.config_mut().include_microphone = true;
        match self.session.acquire_microphone().await {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!("failed to start microphone: {err}");
                false
            }
        }
    }

    pub fn disable_microphone(&mut self) {
        self.session.config_mut().include_microphone = false;
        self.session.release_microphone();
    }

    /// Acquire the webcam per the current config. Non-fatal: reports an
    /// error but does not abort the session.
    pub async fn enable_webcam(&mut self) -> bool {
        self.session.config_mut().include_webcam = true;
        match self.session.acquire_webcam().await {
            Ok(_) => true,
            Err(err) => {
                tracing::warn!("failed to start webcam: {err}");
                self.last_error = Some("Failed to access webcam".to_string());
                let _ = self.event_tx.send(ControllerEvent::Error(err.to_string()));
                false
            }
        }
    }

    pub fn disable_webcam(&mut self) {
        self.session.config_mut().include_webcam = false;
        self.session.release_webcam();
    }

    /// Enter the countdown the UI renders before recording starts.
    pub fn begin_countdown(&mut self) -> Result<(), RecorderError> {
        self.apply(RecorderInput::CountdownStarted)?;
        Ok(())
    }

    /// Begin encoding: resolve the container type, pick the video source,
    /// assemble the final audio, and start the encoder with a 1s
    /// timeslice.
    pub async fn start_recording(&mut self) -> Result<(), RecorderError> {
        self.check(RecorderInput::StartRequested)?;

        let screen = self
            .session
            .screen()
            .cloned()
            .ok_or(RecorderError::NoScreenStream)?;
        let screen_video = self
            .session
            .screen_video_track()
            .ok_or(RecorderError::NoScreenStream)?;

        self.mime_type = select_mime_type(self.encoder.as_ref());

        // Which video stream feeds the encoder: the compositor's canvas
        // when the overlay is active, the raw screen stream otherwise.
        let config = self.session.config().clone();
        let (video_track, source) = match self.session.webcam_video_track() {
            Some(webcam) if config.include_webcam => {
                let compositor = Compositor::start(
                    screen_video,
                    webcam,
                    CompositorConfig {
                        frame_rate: RECORDING_FPS,
                        position: config.overlay_position,
                        diameter: config.overlay_diameter,
                        ..CompositorConfig::default()
                    },
                );
                let track = compositor.output_track();
                self.compositor = Some(compositor);
                (track, VideoSource::CompositedCanvas)
            }
            _ => (screen_video, VideoSource::RawScreen),
        };
        self.video_source = Some(source);

        // Collect system audio and narration, mixed down when both exist.
        let mut audio_tracks: Vec<MediaTrack> = screen.audio_tracks();
        if let Some(mic) = self.session.microphone() {
            audio_tracks.extend(mic.audio_tracks());
        }
        tracing::info!(
            audio_sources = audio_tracks.len(),
            source = ?source,
            mime = %self.mime_type,
            "starting recording"
        );
        let mixed = mixer::mix(audio_tracks);

        let mut tracks = vec![video_track];
        tracks.extend(mixed.tracks());
        let combined = MediaStream::new(tracks);

        self.chunks.lock().clear();
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
        if let Err(err) =
            self.encoder
                .start(combined, EncoderOptions::new(self.mime_type.clone()), tx)
        {
            // Roll back the resources assembled for this attempt.
            if let Some(mut compositor) = self.compositor.take() {
                compositor.stop();
            }
            let mut mixed = mixed;
            mixed.close();
            self.video_source = None;
            return Err(err);
        }
        self.audio = Some(mixed);

        let chunks = Arc::clone(&self.chunks);
        self.drain = Some(tokio::spawn(async move {
            while let Some(segment) = rx.recv().await {
                if !segment.is_empty() {
                    chunks.lock().push(segment);
                }
            }
        }));

        {
            let mut timer = self.timer.lock();
            timer.reset();
            timer.start_segment();
        }
        self.spawn_progress_task();

        self.apply(RecorderInput::StartRequested)?;
        let _ = self.event_tx.send(ControllerEvent::Started);
        Ok(())
    }

    fn spawn_progress_task(&mut self) {
        let state = Arc::clone(&self.state);
        let timer = Arc::clone(&self.timer);
        let event_tx = self.event_tx.clone();
        self.progress = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(PROGRESS_INTERVAL);
            loop {
                interval.tick().await;
                match *state.read() {
                    RecorderState::Recording => {
                        let _ = event_tx.send(ControllerEvent::Progress(timer.lock().elapsed_secs()));
                    }
                    RecorderState::Paused => {}
                    _ => break,
                }
            }
        }));
    }

    /// Suspend encoding and freeze the duration timer.
    pub fn pause(&mut self) -> Result<(), RecorderError> {
        self.check(RecorderInput::PauseRequested)?;
        self.encoder.pause()?;
        self.timer.lock().freeze();
        self.apply(RecorderInput::PauseRequested)?;
        let _ = self.event_tx.send(ControllerEvent::Paused);
        tracing::info!("recording paused");
        Ok(())
    }

    /// Resume encoding, accumulating duration from the frozen baseline.
    pub fn resume(&mut self) -> Result<(), RecorderError> {
        self.check(RecorderInput::ResumeRequested)?;
        self.encoder.resume()?;
        self.timer.lock().start_segment();
        self.apply(RecorderInput::ResumeRequested)?;
        let _ = self.event_tx.send(ControllerEvent::Resumed);
        tracing::info!("recording resumed");
        Ok(())
    }

    /// Stop recording: capture a live thumbnail while streams are still
    /// active, finalize the encoder, and produce the output blob. Streams
    /// stay alive so the user can preview the result or retry.
    pub async fn stop(&mut self) -> Result<(), RecorderError> {
        self.finalize(RecorderInput::StopRequested).await
    }

    async fn finalize(&mut self, input: RecorderInput) -> Result<(), RecorderError> {
        self.check(input)?;

        // Freeze the duration before any stop processing so finalization
        // latency never counts as recorded time.
        self.timer.lock().freeze();

        // Thumbnail first, while the source still has frames.
        let thumb_track = match &self.compositor {
            Some(compositor) => Some(compositor.output_track()),
            None => self.session.screen_video_track(),
        };
        self.thumbnail = thumb_track.as_ref().and_then(thumbnail::capture_live);

        self.encoder.stop()?;
        if let Some(drain) = self.drain.take() {
            let _ = drain.await;
        }

        let segments = std::mem::take(&mut *self.chunks.lock());
        let blob = RecordingBlob::from_chunks(segments, self.mime_type.clone());
        tracing::info!(
            size_bytes = blob.len(),
            mime = %blob.mime_type(),
            "recording blob created"
        );
        self.blob = Some(blob);

        if let Some(progress) = self.progress.take() {
            progress.abort();
        }
        if let Some(mut audio) = self.audio.take() {
            audio.close();
        }
        if let Some(mut compositor) = self.compositor.take() {
            compositor.stop();
        }

        self.apply(input)?;
        let _ = self.event_tx.send(ControllerEvent::Stopped);
        Ok(())
    }

    /// Discard everything: clear the blob and thumbnail, reset duration,
    /// and tear the whole session down. Valid from any state.
    pub fn discard(&mut self) {
        if let Some(progress) = self.progress.take() {
            progress.abort();
        }
        if self.encoder.state() != EncoderState::Inactive {
            if let Err(err) = self.encoder.stop() {
                tracing::warn!("encoder stop during discard failed: {err}");
            }
        }
        if let Some(drain) = self.drain.take() {
            drain.abort();
        }
        if let Some(mut audio) = self.audio.take() {
            audio.close();
        }
        if let Some(mut compositor) = self.compositor.take() {
            compositor.stop();
        }
        self.chunks.lock().clear();
        self.blob = None;
        self.thumbnail = None;
        self.video_source = None;
        self.timer.lock().reset();
        self.session.teardown();

        // Discard is valid from every state.
        let _ = self.apply(RecorderInput::Discarded);
        tracing::info!("recording discarded");
    }

    /// The blob was handed to the upload boundary.
    pub fn begin_upload(&mut self) -> Result<(), RecorderError> {
        self.apply(RecorderInput::UploadStarted)?;
        Ok(())
    }

    /// Upload finished: full teardown of all streams.
    pub fn finish_upload(&mut self) -> Result<(), RecorderError> {
        self.apply(RecorderInput::UploadFinished)?;
        self.session.teardown();
        Ok(())
    }

    /// Upload failed: back to `STOPPED`, blob retained for retry.
    pub fn fail_upload(&mut self, message: impl Into<String>) -> Result<(), RecorderError> {
        self.apply(RecorderInput::UploadFailed)?;
        let message = message.into();
        self.last_error = Some(message.clone());
        let _ = self.event_tx.send(ControllerEvent::Error(message));
        Ok(())
    }

    /// React to the screen track ending underneath us (the platform's
    /// "stop sharing" affordance).
    pub async fn handle_screen_ended(&mut self) {
        match self.state() {
            RecorderState::Recording => {
                tracing::info!("screen sharing ended while recording, stopping gracefully");
                if let Err(err) = self.finalize(RecorderInput::ScreenEnded).await {
                    tracing::warn!("graceful stop after screen end failed: {err}");
                    let _ = self.event_tx.send(ControllerEvent::Error(err.to_string()));
                }
            }
            RecorderState::Previewing | RecorderState::Countdown | RecorderState::Paused => {
                tracing::info!("screen sharing ended, tearing down session");
                self.discard();
            }
            _ => {}
        }
    }
}

/// Watch the current screen video track and dispatch
/// [`RecordingController::handle_screen_ended`] when it ends. Returns
/// `None` when no screen stream is active.
pub async fn watch_screen_ended(
    controller: Arc<tokio::sync::Mutex<RecordingController>>,
) -> Option<JoinHandle<()>> {
    let mut ended = {
        let ctrl = controller.lock().await;
        ctrl.session.screen_video_track()?.ended()
    };
    Some(tokio::spawn(async move {
        while !*ended.borrow() {
            if ended.changed().await.is_err() {
                return;
            }
        }
        controller.lock().await.handle_screen_ended().await;
    }))
}
