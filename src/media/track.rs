//! Media streams and tracks
//!
//! Models the platform's stream/track objects: a track is a shared handle
//! to one video or audio source, stopped exactly once, with an observable
//! end-of-stream signal. Video tracks carry a latest-frame-wins cell that
//! renderers sample (no frame queueing); audio tracks fan out sample
//! chunks over a broadcast channel.

use super::frame::{AudioChunk, VideoFrame};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use uuid::Uuid;

/// What a track carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

/// Negotiated track settings, as reported by the producing backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSettings {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frame_rate: Option<f64>,
    pub device_id: Option<String>,
}

/// Latest-frame-wins buffer. The producer publishes, renderers sample the
/// most recent frame; ticks that outrun the producer re-read the same frame.
#[derive(Debug)]
struct FrameCell {
    latest: Mutex<Option<VideoFrame>>,
    published: AtomicU64,
}

impl FrameCell {
    fn new() -> Self {
        Self {
            latest: Mutex::new(None),
            published: AtomicU64::new(0),
        }
    }
}

#[derive(Debug)]
struct TrackShared {
    id: String,
    kind: TrackKind,
    label: String,
    settings: TrackSettings,
    stopped: AtomicBool,
    ended_tx: watch::Sender<bool>,
    frames: FrameCell,
    audio_tx: broadcast::Sender<AudioChunk>,
}

/// Shared handle to a single media track.
///
/// Clones refer to the same underlying track; stopping any clone stops
/// them all.
#[derive(Debug, Clone)]
pub struct MediaTrack {
    shared: Arc<TrackShared>,
}

impl MediaTrack {
    fn new(kind: TrackKind, label: impl Into<String>, settings: TrackSettings) -> Self {
        let (ended_tx, _) = watch::channel(false);
        let (audio_tx, _) = broadcast::channel(64);
        Self {
            shared: Arc::new(TrackShared {
                id: Uuid::new_v4().to_string(),
                kind,
                label: label.into(),
                settings,
                stopped: AtomicBool::new(false),
                ended_tx,
                frames: FrameCell::new(),
                audio_tx,
            }),
        }
    }

    pub fn video(label: impl Into<String>, settings: TrackSettings) -> Self {
        Self::new(TrackKind::Video, label, settings)
    }

    pub fn audio(label: impl Into<String>, settings: TrackSettings) -> Self {
        Self::new(TrackKind::Audio, label, settings)
    }

    pub fn id(&self) -> &str {
        &self.shared.id
    }

    pub fn kind(&self) -> TrackKind {
        self.shared.kind
    }

    pub fn label(&self) -> &str {
        &self.shared.label
    }

    pub fn settings(&self) -> &TrackSettings {
        &self.shared.settings
    }

    /// Stop the track. Idempotent: the end-of-stream signal fires once.
    pub fn stop(&self) {
        if !self.shared.stopped.swap(true, Ordering::SeqCst) {
            tracing::debug!(track = %self.shared.id, label = %self.shared.label, "track stopped");
            let _ = self.shared.ended_tx.send(true);
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::SeqCst)
    }

    /// Subscribe to the end-of-stream signal. The receiver observes `true`
    /// once the track has been stopped, whether locally or by the platform
    /// (e.g. the browser's "stop sharing" affordance).
    pub fn ended(&self) -> watch::Receiver<bool> {
        self.shared.ended_tx.subscribe()
    }

    /// Publish a decoded frame. Dropped silently once the track is stopped.
    pub fn push_frame(&self, frame: VideoFrame) {
        if self.is_stopped() {
            return;
        }
        *self.shared.frames.latest.lock() = Some(frame);
        self.shared.frames.published.fetch_add(1, Ordering::SeqCst);
    }

    /// Sample the most recently decoded frame, if any.
    pub fn latest_frame(&self) -> Option<VideoFrame> {
        self.shared.frames.latest.lock().clone()
    }

    /// Total frames published so far (the readiness signal renderers use).
    pub fn frames_decoded(&self) -> u64 {
        self.shared.frames.published.load(Ordering::SeqCst)
    }

    /// Publish an audio chunk. Dropped silently once the track is stopped
    /// or when nobody is listening.
    pub fn push_samples(&self, chunk: AudioChunk) {
        if self.is_stopped() {
            return;
        }
        let _ = self.shared.audio_tx.send(chunk);
    }

    pub fn subscribe_samples(&self) -> broadcast::Receiver<AudioChunk> {
        self.shared.audio_tx.subscribe()
    }

    /// Whether two handles refer to the same underlying track.
    pub fn same_as(&self, other: &MediaTrack) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl PartialEq for MediaTrack {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

/// An ordered collection of tracks produced by one acquisition.
#[derive(Debug, Clone)]
pub struct MediaStream {
    id: String,
    tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            tracks,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn video_tracks(&self) -> Vec<MediaTrack> {
        self.tracks
            .iter()
            .filter(|t| t.kind() == TrackKind::Video)
            .cloned()
            .collect()
    }

    pub fn audio_tracks(&self) -> Vec<MediaTrack> {
        self.tracks
            .iter()
            .filter(|t| t.kind() == TrackKind::Audio)
            .cloned()
            .collect()
    }

    /// Stop every track. Idempotent.
    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }

    /// Number of tracks that have not been stopped yet.
    pub fn live_track_count(&self) -> usize {
        self.tracks.iter().filter(|t| !t.is_stopped()).count()
    }
}
