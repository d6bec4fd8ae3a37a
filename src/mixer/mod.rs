//! Audio mixer
//!
//! Combines the audio tracks gathered at recording start (system audio,
//! microphone) into what the encoder receives: nothing, the single track
//! passed through untouched, or one mixed track produced by an audio
//! graph. The graph is created lazily, only when two or more tracks need
//! mixing, and must be closed by its owner when recording stops.

use crate::media::{AudioChunk, MediaTrack, TrackKind, TrackSettings};
use anyhow::{bail, Result};
use std::collections::VecDeque;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

/// Audio routed to the encoder for one recording.
pub enum MixedAudio {
    /// No audio sources: the encoder gets no audio track.
    Silent,
    /// A single source (or mix fallback) passed through directly.
    PassThrough(Vec<MediaTrack>),
    /// Two or more sources mixed down to one track by an owned graph.
    Mixed { track: MediaTrack, graph: AudioGraph },
}

impl MixedAudio {
    /// Tracks to attach to the combined encoder stream.
    pub fn tracks(&self) -> Vec<MediaTrack> {
        match self {
            MixedAudio::Silent => Vec::new(),
            MixedAudio::PassThrough(tracks) => tracks.clone(),
            MixedAudio::Mixed { track, .. } => vec![track.clone()],
        }
    }

    /// Close the mixing graph, if one was created. Idempotent.
    pub fn close(&mut self) {
        if let MixedAudio::Mixed { graph, .. } = self {
            graph.close();
        }
    }
}

/// Route the collected audio tracks to the encoder.
///
/// Graph construction failure falls back to passing all tracks through
/// rather than failing the recording.
pub fn mix(tracks: Vec<MediaTrack>) -> MixedAudio {
    match tracks.len() {
        0 => MixedAudio::Silent,
        1 => MixedAudio::PassThrough(tracks),
        n => {
            let dest = MediaTrack::audio("mixed", TrackSettings::default());
            match AudioGraph::connect(tracks.clone(), dest.clone()) {
                Ok(graph) => {
                    tracing::info!("mixed {n} audio tracks into 1");
                    MixedAudio::Mixed { track: dest, graph }
                }
                Err(err) => {
                    tracing::warn!("audio mixing failed, using tracks directly: {err:#}");
                    MixedAudio::PassThrough(tracks)
                }
            }
        }
    }
}

/// Owned audio-processing graph: one input node per source, all connected
/// to a single destination track.
pub struct AudioGraph {
    task: Option<JoinHandle<()>>,
}

impl AudioGraph {
    fn connect(sources: Vec<MediaTrack>, dest: MediaTrack) -> Result<AudioGraph> {
        // Wire every input node up front so no chunk published between
        // construction and the first poll of the graph task is lost.
        let mut inputs = Vec::with_capacity(sources.len());
        for source in &sources {
            if source.kind() != TrackKind::Audio {
                bail!("cannot mix non-audio track {}", source.id());
            }
            if source.is_stopped() {
                bail!("cannot mix stopped track {}", source.id());
            }
            inputs.push((source.subscribe_samples(), source.ended()));
        }

        let task = tokio::spawn(run_graph(inputs, dest));
        Ok(AudioGraph { task: Some(task) })
    }

    /// Tear the graph down. Idempotent; must be called when recording
    /// stops so the graph does not outlive its owning session.
    pub fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            tracing::debug!("audio graph closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.task.is_none()
    }
}

impl Drop for AudioGraph {
    fn drop(&mut self) {
        self.close();
    }
}

enum SourceMsg {
    Chunk(usize, AudioChunk),
    Closed(usize),
}

type SourceInput = (
    tokio::sync::broadcast::Receiver<AudioChunk>,
    tokio::sync::watch::Receiver<bool>,
);

/// Pump every source into per-source buffers and emit one summed chunk
/// whenever all live sources have data.
async fn run_graph(inputs: Vec<SourceInput>, dest: MediaTrack) {
    let source_count = inputs.len();
    let (tx, mut rx) = mpsc::channel::<SourceMsg>(64);
    let mut forwarders = JoinSet::new();

    for (index, (mut samples, mut ended)) in inputs.into_iter().enumerate() {
        let tx = tx.clone();
        forwarders.spawn(async move {
            loop {
                tokio::select! {
                    chunk = samples.recv() => match chunk {
                        Ok(chunk) => {
                            if tx.send(SourceMsg::Chunk(index, chunk)).await.is_err() {
                                return;
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    },
                    _ = ended.changed() => break,
                }
            }
            let _ = tx.send(SourceMsg::Closed(index)).await;
        });
    }
    drop(tx);

    let mut buffers: Vec<VecDeque<AudioChunk>> = (0..source_count).map(|_| VecDeque::new()).collect();
    let mut live: Vec<bool> = vec![true; source_count];

    while let Some(msg) = rx.recv().await {
        match msg {
            SourceMsg::Chunk(index, chunk) => buffers[index].push_back(chunk),
            SourceMsg::Closed(index) => live[index] = false,
        }

        // Mix whenever every still-live source has a pending chunk.
        loop {
            let ready = buffers
                .iter()
                .zip(&live)
                .all(|(buf, live)| !*live || !buf.is_empty());
            let any = buffers.iter().any(|buf| !buf.is_empty());
            if !ready || !any {
                break;
            }
            let inputs: Vec<AudioChunk> = buffers
                .iter_mut()
                .filter_map(|buf| buf.pop_front())
                .collect();
            dest.push_samples(sum_chunks(&inputs));
        }

        if live.iter().all(|l| !*l) && buffers.iter().all(|b| b.is_empty()) {
            break;
        }
    }

    forwarders.shutdown().await;
    tracing::debug!("audio graph drained");
}

/// Sum sample chunks with clipping; shorter chunks are zero-padded.
fn sum_chunks(inputs: &[AudioChunk]) -> AudioChunk {
    let len = inputs.iter().map(AudioChunk::len).max().unwrap_or(0);
    let mut samples = vec![0.0f32; len];
    for chunk in inputs {
        for (i, s) in chunk.samples.iter().enumerate() {
            samples[i] += s;
        }
    }
    for s in &mut samples {
        *s = s.clamp(-1.0, 1.0);
    }
    AudioChunk::new(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn audio_track(label: &str) -> MediaTrack {
        MediaTrack::audio(label, TrackSettings::default())
    }

    #[test]
    fn test_zero_tracks_is_silent() {
        let mixed = mix(Vec::new());
        assert!(mixed.tracks().is_empty());
        assert!(matches!(mixed, MixedAudio::Silent));
    }

    #[tokio::test]
    async fn test_single_track_passes_through_unchanged() {
        let track = audio_track("mic");
        let mixed = mix(vec![track.clone()]);
        let out = mixed.tracks();
        assert_eq!(out.len(), 1);
        assert!(out[0].same_as(&track));
    }

    #[tokio::test]
    async fn test_two_tracks_mix_into_one_new_track() {
        let system = audio_track("system");
        let mic = audio_track("mic");
        let mut mixed = mix(vec![system.clone(), mic.clone()]);

        let out = mixed.tracks();
        assert_eq!(out.len(), 1);
        assert!(!out[0].same_as(&system));
        assert!(!out[0].same_as(&mic));

        let mut rx = out[0].subscribe_samples();
        system.push_samples(AudioChunk::new(vec![0.25, 0.25]));
        mic.push_samples(AudioChunk::new(vec![0.5]));

        let chunk = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("mixed chunk emitted")
            .unwrap();
        assert_eq!(chunk.samples, vec![0.75, 0.25]);

        mixed.close();
        mixed.close();
    }

    #[tokio::test]
    async fn test_mix_fallback_when_graph_construction_fails() {
        let stopped = audio_track("dead");
        stopped.stop();
        let live = audio_track("mic");

        let mixed = mix(vec![stopped.clone(), live.clone()]);
        match mixed {
            MixedAudio::PassThrough(tracks) => assert_eq!(tracks.len(), 2),
            _ => panic!("expected pass-through fallback"),
        }
    }

    #[test]
    fn test_sum_clips_and_pads() {
        let out = sum_chunks(&[
            AudioChunk::new(vec![0.9, -0.9]),
            AudioChunk::new(vec![0.9, -0.9, 0.1]),
        ]);
        assert_eq!(out.samples, vec![1.0, -1.0, 0.1]);
    }

    #[tokio::test]
    async fn test_graph_close_is_idempotent() {
        let a = audio_track("a");
        let b = audio_track("b");
        let mut mixed = mix(vec![a, b]);
        if let MixedAudio::Mixed { graph, .. } = &mut mixed {
            assert!(!graph.is_closed());
            graph.close();
            assert!(graph.is_closed());
            graph.close();
        } else {
            panic!("expected mixed output");
        }
    }
}
