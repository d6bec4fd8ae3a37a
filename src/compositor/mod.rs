//! Canvas compositor
//!
//! While recording with the webcam overlay enabled, draws the screen and
//! a circular webcam crop onto an off-screen canvas at a fixed rate and
//! exposes the canvas as a derived video track. The tick runs on a
//! dedicated runtime task so it is not coupled to any UI scheduling
//! domain that might be throttled while the page is in the background.

mod draw;

pub use draw::{compose, overlay_origin};

use crate::media::{MediaStream, MediaTrack, TrackSettings};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Webcam overlay diameter in pixels.
pub const WEBCAM_DIAMETER: u32 = 180;
/// Distance of the overlay from the canvas edges.
pub const OVERLAY_PADDING: u32 = 20;
/// Width of the white ring drawn around the webcam crop.
pub const RING_WIDTH: u32 = 3;
/// Canvas size used when the screen track reports no resolution.
pub const FALLBACK_WIDTH: u32 = 1920;
pub const FALLBACK_HEIGHT: u32 = 1080;
/// Frame rate of the composited output.
pub const RECORDING_FPS: u32 = 30;

/// Corner the webcam overlay is pinned to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
}

/// Compositor settings, resolved at recording start.
#[derive(Debug, Clone)]
pub struct CompositorConfig {
    pub frame_rate: u32,
    pub position: OverlayPosition,
    pub diameter: u32,
    pub padding: u32,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            frame_rate: RECORDING_FPS,
            position: OverlayPosition::default(),
            diameter: WEBCAM_DIAMETER,
            padding: OVERLAY_PADDING,
        }
    }
}

/// Live compositing loop over a screen track and a webcam track.
///
/// Borrows both source tracks for sampling only; it never stops them.
/// The output track is owned by the compositor's output stream.
pub struct Compositor {
    output: MediaStream,
    tick: Option<JoinHandle<()>>,
}

impl Compositor {
    /// Start the frame loop and return the running compositor.
    pub fn start(screen: MediaTrack, webcam: MediaTrack, config: CompositorConfig) -> Self {
        let width = screen.settings().width.unwrap_or(FALLBACK_WIDTH);
        let height = screen.settings().height.unwrap_or(FALLBACK_HEIGHT);

        let output_track = MediaTrack::video(
            "canvas",
            TrackSettings {
                width: Some(width),
                height: Some(height),
                frame_rate: Some(config.frame_rate as f64),
                device_id: None,
            },
        );
        let output = MediaStream::new(vec![output_track.clone()]);

        tracing::info!(
            width,
            height,
            fps = config.frame_rate,
            position = ?config.position,
            "compositor started"
        );

        let tick = tokio::spawn(async move {
            // Clamp to 1ms: a zero-period interval is invalid.
            let period = Duration::from_millis((1000 / config.frame_rate.max(1)).max(1) as u64);
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                if screen.is_stopped() {
                    break;
                }
                let Some(screen_frame) = screen.latest_frame() else {
                    continue;
                };
                // Webcam drawn only once it has a decoded frame.
                let webcam_frame = if webcam.frames_decoded() > 0 {
                    webcam.latest_frame()
                } else {
                    None
                };
                let frame = compose(&screen_frame, webcam_frame.as_ref(), width, height, &config);
                output_track.push_frame(frame);
            }
        });

        Self {
            output,
            tick: Some(tick),
        }
    }

    /// The canvas-derived stream fed to the encoder.
    pub fn output_stream(&self) -> &MediaStream {
        &self.output
    }

    /// The canvas-derived video track.
    pub fn output_track(&self) -> MediaTrack {
        self.output.video_tracks().into_iter().next().expect("compositor output has a video track")
    }

    /// Stop the tick loop and the output track. Idempotent. Source tracks
    /// are left untouched.
    pub fn stop(&mut self) {
        if let Some(task) = self.tick.take() {
            task.abort();
            self.output.stop_all();
            tracing::debug!("compositor stopped");
        }
    }
}

impl Drop for Compositor {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::VideoFrame;

    fn track_with_frame(w: u32, h: u32, rgba: [u8; 4]) -> MediaTrack {
        let track = MediaTrack::video(
            "test",
            TrackSettings {
                width: Some(w),
                height: Some(h),
                ..TrackSettings::default()
            },
        );
        track.push_frame(VideoFrame::solid(w, h, rgba));
        track
    }

    #[tokio::test]
    async fn test_output_uses_screen_resolution() {
        let screen = track_with_frame(640, 360, [8, 8, 8, 255]);
        let webcam = track_with_frame(320, 320, [200, 0, 0, 255]);
        let compositor = Compositor::start(screen, webcam, CompositorConfig::default());

        let settings = compositor.output_track().settings().clone();
        assert_eq!(settings.width, Some(640));
        assert_eq!(settings.height, Some(360));
    }

    #[tokio::test]
    async fn test_ticks_publish_composited_frames() {
        let screen = track_with_frame(64, 36, [8, 8, 8, 255]);
        let webcam = track_with_frame(32, 32, [200, 0, 0, 255]);
        let config = CompositorConfig {
            frame_rate: 100,
            diameter: 10,
            padding: 2,
            ..CompositorConfig::default()
        };
        let mut compositor = Compositor::start(screen, webcam, config);
        let output = compositor.output_track();

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(output.frames_decoded() >= 2);

        let frame = output.latest_frame().unwrap();
        // Screen fill everywhere outside the overlay corner.
        assert_eq!(frame.pixel(0, 0), [8, 8, 8, 255]);

        compositor.stop();
        let after = output.frames_decoded();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(output.frames_decoded(), after);
        assert!(output.is_stopped());
    }

    #[tokio::test]
    async fn test_frame_rate_above_1000_still_ticks() {
        let screen = track_with_frame(64, 36, [8, 8, 8, 255]);
        let webcam = track_with_frame(32, 32, [200, 0, 0, 255]);
        let config = CompositorConfig {
            frame_rate: 5000,
            diameter: 10,
            padding: 2,
            ..CompositorConfig::default()
        };
        let compositor = Compositor::start(screen, webcam, config);
        let output = compositor.output_track();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(output.frames_decoded() >= 1);
    }

    #[tokio::test]
    async fn test_stop_does_not_touch_source_tracks() {
        let screen = track_with_frame(64, 36, [8, 8, 8, 255]);
        let webcam = track_with_frame(32, 32, [200, 0, 0, 255]);
        let mut compositor =
            Compositor::start(screen.clone(), webcam.clone(), CompositorConfig::default());
        compositor.stop();
        compositor.stop();

        assert!(!screen.is_stopped());
        assert!(!webcam.is_stopped());
    }
}
