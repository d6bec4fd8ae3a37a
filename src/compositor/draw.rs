//! Frame composition
//!
//! Pure pixel work: scale the screen frame to fill the canvas, then clip
//! the webcam frame to a circle at the configured corner and outline it
//! with a white ring.

use super::{CompositorConfig, OverlayPosition};
use crate::media::VideoFrame;

const RING_COLOR: [u8; 4] = [255, 255, 255, 255];

/// Top-left corner of the overlay square for a given canvas size.
pub fn overlay_origin(
    position: OverlayPosition,
    canvas_width: u32,
    canvas_height: u32,
    size: u32,
    padding: u32,
) -> (u32, u32) {
    let right = canvas_width.saturating_sub(size + padding);
    let bottom = canvas_height.saturating_sub(size + padding);
    match position {
        OverlayPosition::TopLeft => (padding, padding),
        OverlayPosition::TopRight => (right, padding),
        OverlayPosition::BottomLeft => (padding, bottom),
        OverlayPosition::BottomRight => (right, bottom),
    }
}

/// Compose one output frame from the screen frame and, when available,
/// the webcam frame.
pub fn compose(
    screen: &VideoFrame,
    webcam: Option<&VideoFrame>,
    canvas_width: u32,
    canvas_height: u32,
    config: &CompositorConfig,
) -> VideoFrame {
    let mut canvas = screen.scale_to(canvas_width, canvas_height);
    if let Some(cam) = webcam {
        draw_circular_overlay(&mut canvas, cam, config);
    }
    canvas
}

fn draw_circular_overlay(canvas: &mut VideoFrame, cam: &VideoFrame, config: &CompositorConfig) {
    let size = config.diameter;
    let (x0, y0) = overlay_origin(
        config.position,
        canvas.width,
        canvas.height,
        size,
        config.padding,
    );
    let scaled = cam.scale_to(size, size);

    let radius = size as f64 / 2.0;
    let ring = super::RING_WIDTH as f64;
    let cx = x0 as f64 + radius;
    let cy = y0 as f64 + radius;
    // The ring straddles the clip edge, half inside, half outside.
    let outer = radius + ring / 2.0;
    let inner = radius - ring / 2.0;

    let y_end = (y0 + size + super::RING_WIDTH).min(canvas.height);
    let x_end = (x0 + size + super::RING_WIDTH).min(canvas.width);
    for y in y0.saturating_sub(super::RING_WIDTH)..y_end {
        for x in x0.saturating_sub(super::RING_WIDTH)..x_end {
            let dx = x as f64 + 0.5 - cx;
            let dy = y as f64 + 0.5 - cy;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist <= inner {
                let sx = (x - x0).min(size - 1);
                let sy = (y - y0).min(size - 1);
                canvas.put_pixel(x, y, scaled.pixel(sx, sy));
            } else if dist <= outer {
                canvas.put_pixel(x, y, RING_COLOR);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(position: OverlayPosition, diameter: u32, padding: u32) -> CompositorConfig {
        CompositorConfig {
            position,
            diameter,
            padding,
            ..CompositorConfig::default()
        }
    }

    #[test]
    fn test_overlay_origin_all_corners() {
        let (w, h, size, pad) = (1920, 1080, 180, 20);
        assert_eq!(
            overlay_origin(OverlayPosition::TopLeft, w, h, size, pad),
            (20, 20)
        );
        assert_eq!(
            overlay_origin(OverlayPosition::TopRight, w, h, size, pad),
            (1720, 20)
        );
        assert_eq!(
            overlay_origin(OverlayPosition::BottomLeft, w, h, size, pad),
            (20, 880)
        );
        assert_eq!(
            overlay_origin(OverlayPosition::BottomRight, w, h, size, pad),
            (1720, 880)
        );
    }

    #[test]
    fn test_overlay_origin_saturates_on_tiny_canvas() {
        assert_eq!(
            overlay_origin(OverlayPosition::BottomRight, 100, 100, 180, 20),
            (0, 0)
        );
    }

    #[test]
    fn test_compose_without_webcam_is_screen_fill() {
        let screen = VideoFrame::solid(32, 18, [5, 6, 7, 255]);
        let cfg = config(OverlayPosition::BottomRight, 10, 2);
        let out = compose(&screen, None, 64, 36, &cfg);
        assert_eq!(out.width, 64);
        assert_eq!(out.height, 36);
        assert_eq!(out.pixel(63, 35), [5, 6, 7, 255]);
    }

    #[test]
    fn test_compose_draws_webcam_center_and_ring() {
        let screen = VideoFrame::solid(100, 100, [0, 0, 0, 255]);
        let cam = VideoFrame::solid(40, 40, [200, 10, 10, 255]);
        let cfg = config(OverlayPosition::TopLeft, 40, 10);
        let out = compose(&screen, Some(&cam), 100, 100, &cfg);

        // Center of the circle shows the webcam.
        assert_eq!(out.pixel(30, 30), [200, 10, 10, 255]);
        // On the circle edge sits the white ring (rightmost point).
        assert_eq!(out.pixel(49, 30), RING_COLOR);
        // Corner of the overlay square is outside the circle: screen shows.
        assert_eq!(out.pixel(11, 11), [0, 0, 0, 255]);
        // Far away from the overlay: screen shows.
        assert_eq!(out.pixel(90, 90), [0, 0, 0, 255]);
    }
}
