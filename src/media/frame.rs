//! Raw media payloads
//!
//! Video frames are plain RGBA8 buffers; audio travels as chunks of mono
//! f32 samples in [-1.0, 1.0]. Both are cheap, owned values so the
//! pipeline never shares mutable pixel or sample memory between tasks.

/// A single decoded video frame (RGBA8, row-major).
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    pub width: u32,
    pub height: u32,
    /// RGBA8 pixel data, `width * height * 4` bytes.
    pub data: Vec<u8>,
}

impl VideoFrame {
    /// Create a frame filled with a solid color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..width * height {
            data.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Width / height ratio.
    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height.max(1) as f64
    }

    /// Read one pixel. Panics if out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    /// Write one pixel. Ignores out-of-bounds coordinates.
    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = ((y * self.width + x) * 4) as usize;
        self.data[i..i + 4].copy_from_slice(&rgba);
    }

    /// Nearest-neighbor scale to the target dimensions.
    pub fn scale_to(&self, width: u32, height: u32) -> VideoFrame {
        if width == self.width && height == self.height {
            return self.clone();
        }
        let mut out = VideoFrame::solid(width, height, [0, 0, 0, 255]);
        for y in 0..height {
            let sy = (y as u64 * self.height as u64 / height.max(1) as u64) as u32;
            for x in 0..width {
                let sx = (x as u64 * self.width as u64 / width.max(1) as u64) as u32;
                out.put_pixel(x, y, self.pixel(sx.min(self.width - 1), sy.min(self.height - 1)));
            }
        }
        out
    }
}

/// A chunk of mono audio samples.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
}

impl AudioChunk {
    pub fn new(samples: Vec<f32>) -> Self {
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
