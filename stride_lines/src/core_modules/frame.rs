// THEORY:
// A `Frame` is the smallest unit the detector consumes: one luminance raster and
// its position in the clip. It is a "dumb" data container. Colour is discarded
// before detection; the background model works on brightness alone.

use image::GrayImage;

/// One decoded video frame, reduced to luminance.
#[derive(Debug, Clone)]
pub struct Frame {
    /// 0-based position of the frame in its clip.
    pub index: u64,
    pub image: GrayImage,
}

impl Frame {
    pub fn new(index: u64, image: GrayImage) -> Self {
        Self { index, image }
    }

    /// Seconds from the start of the clip. A zero or negative frame rate yields 0.
    pub fn timestamp(&self, fps: f64) -> f64 {
        frame_to_seconds(self.index, fps)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}

pub fn frame_to_seconds(index: u64, fps: f64) -> f64 {
    if fps > 0.0 { index as f64 / fps } else { 0.0 }
}
