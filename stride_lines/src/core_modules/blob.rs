// THEORY:
// A `Blob` is one connected region of foreground pixels in a single frame. Like
// every other per-frame container in the detector it is "dumb": it carries its
// geometry and nothing about previous frames. The timeline layer decides what a
// sequence of blobs means.

use serde::Serialize;

/// Axis-aligned box in pixel coordinates; `x`/`y` is the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A connected foreground region found in one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bounding_box: BoundingBox,
    /// Number of foreground pixels in the region.
    pub area: u64,
}

impl Blob {
    /// Horizontal center of the bounding box; this is the recorded position.
    pub fn center_x(&self) -> u32 {
        self.bounding_box.x + self.bounding_box.width / 2
    }

    /// Bottom edge of the bounding box, used as a foot-position proxy.
    pub fn bottom(&self) -> u32 {
        self.bounding_box.y + self.bounding_box.height
    }

    /// Height over width. A zero-width box has no meaningful ratio and reports 0.
    pub fn aspect_ratio(&self) -> f64 {
        if self.bounding_box.width == 0 {
            return 0.0;
        }
        self.bounding_box.height as f64 / self.bounding_box.width as f64
    }
}
