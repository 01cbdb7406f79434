// THEORY:
// The `BlobDetector` is the spatial layer of the detector. It turns a cleaned
// foreground mask into a list of `Blob`s and then picks the one that most likely
// is the walker.
//
// Key architectural principles & algorithm steps:
// 1.  **Connected Components**: Foreground pixels are grouped by 8-connectivity with
//     an iterative flood fill (an explicit stack, no recursion). Only the outer
//     extent of a region matters; holes inside a walker do not split it.
// 2.  **Deterministic Order**: Seeds are taken in row-major order, so the same mask
//     always yields the same blobs in the same order.
// 3.  **Filtering**: A `BlobFilter` rejects residual noise by minimum area and,
//     optionally, horizontal artifacts (shadows, camera shake) by requiring a
//     minimum height/width ratio.
// 4.  **Selection**: Among the survivors the largest area wins; on a tie the blob
//     found first wins.
// 5.  **Stateless Utility**: Nothing here remembers previous frames.

use crate::core_modules::background::{BACKGROUND, ForegroundMask};
use crate::core_modules::blob::{Blob, BoundingBox};

/// Rules a blob must satisfy to count as a detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlobFilter {
    /// A blob qualifies only if its area is strictly greater than this.
    pub min_area: u64,
    /// When set, height / width must be strictly greater than this.
    pub min_aspect_ratio: Option<f64>,
}

impl BlobFilter {
    pub fn accepts(&self, blob: &Blob) -> bool {
        if blob.area <= self.min_area {
            return false;
        }
        match self.min_aspect_ratio {
            Some(ratio) => blob.aspect_ratio() > ratio,
            None => true,
        }
    }
}

pub mod blob_detector {
    use super::*;

    /// Finds every 8-connected foreground region in `mask`.
    ///
    /// A blob's area is everything inside its outer boundary: the foreground
    /// pixels plus any holes they enclose.
    pub fn find_blobs(mask: &ForegroundMask) -> Vec<Blob> {
        let (width, height) = mask.dimensions();
        let raw = mask.as_raw();
        // 0 = unlabelled; component n carries label n + 1.
        let mut labels = vec![0u32; raw.len()];
        let mut blobs = Vec::new();
        let mut stack: Vec<(u32, u32)> = Vec::new();

        for y in 0..height {
            for x in 0..width {
                let index = (y * width + x) as usize;
                if labels[index] != 0 || raw[index] == BACKGROUND {
                    continue;
                }

                // --- 1. Region Growing ---
                let label = blobs.len() as u32 + 1;
                labels[index] = label;
                stack.push((x, y));
                let (mut min_x, mut min_y, mut max_x, mut max_y) = (x, y, x, y);

                while let Some((cx, cy)) = stack.pop() {
                    min_x = min_x.min(cx);
                    min_y = min_y.min(cy);
                    max_x = max_x.max(cx);
                    max_y = max_y.max(cy);

                    for dy in -1i64..=1 {
                        for dx in -1i64..=1 {
                            if dx == 0 && dy == 0 {
                                continue;
                            }
                            let nx = cx as i64 + dx;
                            let ny = cy as i64 + dy;
                            if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                                continue;
                            }
                            let neighbor = (ny as u32 * width + nx as u32) as usize;
                            if labels[neighbor] == 0 && raw[neighbor] != BACKGROUND {
                                labels[neighbor] = label;
                                stack.push((nx as u32, ny as u32));
                            }
                        }
                    }
                }

                let bounding_box = BoundingBox {
                    x: min_x,
                    y: min_y,
                    width: max_x - min_x + 1,
                    height: max_y - min_y + 1,
                };

                // --- 2. Outer Boundary Area ---
                let area = enclosed_area(&labels, width, &bounding_box, label);
                blobs.push(Blob { bounding_box, area });
            }
        }

        blobs
    }

    /// Pixels of `bounding_box` not reachable from its border without crossing
    /// component `label`. The outside is walked with 4-connectivity, so it
    /// cannot slip between diagonal neighbours of an 8-connected component.
    fn enclosed_area(labels: &[u32], width: u32, bounding_box: &BoundingBox, label: u32) -> u64 {
        let (box_w, box_h) = (bounding_box.width as usize, bounding_box.height as usize);
        let (x0, y0, width) = (bounding_box.x as usize, bounding_box.y as usize, width as usize);
        let is_component = |lx: usize, ly: usize| labels[(y0 + ly) * width + x0 + lx] == label;

        let mut outside = vec![false; box_w * box_h];
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for ly in 0..box_h {
            for lx in 0..box_w {
                let on_border = lx == 0 || ly == 0 || lx == box_w - 1 || ly == box_h - 1;
                if on_border && !is_component(lx, ly) {
                    outside[ly * box_w + lx] = true;
                    stack.push((lx, ly));
                }
            }
        }

        while let Some((lx, ly)) = stack.pop() {
            let neighbors = [
                (lx.wrapping_sub(1), ly),
                (lx + 1, ly),
                (lx, ly.wrapping_sub(1)),
                (lx, ly + 1),
            ];
            for (nx, ny) in neighbors {
                if nx >= box_w || ny >= box_h {
                    continue;
                }
                let local = ny * box_w + nx;
                if !outside[local] && !is_component(nx, ny) {
                    outside[local] = true;
                    stack.push((nx, ny));
                }
            }
        }

        let reached = outside.iter().filter(|&&o| o).count();
        (box_w * box_h - reached) as u64
    }

    /// The largest blob accepted by `filter`; the earliest one wins a tie.
    pub fn select_largest<'a>(blobs: &'a [Blob], filter: &BlobFilter) -> Option<&'a Blob> {
        let mut best: Option<&Blob> = None;
        for blob in blobs.iter().filter(|b| filter.accepts(b)) {
            match best {
                Some(current) if current.area >= blob.area => {}
                _ => best = Some(blob),
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::blob_detector::{find_blobs, select_largest};
    use super::*;
    use crate::core_modules::background::FOREGROUND;
    use image::Luma;

    fn fill(mask: &mut ForegroundMask, x0: u32, y0: u32, w: u32, h: u32) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                mask.put_pixel(x, y, Luma([FOREGROUND]));
            }
        }
    }

    fn permissive() -> BlobFilter {
        BlobFilter { min_area: 0, min_aspect_ratio: None }
    }

    #[test]
    fn finds_separate_regions_in_scan_order() {
        let mut mask = ForegroundMask::new(50, 50);
        fill(&mut mask, 30, 2, 5, 5);
        fill(&mut mask, 2, 20, 10, 4);
        let blobs = find_blobs(&mask);
        assert_eq!(blobs.len(), 2);
        assert_eq!(blobs[0].bounding_box, BoundingBox { x: 30, y: 2, width: 5, height: 5 });
        assert_eq!(blobs[0].area, 25);
        assert_eq!(blobs[1].area, 40);
    }

    #[test]
    fn diagonal_pixels_are_connected() {
        let mut mask = ForegroundMask::new(10, 10);
        mask.put_pixel(1, 1, Luma([FOREGROUND]));
        mask.put_pixel(2, 2, Luma([FOREGROUND]));
        mask.put_pixel(3, 3, Luma([FOREGROUND]));
        let blobs = find_blobs(&mask);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].area, 3);
        assert_eq!(blobs[0].bounding_box.width, 3);
    }

    #[test]
    fn ring_is_one_blob() {
        let mut mask = ForegroundMask::new(20, 20);
        fill(&mut mask, 2, 2, 10, 10);
        for y in 5..9 {
            for x in 5..9 {
                mask.put_pixel(x, y, Luma([BACKGROUND]));
            }
        }
        let blobs = find_blobs(&mask);
        assert_eq!(blobs.len(), 1);
        // The hole is inside the outer boundary and counts towards the area.
        assert_eq!(blobs[0].area, 100);
    }

    #[test]
    fn notch_open_to_the_outside_is_not_enclosed() {
        let mut mask = ForegroundMask::new(20, 20);
        fill(&mut mask, 2, 2, 10, 10);
        for y in 5..12 {
            for x in 5..9 {
                mask.put_pixel(x, y, Luma([BACKGROUND]));
            }
        }
        let blobs = find_blobs(&mask);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].area, 100 - 4 * 7);
    }

    #[test]
    fn hollow_outline_passes_the_area_filter() {
        // 100x100 outline, 10 px thick: 3600 foreground pixels around an 80x80 hole.
        let mut mask = ForegroundMask::new(120, 120);
        fill(&mut mask, 10, 10, 100, 100);
        for y in 20..100 {
            for x in 20..100 {
                mask.put_pixel(x, y, Luma([BACKGROUND]));
            }
        }
        let blobs = find_blobs(&mask);
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[0].area, 10_000);

        let filter = BlobFilter { min_area: 5000, min_aspect_ratio: Some(0.5) };
        let best = select_largest(&blobs, &filter).unwrap();
        assert_eq!(best.bounding_box, BoundingBox { x: 10, y: 10, width: 100, height: 100 });
    }

    #[test]
    fn filter_rejects_small_and_wide() {
        let filter = BlobFilter { min_area: 100, min_aspect_ratio: Some(0.8) };
        let tall = Blob { bounding_box: BoundingBox { x: 0, y: 0, width: 10, height: 20 }, area: 200 };
        let wide = Blob { bounding_box: BoundingBox { x: 0, y: 0, width: 40, height: 10 }, area: 400 };
        let tiny = Blob { bounding_box: BoundingBox { x: 0, y: 0, width: 5, height: 20 }, area: 100 };
        assert!(filter.accepts(&tall));
        assert!(!filter.accepts(&wide));
        assert!(!filter.accepts(&tiny));
    }

    #[test]
    fn selects_largest_qualifying() {
        let mut mask = ForegroundMask::new(100, 60);
        fill(&mut mask, 2, 2, 10, 30);
        fill(&mut mask, 40, 2, 50, 10);
        fill(&mut mask, 20, 2, 12, 40);
        let blobs = find_blobs(&mask);

        let best = select_largest(&blobs, &permissive()).unwrap();
        assert_eq!(best.area, 500);

        let upright = BlobFilter { min_area: 0, min_aspect_ratio: Some(0.5) };
        let best = select_largest(&blobs, &upright).unwrap();
        assert_eq!(best.area, 480);
    }

    #[test]
    fn selection_is_deterministic_on_ties() {
        let mut mask = ForegroundMask::new(60, 30);
        fill(&mut mask, 40, 2, 6, 6);
        fill(&mut mask, 2, 10, 6, 6);
        let blobs = find_blobs(&mask);
        for _ in 0..5 {
            let best = select_largest(&blobs, &permissive()).unwrap();
            assert_eq!(best.bounding_box.x, 40);
        }
    }

    #[test]
    fn nothing_qualifies() {
        let mut mask = ForegroundMask::new(20, 20);
        fill(&mut mask, 2, 2, 3, 3);
        let blobs = find_blobs(&mask);
        let filter = BlobFilter { min_area: 2000, min_aspect_ratio: None };
        assert!(select_largest(&blobs, &filter).is_none());
    }
}
