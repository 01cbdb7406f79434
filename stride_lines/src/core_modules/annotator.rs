// THEORY:
// The `Annotator` burns the reference lines into a clip. It is split in two:
//
// 1.  **Planning** (`AnnotationStyle::overlays_for`): a pure function from a frame
//     index and the clip's `LineSettings` to the list of `Overlay`s visible on that
//     frame. A START overlay appears from the START frame onward, a FINISH overlay
//     from the FINISH frame onward. Lines stay at the x learned once at detection
//     time; they are a stable visual reference, not a tracker.
// 2.  **Rendering** (`render`): draws overlays onto an `RgbImage`: a thick vertical
//     segment across the bottom band of the frame and a label above it, written
//     with a tiny built-in bitmap font. Everything is clipped to the image.

use crate::core_modules::timeline::{Event, EventKind, LineSettings};
use image::{Rgb, RgbImage};

const GLYPH_WIDTH: u32 = 5;
const GLYPH_HEIGHT: u32 = 7;
const GLYPH_ADVANCE: u32 = GLYPH_WIDTH + 1;
const LABEL_GAP: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotationStyle {
    /// Fraction of the frame height, measured from the bottom, covered by the lines.
    pub band_fraction: f64,
    pub thickness: u32,
    pub start_color: [u8; 3],
    pub finish_color: [u8; 3],
    /// Integer magnification of the 5x7 label glyphs.
    pub label_scale: u32,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            band_fraction: 0.25,
            thickness: 5,
            start_color: [255, 0, 0],
            finish_color: [0, 0, 255],
            label_scale: 2,
        }
    }
}

/// One labelled vertical segment to draw on a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub kind: EventKind,
    pub x: u32,
    pub top: u32,
    pub bottom: u32,
    pub color: [u8; 3],
    pub thickness: u32,
    pub label: &'static str,
    /// Bottom-left corner of the label text; may lie outside the frame.
    pub label_origin: (i64, i64),
    pub label_scale: u32,
}

impl AnnotationStyle {
    /// Row where the lines begin.
    pub fn line_top(&self, frame_height: u32) -> u32 {
        let band = self.band_fraction.clamp(0.0, 1.0);
        (frame_height as f64 * (1.0 - band)).floor() as u32
    }

    /// Overlays visible on `frame_index`.
    pub fn overlays_for(&self, frame_index: u64, settings: &LineSettings, frame_height: u32) -> Vec<Overlay> {
        [settings.start, settings.finish]
            .iter()
            .filter(|event| frame_index >= event.frame_index)
            .map(|event| self.overlay(event, frame_height))
            .collect()
    }

    fn overlay(&self, event: &Event, frame_height: u32) -> Overlay {
        let top = self.line_top(frame_height);
        let label = event.kind.label();
        let label_width = text_width(label, self.label_scale) as i64;
        let color = match event.kind {
            EventKind::Start => self.start_color,
            EventKind::Finish => self.finish_color,
        };
        Overlay {
            kind: event.kind,
            x: event.x_position,
            top,
            bottom: frame_height,
            color,
            thickness: self.thickness,
            label,
            label_origin: (event.x_position as i64 - label_width / 2, top as i64 - LABEL_GAP as i64),
            label_scale: self.label_scale,
        }
    }
}

/// Width in pixels of `text` written at `scale`.
pub fn text_width(text: &str, scale: u32) -> u32 {
    let chars = text.chars().count() as u32;
    if chars == 0 {
        return 0;
    }
    (chars * GLYPH_ADVANCE - 1) * scale.max(1)
}

/// Draws every overlay onto `image`.
pub fn render(image: &mut RgbImage, overlays: &[Overlay]) {
    for overlay in overlays {
        draw_segment(image, overlay);
        draw_label(image, overlay);
    }
}

fn draw_segment(image: &mut RgbImage, overlay: &Overlay) {
    let thickness = overlay.thickness.max(1) as i64;
    let left = overlay.x as i64 - thickness / 2;
    for dx in 0..thickness {
        for y in overlay.top..overlay.bottom {
            put(image, left + dx, y as i64, overlay.color);
        }
    }
}

fn draw_label(image: &mut RgbImage, overlay: &Overlay) {
    let scale = overlay.label_scale.max(1) as i64;
    let (origin_x, origin_y) = overlay.label_origin;
    let top = origin_y - GLYPH_HEIGHT as i64 * scale;

    for (i, ch) in overlay.label.chars().enumerate() {
        let Some(rows) = glyph(ch) else { continue };
        let glyph_left = origin_x + i as i64 * GLYPH_ADVANCE as i64 * scale;
        for (row, bits) in rows.iter().enumerate() {
            for col in 0..GLYPH_WIDTH {
                if bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                for sy in 0..scale {
                    for sx in 0..scale {
                        put(
                            image,
                            glyph_left + col as i64 * scale + sx,
                            top + row as i64 * scale + sy,
                            overlay.color,
                        );
                    }
                }
            }
        }
    }
}

fn put(image: &mut RgbImage, x: i64, y: i64, color: [u8; 3]) {
    if x < 0 || y < 0 || x >= image.width() as i64 || y >= image.height() as i64 {
        return;
    }
    image.put_pixel(x as u32, y as u32, Rgb(color));
}

/// 5x7 glyphs, one byte per row, leftmost column in bit 4.
fn glyph(ch: char) -> Option<[u8; 7]> {
    let rows = match ch.to_ascii_uppercase() {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'N' => [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01110, 0b10001, 0b10000, 0b01110, 0b00001, 0b10001, 0b01110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        _ => return None,
    };
    Some(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> LineSettings {
        LineSettings::new(50, 100, 150, 500)
    }

    #[test]
    fn lines_appear_from_their_frame_onward() {
        let style = AnnotationStyle::default();
        assert!(style.overlays_for(49, &settings(), 240).is_empty());

        let at_start = style.overlays_for(50, &settings(), 240);
        assert_eq!(at_start.len(), 1);
        assert_eq!(at_start[0].kind, EventKind::Start);

        let at_finish = style.overlays_for(150, &settings(), 240);
        assert_eq!(at_finish.len(), 2);
        assert_eq!(at_finish[1].kind, EventKind::Finish);
        assert_eq!(at_finish[1].x, 500);
    }

    #[test]
    fn segment_covers_bottom_quarter() {
        let style = AnnotationStyle::default();
        let overlay = &style.overlays_for(60, &settings(), 240)[0];
        assert_eq!(overlay.top, 180);
        assert_eq!(overlay.bottom, 240);
        assert_eq!(overlay.label, "START");
    }

    #[test]
    fn render_draws_line_and_label() {
        let style = AnnotationStyle::default();
        let mut image = RgbImage::new(640, 240);
        render(&mut image, &style.overlays_for(200, &settings(), 240));

        assert_eq!(image.get_pixel(100, 200).0, [255, 0, 0]);
        assert_eq!(image.get_pixel(102, 239).0, [255, 0, 0]);
        assert_eq!(image.get_pixel(103, 200).0, [0, 0, 0]);
        assert_eq!(image.get_pixel(100, 170).0, [0, 0, 0]);
        assert_eq!(image.get_pixel(500, 200).0, [0, 0, 255]);

        let label_pixels = (150..165)
            .flat_map(|y| (60..140).map(move |x| (x, y)))
            .filter(|&(x, y)| image.get_pixel(x, y).0 == [255, 0, 0])
            .count();
        assert!(label_pixels > 0);
    }

    #[test]
    fn render_clips_at_edges() {
        let style = AnnotationStyle::default();
        let mut image = RgbImage::new(50, 40);
        let edge = LineSettings::new(0, 0, 0, 49);
        render(&mut image, &style.overlays_for(0, &edge, 40));
        assert_eq!(image.get_pixel(0, 39).0, [255, 0, 0]);
        assert_eq!(image.get_pixel(49, 39).0, [0, 0, 255]);
    }

    #[test]
    fn label_width() {
        assert_eq!(text_width("START", 1), 29);
        assert_eq!(text_width("START", 2), 58);
        assert_eq!(text_width("", 2), 0);
    }
}
