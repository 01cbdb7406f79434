// THEORY:
// Mask post-processing. A raw foreground mask is speckled with single-pixel noise
// and a real walker often arrives in several fragments. Classic binary morphology
// with a square structuring element fixes both:
//
// 1.  **Opening** (erode, then dilate) removes specks smaller than the kernel.
// 2.  **Closing** (dilate, then erode) fills gaps smaller than the kernel.
// 3.  **Extra dilation** optionally merges nearby fragments of the same person.
//
// A square kernel is separable: a k×k minimum (or maximum) equals a horizontal
// k-wide pass followed by a vertical k-tall pass. Each pass keeps a running count
// of foreground pixels inside the window, so the cost per pixel does not depend on
// the kernel size. Pixels outside the image are ignored, which matches OpenCV's
// default morphology border: a blob touching the frame edge is not eaten away.

use crate::core_modules::background::{BACKGROUND, FOREGROUND, ForegroundMask};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Erode,
    Dilate,
}

pub fn erode(mask: &ForegroundMask, kernel: u32) -> ForegroundMask {
    apply(mask, kernel, Operation::Erode)
}

pub fn dilate(mask: &ForegroundMask, kernel: u32) -> ForegroundMask {
    apply(mask, kernel, Operation::Dilate)
}

pub fn open(mask: &ForegroundMask, kernel: u32) -> ForegroundMask {
    dilate(&erode(mask, kernel), kernel)
}

pub fn close(mask: &ForegroundMask, kernel: u32) -> ForegroundMask {
    erode(&dilate(mask, kernel), kernel)
}

/// Opening, closing, then `extra_dilations` dilation passes.
pub fn clean(mask: &ForegroundMask, kernel: u32, extra_dilations: u32) -> ForegroundMask {
    let mut cleaned = close(&open(mask, kernel), kernel);
    for _ in 0..extra_dilations {
        cleaned = dilate(&cleaned, kernel);
    }
    cleaned
}

fn apply(mask: &ForegroundMask, kernel: u32, operation: Operation) -> ForegroundMask {
    if kernel <= 1 {
        return mask.clone();
    }
    let (width, height) = mask.dimensions();
    let (width, height) = (width as usize, height as usize);
    let radius = (kernel / 2) as usize;

    // --- 1. Horizontal Pass ---
    let mut horizontal = vec![BACKGROUND; width * height];
    for y in 0..height {
        let row = &mask.as_raw()[y * width..(y + 1) * width];
        sweep(row, &mut horizontal[y * width..(y + 1) * width], radius, operation);
    }

    // --- 2. Vertical Pass ---
    let mut out = ForegroundMask::new(mask.width(), mask.height());
    let out_raw: &mut [u8] = &mut out;
    let mut column = vec![BACKGROUND; height];
    let mut column_out = vec![BACKGROUND; height];
    for x in 0..width {
        for y in 0..height {
            column[y] = horizontal[y * width + x];
        }
        sweep(&column, &mut column_out, radius, operation);
        for y in 0..height {
            out_raw[y * width + x] = column_out[y];
        }
    }
    out
}

/// One-dimensional running-count pass.
fn sweep(input: &[u8], output: &mut [u8], radius: usize, operation: Operation) {
    let len = input.len();
    if len == 0 {
        return;
    }
    let is_set = |i: usize| input[i] != BACKGROUND;

    // --- Initial Window ---
    // Window for position i is [i - radius, i + radius] clipped to [0, len).
    let mut set_in_window = (0..=radius.min(len - 1)).filter(|&i| is_set(i)).count();

    for i in 0..len {
        let lo = i.saturating_sub(radius);
        let hi = (i + radius).min(len - 1);
        let window = hi - lo + 1;

        let hit = match operation {
            Operation::Erode => set_in_window == window,
            Operation::Dilate => set_in_window > 0,
        };
        output[i] = if hit { FOREGROUND } else { BACKGROUND };

        // Slide: drop lo if the next window no longer includes it, add the new right edge.
        if i >= radius && is_set(lo) {
            set_in_window -= 1;
        }
        let next_hi = i + radius + 1;
        if next_hi < len && is_set(next_hi) {
            set_in_window += 1;
        }
    }
}
