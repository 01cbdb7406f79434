// THEORY:
// The `BackgroundModel` is the temporal layer of the detector. It keeps, for every
// pixel of the frame, a running statistical picture of what the static scene looks
// like and classifies each incoming pixel as background or foreground.
//
// Key architectural principles:
// 1.  **Per-Pixel Adaptive Gaussian**: Every pixel owns a running mean and variance
//     of its luminance. A pixel is foreground when its squared distance from the
//     mean exceeds `var_threshold` times the learned variance (MOG2 semantics with
//     a single component and shadow detection off).
// 2.  **Bounded Memory**: The learning rate is `1 / min(frames_seen, history)`. The
//     first frames converge quickly; after `history` frames the model forgets at a
//     constant rate, so a slowly changing scene is followed.
// 3.  **Selective Update**: Background pixels update both mean and variance at the
//     full rate. Foreground pixels only nudge the mean, at a tenth of the
//     steady-state rate `1/history`, and never touch the variance. A walker
//     crossing the frame is neither absorbed into the background nor leaves a
//     ghost behind, while an object that stops for good is eventually learned.
// 4.  **Policy-Free**: The model knows nothing about warm-up windows. Whether early
//     detections may be trusted is decided by the timeline scan.

use crate::error::{DetectError, DetectResult};
use image::{GrayImage, Luma};

/// Binary image (0 or 255) marking pixels that differ from the learned background.
pub type ForegroundMask = GrayImage;

pub const FOREGROUND: u8 = 255;
pub const BACKGROUND: u8 = 0;

const INITIAL_VARIANCE: f32 = 15.0 * 15.0;
const MIN_VARIANCE: f32 = 4.0 * 4.0;
const MAX_VARIANCE: f32 = 75.0 * 75.0;
const FOREGROUND_LEARNING_FACTOR: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundConfig {
    /// Number of frames contributing to the adaptive model.
    pub history: u32,
    /// Squared distance, in units of variance, beyond which a pixel is foreground.
    pub var_threshold: f32,
}

/// A running per-pixel model of the static scene.
pub struct BackgroundModel {
    config: BackgroundConfig,
    width: u32,
    height: u32,
    mean: Vec<f32>,
    variance: Vec<f32>,
    frames_seen: u64,
}

impl BackgroundModel {
    pub fn new(config: BackgroundConfig) -> Self {
        Self {
            config,
            width: 0,
            height: 0,
            mean: Vec::new(),
            variance: Vec::new(),
            frames_seen: 0,
        }
    }

    /// Number of frames applied so far.
    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    /// Classifies `frame` against the current model, then folds it into the model.
    ///
    /// The first frame only seeds the model and yields an empty mask. Every later
    /// frame must have the dimensions of the first one.
    pub fn apply(&mut self, frame: &GrayImage) -> DetectResult<ForegroundMask> {
        let (width, height) = frame.dimensions();

        if self.frames_seen == 0 {
            self.width = width;
            self.height = height;
            self.mean = frame.as_raw().iter().map(|&v| v as f32).collect();
            self.variance = vec![INITIAL_VARIANCE; self.mean.len()];
            self.frames_seen = 1;
            return Ok(GrayImage::new(width, height));
        }

        if (width, height) != (self.width, self.height) {
            return Err(DetectError::FrameSizeMismatch {
                index: self.frames_seen,
                expected_width: self.width,
                expected_height: self.height,
                actual_width: width,
                actual_height: height,
            });
        }

        self.frames_seen += 1;
        let effective_history = self.frames_seen.min(self.config.history.max(1) as u64);
        let rate = 1.0 / effective_history as f32;
        let foreground_rate = FOREGROUND_LEARNING_FACTOR / self.config.history.max(1) as f32;

        let mut mask = GrayImage::new(width, height);
        let mask_raw: &mut [u8] = &mut mask;

        for (i, &value) in frame.as_raw().iter().enumerate() {
            let value = value as f32;
            let mean = self.mean[i];
            let variance = self.variance[i];
            let diff = value - mean;
            let distance_sq = diff * diff;

            if distance_sq > self.config.var_threshold * variance {
                mask_raw[i] = FOREGROUND;
                self.mean[i] = mean + foreground_rate * diff;
            } else {
                self.mean[i] = mean + rate * diff;
                self.variance[i] =
                    (variance + rate * (distance_sq - variance)).clamp(MIN_VARIANCE, MAX_VARIANCE);
            }
        }

        Ok(mask)
    }

    /// The current background estimate, rounded to 8 bits.
    pub fn background_image(&self) -> GrayImage {
        let mut image = GrayImage::new(self.width, self.height);
        for (pixel, &mean) in image.pixels_mut().zip(self.mean.iter()) {
            *pixel = Luma([mean.round().clamp(0.0, 255.0) as u8]);
        }
        image
    }
}
