// THEORY:
// The `pipeline` module is the top-level API of the detector. It wires the layers
// into one object per clip:
//
//   frame -> BackgroundModel -> morphology::clean -> find_blobs -> select_largest
//         -> DetectionRecord appended to the Timeline
//
// and, once the clip is exhausted, `Timeline::scan` turns the records into
// START/FINISH `LineSettings`.
//
// A `TimelineDetector` holds only its configuration, the background model and
// the timeline built so far. There is no global state; a new clip gets a new
// detector. Frames can be pushed one at a time (`process_frame`, for streaming
// decoders) or handed over as an iterator (`detect`, `run`).

use crate::core_modules::background::{BackgroundConfig, BackgroundModel};
use crate::core_modules::blob_detector::{BlobFilter, blob_detector};
use crate::core_modules::frame::Frame;
use crate::core_modules::morphology;
use crate::core_modules::timeline::{DetectionRecord, LineSettings, ScanPolicy, Timeline};
use crate::error::{DetectError, DetectResult};
use serde::Serialize;
use tracing::debug;

/// Every tunable of the detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DetectorConfig {
    /// Frames contributing to the adaptive background model.
    pub history: u32,
    /// Foreground sensitivity; lower values flag smaller changes.
    pub var_threshold: f32,
    /// Side of the square structuring element. Must be odd.
    pub kernel_size: u32,
    /// Dilation passes after opening/closing, to merge fragments of one person.
    pub extra_dilations: u32,
    /// A blob must be strictly larger than this many pixels.
    pub min_area: u64,
    /// When set, a blob's height/width must exceed this ratio.
    pub min_aspect_ratio: Option<f64>,
    /// Frames at the start of the clip excluded from the START/FINISH search.
    pub warmup: u64,
    pub scan: ScanPolicy,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            history: 50,
            var_threshold: 25.0,
            kernel_size: 5,
            extra_dilations: 0,
            min_area: 3000,
            min_aspect_ratio: Some(0.5),
            warmup: 50,
            scan: ScanPolicy::default(),
        }
    }
}

impl DetectorConfig {
    /// Any large moving region; first and last detection. No warm-up.
    pub fn motion() -> Self {
        Self {
            history: 100,
            var_threshold: 50.0,
            kernel_size: 5,
            extra_dilations: 0,
            min_area: 3000,
            min_aspect_ratio: None,
            warmup: 0,
            scan: ScanPolicy::Naive { min_area: 0 },
        }
    }

    /// Upright person-sized blobs, debounced 5/3 after a 30-frame warm-up.
    pub fn person() -> Self {
        Self {
            history: 100,
            var_threshold: 40.0,
            kernel_size: 5,
            extra_dilations: 0,
            min_area: 5000,
            min_aspect_ratio: Some(0.8),
            warmup: 30,
            scan: ScanPolicy::Debounced { start_run: 5, finish_run: 3 },
        }
    }

    /// Long history, aggressive merging, and a naive scan over large blobs only.
    pub fn person_timeline() -> Self {
        Self {
            history: 200,
            var_threshold: 25.0,
            kernel_size: 7,
            extra_dilations: 2,
            min_area: 3000,
            min_aspect_ratio: Some(0.5),
            warmup: 50,
            scan: ScanPolicy::Naive { min_area: 5000 },
        }
    }

    pub fn validate(&self) -> DetectResult<()> {
        if self.history == 0 {
            return Err(DetectError::InvalidConfig("history must be at least 1 frame".into()));
        }
        if !(self.var_threshold > 0.0) {
            return Err(DetectError::InvalidConfig(format!(
                "var_threshold must be positive, got {}",
                self.var_threshold
            )));
        }
        if self.kernel_size == 0 || self.kernel_size % 2 == 0 {
            return Err(DetectError::InvalidConfig(format!(
                "kernel_size must be odd, got {}",
                self.kernel_size
            )));
        }
        if let Some(ratio) = self.min_aspect_ratio {
            if !(ratio >= 0.0) {
                return Err(DetectError::InvalidConfig(format!(
                    "min_aspect_ratio must be non-negative, got {ratio}"
                )));
            }
        }
        Ok(())
    }

    pub fn blob_filter(&self) -> BlobFilter {
        BlobFilter { min_area: self.min_area, min_aspect_ratio: self.min_aspect_ratio }
    }

    fn background(&self) -> BackgroundConfig {
        BackgroundConfig { history: self.history, var_threshold: self.var_threshold }
    }
}

/// Builds the detection timeline of one clip.
pub struct TimelineDetector {
    config: DetectorConfig,
    background: BackgroundModel,
    timeline: Timeline,
}

impl TimelineDetector {
    pub fn new(config: DetectorConfig) -> DetectResult<Self> {
        config.validate()?;
        Ok(Self {
            background: BackgroundModel::new(config.background()),
            config,
            timeline: Timeline::new(),
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Analyses one frame and appends its record to the timeline.
    pub fn process_frame(&mut self, frame: &Frame) -> DetectResult<DetectionRecord> {
        let raw_mask = self.background.apply(&frame.image)?;
        let mask = morphology::clean(&raw_mask, self.config.kernel_size, self.config.extra_dilations);
        let blobs = blob_detector::find_blobs(&mask);

        let record = match blob_detector::select_largest(&blobs, &self.config.blob_filter()) {
            Some(blob) => DetectionRecord::hit(frame.index, blob),
            None => DetectionRecord::miss(frame.index),
        };

        if record.detected {
            debug!(
                frame = frame.index,
                center_x = ?record.center_x,
                area = record.area,
                candidates = blobs.len(),
                "blob selected"
            );
        }

        self.timeline.push(record.clone());
        Ok(record)
    }

    /// Feeds every frame and returns the finished timeline.
    pub fn detect<I>(mut self, frames: I) -> DetectResult<Timeline>
    where
        I: IntoIterator<Item = Frame>,
    {
        for frame in frames {
            self.process_frame(&frame)?;
        }
        Ok(self.timeline)
    }

    /// START/FINISH for the frames processed so far.
    pub fn scan(&self) -> Option<LineSettings> {
        self.timeline.scan(&self.config.scan, self.config.warmup)
    }

    /// Builds the timeline and scans it. An empty stream is an error.
    pub fn run<I>(config: DetectorConfig, frames: I) -> DetectResult<(Timeline, Option<LineSettings>)>
    where
        I: IntoIterator<Item = Frame>,
    {
        let timeline = Self::new(config)?.detect(frames)?;
        if timeline.is_empty() {
            return Err(DetectError::NoFrames);
        }
        let settings = timeline.scan(&config.scan, config.warmup);
        Ok((timeline, settings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn blank(index: u64) -> Frame {
        Frame::new(index, GrayImage::from_pixel(120, 80, Luma([40])))
    }

    #[test]
    fn presets_are_valid() {
        for config in [
            DetectorConfig::default(),
            DetectorConfig::motion(),
            DetectorConfig::person(),
            DetectorConfig::person_timeline(),
        ] {
            assert!(config.validate().is_ok(), "{config:?}");
        }
    }

    #[test]
    fn even_kernel_is_rejected() {
        let config = DetectorConfig { kernel_size: 6, ..DetectorConfig::default() };
        assert!(matches!(TimelineDetector::new(config), Err(DetectError::InvalidConfig(_))));
    }

    #[test]
    fn zero_history_is_rejected() {
        let config = DetectorConfig { history: 0, ..DetectorConfig::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_stream_is_no_frames() {
        let result = TimelineDetector::run(DetectorConfig::default(), Vec::<Frame>::new());
        assert_eq!(result.unwrap_err(), DetectError::NoFrames);
    }

    #[test]
    fn one_record_per_frame() {
        let mut detector = TimelineDetector::new(DetectorConfig::default()).unwrap();
        for i in 0..10 {
            let record = detector.process_frame(&blank(i)).unwrap();
            assert_eq!(record.frame_index, i);
            assert!(!record.detected);
        }
        assert_eq!(detector.timeline().len(), 10);
        assert_eq!(detector.scan(), None);
    }

    #[test]
    fn static_scene_yields_no_settings() {
        let frames = (0..80).map(blank);
        let (timeline, settings) = TimelineDetector::run(DetectorConfig::default(), frames).unwrap();
        assert_eq!(timeline.detected_count(), 0);
        assert_eq!(settings, None);
    }
}
