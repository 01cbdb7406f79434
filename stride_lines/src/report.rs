// THEORY:
// Per-clip and per-batch summaries. They are what a run leaves behind besides the
// annotated videos: the events found, the clip metadata needed to turn frame
// indices into seconds, and a list of issues worth a second look. Summaries are
// plain serde data so the CLI can write them as JSON.

use crate::core_modules::frame::frame_to_seconds;
use crate::core_modules::timeline::{LineSettings, Timeline};
use serde::Serialize;

/// Clip metadata as reported by the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Frame count from the container header; may differ from frames actually decoded.
    pub total_frames: u64,
}

/// Things about a detection result that deserve a human look.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Issue {
    /// START was placed while the background model was still converging.
    StartInsideWarmup,
    /// START is the very first frame: the walker was probably already in view.
    StartAtFirstFrame,
    /// FINISH precedes START.
    FinishBeforeStart,
}

impl Issue {
    pub fn describe(&self) -> &'static str {
        match self {
            Issue::StartInsideWarmup => "START falls inside the background warm-up window",
            Issue::StartAtFirstFrame => "START is frame 0; the walker may be in view from the beginning",
            Issue::FinishBeforeStart => "FINISH comes before START",
        }
    }

    /// Issues raised by `settings` given the detector's warm-up length.
    pub fn collect(settings: &LineSettings, warmup: u64) -> Vec<Issue> {
        let mut issues = Vec::new();
        // Only fires when `warmup` is longer than the window the scan excluded,
        // e.g. for manually marked or naively scanned settings.
        if settings.start.frame_index < warmup {
            issues.push(Issue::StartInsideWarmup);
        }
        if settings.start.frame_index == 0 {
            issues.push(Issue::StartAtFirstFrame);
        }
        if !settings.is_ordered() {
            issues.push(Issue::FinishBeforeStart);
        }
        issues
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipSummary {
    pub file: String,
    /// `None` when the clip could not be opened.
    pub video: Option<VideoInfo>,
    pub settings: Option<LineSettings>,
    /// Frames with a qualifying blob, warm-up included.
    pub detected_frames: usize,
    pub analysed_frames: usize,
    pub issues: Vec<Issue>,
    /// Name of the annotated copy, when one was written.
    pub output: Option<String>,
    /// Why the clip could not be analysed.
    pub error: Option<String>,
}

impl ClipSummary {
    pub fn new(file: impl Into<String>, video: VideoInfo, timeline: &Timeline, settings: Option<LineSettings>, warmup: u64) -> Self {
        let issues = settings.as_ref().map(|s| Issue::collect(s, warmup)).unwrap_or_default();
        Self {
            file: file.into(),
            video: Some(video),
            settings,
            detected_frames: timeline.detected_count(),
            analysed_frames: timeline.len(),
            issues,
            output: None,
            error: None,
        }
    }

    /// A clip that was skipped before any detection result existed.
    pub fn failed(file: impl Into<String>, video: Option<VideoInfo>, error: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            video,
            settings: None,
            detected_frames: 0,
            analysed_frames: 0,
            issues: Vec::new(),
            output: None,
            error: Some(error.into()),
        }
    }

    /// True when both events exist and are in order, i.e. the clip can be rendered.
    pub fn is_renderable(&self) -> bool {
        self.settings.as_ref().is_some_and(LineSettings::is_ordered)
    }

    pub fn start_seconds(&self) -> Option<f64> {
        let fps = self.video?.fps;
        self.settings.map(|s| frame_to_seconds(s.start.frame_index, fps))
    }

    pub fn finish_seconds(&self) -> Option<f64> {
        let fps = self.video?.fps;
        self.settings.map(|s| frame_to_seconds(s.finish.frame_index, fps))
    }

    /// Time between START and FINISH; negative when the events are out of order.
    pub fn duration_seconds(&self) -> Option<f64> {
        Some(self.finish_seconds()? - self.start_seconds()?)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub output_dir: String,
    pub clips: Vec<ClipSummary>,
}

impl BatchSummary {
    pub fn new(output_dir: impl Into<String>) -> Self {
        Self { output_dir: output_dir.into(), clips: Vec::new() }
    }

    pub fn rendered(&self) -> usize {
        self.clips.iter().filter(|c| c.output.is_some()).count()
    }

    pub fn skipped(&self) -> usize {
        self.clips.len() - self.rendered()
    }
}
