// THEORY:
// Verification snapshots let a person check an annotated clip without scrubbing
// through it. This module only decides *which* frames to export and *what* to
// call the files; reading frames and encoding images is the caller's business.
//
// Two plans exist:
// - `around_events`: frames bracketing START and FINISH plus the midpoint, so the
//   appearance of each line can be checked.
// - `key_frames`: evenly spread frames of a raw clip for a first look at the scene.

use std::path::Path;

const BEFORE_EVENT: u64 = 10;
const AFTER_EVENT: u64 = 30;

/// Ascending, de-duplicated frame indices to export.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VerificationPlan {
    pub frames: Vec<u64>,
}

impl VerificationPlan {
    /// Frames just before, at and after each event, plus the midpoint between them.
    pub fn around_events(start_frame: u64, finish_frame: u64, total_frames: u64) -> Self {
        if total_frames == 0 {
            return Self::default();
        }
        let last = total_frames - 1;
        let candidates = [
            start_frame.saturating_sub(BEFORE_EVENT),
            start_frame,
            start_frame + AFTER_EVENT,
            (start_frame + finish_frame) / 2,
            finish_frame.saturating_sub(BEFORE_EVENT),
            finish_frame,
            (finish_frame + AFTER_EVENT).min(last),
        ];
        Self::from_candidates(candidates.iter().map(|&f| f.min(last)))
    }

    /// First frame, 10%, 25%, 50%, 75% and the last frame.
    pub fn key_frames(total_frames: u64) -> Self {
        if total_frames == 0 {
            return Self::default();
        }
        let at = |percent: u64| total_frames * percent / 100;
        let candidates = [0, at(10), at(25), at(50), at(75), total_frames - 1];
        Self::from_candidates(candidates.into_iter())
    }

    fn from_candidates<I: Iterator<Item = u64>>(candidates: I) -> Self {
        let mut frames: Vec<u64> = candidates.collect();
        frames.sort_unstable();
        frames.dedup();
        Self { frames }
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

/// File stem of `path`, or "clip" when it has none.
pub fn base_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "clip".to_string())
}

/// Snapshot file name for `frame_index` of the clip called `base`.
pub fn snapshot_name(base: &str, frame_index: u64) -> String {
    format!("{base}_f{frame_index:04}.jpg")
}
