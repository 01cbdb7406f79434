// THEORY:
// The `Timeline` is the behavioral layer of the detector. Every analysed frame
// leaves exactly one `DetectionRecord` behind, in frame order. Once the whole clip
// has been seen, a scan reduces that sequence to two `Event`s: START (the walker
// enters the capture zone) and FINISH (the walker leaves it).
//
// Key architectural principles:
// 1.  **Warm-up Window**: The background model is not trustworthy for its first
//     frames. Records whose index lies inside the warm-up window never take part
//     in either scan, even if they look like perfect detections.
// 2.  **Two Scan Policies**:
//     - `Naive`: first and last detected record. One stray blob anywhere breaks it.
//     - `Debounced`: an event only fires after a run of consecutive detections.
//       START is reported at the *first* frame of its run, FINISH at the *last*
//       frame of its run, so debouncing does not shift the events in time.
// 3.  **Both or Nothing**: `LineSettings` exist only when both events were found.
//     A missing event is never replaced by frame 0.
// 4.  **No Ordering Enforcement**: The scan does not check that START precedes
//     FINISH. `LineSettings::is_ordered` lets the caller decide.

use crate::core_modules::blob::Blob;
use serde::Serialize;

/// Per-frame detection summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectionRecord {
    pub frame_index: u64,
    pub detected: bool,
    /// Horizontal center of the selected blob.
    pub center_x: Option<u32>,
    /// Bottom edge of the selected blob.
    pub bottom: Option<u32>,
    /// Area of the selected blob, 0 when nothing qualified.
    pub area: u64,
}

impl DetectionRecord {
    pub fn hit(frame_index: u64, blob: &Blob) -> Self {
        Self {
            frame_index,
            detected: true,
            center_x: Some(blob.center_x()),
            bottom: Some(blob.bottom()),
            area: blob.area,
        }
    }

    pub fn miss(frame_index: u64) -> Self {
        Self { frame_index, detected: false, center_x: None, bottom: None, area: 0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Start,
    Finish,
}

impl EventKind {
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::Start => "START",
            EventKind::Finish => "FINISH",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Event {
    pub kind: EventKind,
    pub frame_index: u64,
    pub x_position: u32,
}

/// The pair of events a clip is annotated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineSettings {
    pub start: Event,
    pub finish: Event,
}

impl LineSettings {
    pub fn new(start_frame: u64, start_x: u32, finish_frame: u64, finish_x: u32) -> Self {
        Self {
            start: Event { kind: EventKind::Start, frame_index: start_frame, x_position: start_x },
            finish: Event { kind: EventKind::Finish, frame_index: finish_frame, x_position: finish_x },
        }
    }

    /// Whether START does not come after FINISH.
    pub fn is_ordered(&self) -> bool {
        self.start.frame_index <= self.finish.frame_index
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ScanPolicy {
    /// First and last detected record whose area exceeds `min_area`.
    Naive { min_area: u64 },
    /// Events need `start_run` (resp. `finish_run`) consecutive detections.
    Debounced { start_run: u32, finish_run: u32 },
}

impl Default for ScanPolicy {
    fn default() -> Self {
        ScanPolicy::Debounced { start_run: 5, finish_run: 3 }
    }
}

/// The ordered sequence of detection records for one clip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Timeline {
    records: Vec<DetectionRecord>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: DetectionRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[DetectionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records with a detection, including the warm-up window.
    pub fn detected_count(&self) -> usize {
        self.records.iter().filter(|r| r.detected).count()
    }

    /// Reduces the timeline to START/FINISH. `None` unless both events are found.
    pub fn scan(&self, policy: &ScanPolicy, warmup: u64) -> Option<LineSettings> {
        let (start, finish) = self.scan_events(policy, warmup);
        match (start, finish) {
            (Some(start), Some(finish)) => Some(LineSettings { start, finish }),
            _ => None,
        }
    }

    /// Each event independently; partial results are useful for diagnostics only.
    pub fn scan_events(&self, policy: &ScanPolicy, warmup: u64) -> (Option<Event>, Option<Event>) {
        let eligible: Vec<&DetectionRecord> =
            self.records.iter().filter(|r| r.frame_index >= warmup).collect();

        match *policy {
            ScanPolicy::Naive { min_area } => {
                let qualifies = |r: &&&DetectionRecord| r.detected && r.area > min_area;
                let start = eligible.iter().find(qualifies).and_then(|r| event(EventKind::Start, r));
                let finish = eligible.iter().rev().find(qualifies).and_then(|r| event(EventKind::Finish, r));
                (start, finish)
            }
            ScanPolicy::Debounced { start_run, finish_run } => {
                let start = first_run(eligible.iter().copied(), start_run.max(1))
                    .and_then(|r| event(EventKind::Start, r));
                let finish = first_run(eligible.iter().rev().copied(), finish_run.max(1))
                    .and_then(|r| event(EventKind::Finish, r));
                (start, finish)
            }
        }
    }
}

fn event(kind: EventKind, record: &DetectionRecord) -> Option<Event> {
    record.center_x.map(|x| Event { kind, frame_index: record.frame_index, x_position: x })
}

/// Walks `records` and returns the record that opened the first run of `run`
/// consecutive detections.
fn first_run<'a, I>(records: I, run: u32) -> Option<&'a DetectionRecord>
where
    I: Iterator<Item = &'a DetectionRecord>,
{
    let mut run_start: Option<&DetectionRecord> = None;
    let mut count = 0u32;
    for record in records {
        if record.detected {
            if count == 0 {
                run_start = Some(record);
            }
            count += 1;
            if count >= run {
                return run_start;
            }
        } else {
            count = 0;
        }
    }
    None
}
