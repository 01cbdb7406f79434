// THEORY:
// This file is the entry point of the `stride_lines` library crate. It exposes the
// `TimelineDetector` and its configuration as the high-level interface, together
// with the data it produces (`Timeline`, `LineSettings`) and the helpers a front
// end needs around it: annotation, verification snapshot planning, the manual
// frame picker, and run summaries.
//
// The layered internals live in `core_modules`:
//   background (temporal) -> morphology -> blob_detector (spatial) -> timeline (behavioral)

pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod report;

pub use core_modules::annotator::{AnnotationStyle, Overlay};
pub use core_modules::frame::Frame;
pub use core_modules::picker::{FramePicker, PickerCommand, PickerError, PickerState};
pub use core_modules::timeline::{DetectionRecord, Event, EventKind, LineSettings, ScanPolicy, Timeline};
pub use core_modules::verification::VerificationPlan;
pub use error::{DetectError, DetectResult};
pub use pipeline::{DetectorConfig, TimelineDetector};
pub use report::{BatchSummary, ClipSummary, Issue, VideoInfo};
