// THEORY:
// A single error type for everything the detector can refuse to do. Detection
// itself never fails on "no motion": that outcome is an `Option`, not an error.
// Errors are reserved for misuse (bad configuration, frames that change size
// mid-stream, an empty stream) so that callers can skip one clip and keep the
// batch going.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectError {
    #[error("invalid detector configuration: {0}")]
    InvalidConfig(String),

    #[error("frame {index} is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    FrameSizeMismatch {
        index: u64,
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("the frame stream was empty")]
    NoFrames,
}

pub type DetectResult<T> = Result<T, DetectError>;
