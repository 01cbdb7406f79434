// THEORY:
// The `FramePicker` is the manual fallback for clips the detector cannot handle.
// A person scrubs through the clip, clicks where a line should go, and marks the
// current frame as START or FINISH. This module is only the state machine behind
// such a tool; it owns no window, no keyboard and no video. Any front end (a GUI,
// a script, command-line flags) drives it with `PickerCommand`s.
//
// States:
// - `Browsing`: nothing marked yet.
// - `StartPending`: START is marked, FINISH is still missing.
// - `FinishPending`: FINISH is marked, START is still missing.
// - `ReadyToConfirm`: both are marked; `Confirm` closes the session.
// - `Confirmed` / `Skipped`: terminal. Every further command is rejected.

use crate::core_modules::timeline::LineSettings;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerState {
    Browsing,
    StartPending,
    FinishPending,
    ReadyToConfirm,
    Confirmed,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerCommand {
    /// Move by a signed number of frames, clamped to the clip.
    Step(i64),
    /// Jump to an absolute frame, clamped to the clip.
    Seek(u64),
    /// Choose the x position for the next mark.
    Click(u32),
    MarkStart,
    MarkFinish,
    Reset,
    Confirm,
    Skip,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerError {
    #[error("click a line position before marking a frame")]
    NoLinePosition,
    #[error("both START and FINISH must be marked before confirming")]
    Incomplete,
    #[error("the picker session is closed")]
    Closed,
    #[error("the clip has no frames")]
    EmptyClip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mark {
    frame: u64,
    x: u32,
}

#[derive(Debug, Clone)]
pub struct FramePicker {
    total_frames: u64,
    frame_width: u32,
    current_frame: u64,
    click_x: Option<u32>,
    start: Option<Mark>,
    finish: Option<Mark>,
    state: PickerState,
}

impl FramePicker {
    pub fn new(total_frames: u64, frame_width: u32) -> Result<Self, PickerError> {
        if total_frames == 0 {
            return Err(PickerError::EmptyClip);
        }
        Ok(Self {
            total_frames,
            frame_width,
            current_frame: 0,
            click_x: None,
            start: None,
            finish: None,
            state: PickerState::Browsing,
        })
    }

    pub fn state(&self) -> PickerState {
        self.state
    }

    pub fn current_frame(&self) -> u64 {
        self.current_frame
    }

    pub fn click_x(&self) -> Option<u32> {
        self.click_x
    }

    /// Settings as marked so far; `None` until both marks exist.
    pub fn settings(&self) -> Option<LineSettings> {
        match (self.start, self.finish) {
            (Some(s), Some(f)) => Some(LineSettings::new(s.frame, s.x, f.frame, f.x)),
            _ => None,
        }
    }

    /// Applies one command. On `Confirm` the finished settings are returned.
    pub fn apply(&mut self, command: PickerCommand) -> Result<Option<LineSettings>, PickerError> {
        if matches!(self.state, PickerState::Confirmed | PickerState::Skipped) {
            return Err(PickerError::Closed);
        }

        match command {
            PickerCommand::Step(delta) => {
                let target = (self.current_frame as i64).saturating_add(delta);
                self.current_frame = target.clamp(0, (self.total_frames - 1) as i64) as u64;
            }
            PickerCommand::Seek(frame) => {
                self.current_frame = frame.min(self.total_frames - 1);
            }
            PickerCommand::Click(x) => {
                self.click_x = Some(x.min(self.frame_width.saturating_sub(1)));
            }
            PickerCommand::MarkStart => {
                let x = self.click_x.ok_or(PickerError::NoLinePosition)?;
                self.start = Some(Mark { frame: self.current_frame, x });
                self.refresh_state();
            }
            PickerCommand::MarkFinish => {
                let x = self.click_x.ok_or(PickerError::NoLinePosition)?;
                self.finish = Some(Mark { frame: self.current_frame, x });
                self.refresh_state();
            }
            PickerCommand::Reset => {
                self.click_x = None;
                self.start = None;
                self.finish = None;
                self.state = PickerState::Browsing;
            }
            PickerCommand::Confirm => {
                let settings = self.settings().ok_or(PickerError::Incomplete)?;
                self.state = PickerState::Confirmed;
                return Ok(Some(settings));
            }
            PickerCommand::Skip => {
                self.state = PickerState::Skipped;
            }
        }
        Ok(None)
    }

    fn refresh_state(&mut self) {
        self.state = match (self.start.is_some(), self.finish.is_some()) {
            (false, false) => PickerState::Browsing,
            (true, false) => PickerState::StartPending,
            (false, true) => PickerState::FinishPending,
            (true, true) => PickerState::ReadyToConfirm,
        };
    }
}
