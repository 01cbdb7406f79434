// The four subcommands. Each clip goes through at most two sequential passes:
// analysis (decode -> detector) and rendering (decode -> annotate -> encode).
// A failing clip is logged and skipped; it never aborts the batch.

use crate::clips::find_clips;
use crate::video::{self, VideoSink, VideoSource};
use anyhow::{Context, Result, bail};
use opencv::prelude::*;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use stride_lines::core_modules::annotator;
use stride_lines::core_modules::verification::{base_name, snapshot_name};
use stride_lines::{
    AnnotationStyle, BatchSummary, ClipSummary, DetectorConfig, Frame, FramePicker,
    LineSettings, PickerCommand, Timeline, TimelineDetector, VerificationPlan, VideoInfo,
};
use tracing::{info, warn};

const ANALYSIS_PROGRESS_EVERY: u64 = 50;
const RENDER_PROGRESS_EVERY: u64 = 100;
const SUMMARY_FILE: &str = "summary.json";

/// Output name of the annotated copy of `input`.
fn marked_name(input: &Path) -> String {
    let file = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "clip.mp4".to_string());
    format!("marked_{file}")
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Runs the detector over every decodable frame of `path`.
pub fn analyse_clip(path: &Path, config: DetectorConfig) -> Result<(VideoInfo, Timeline, Option<LineSettings>)> {
    let mut source = VideoSource::open(path)?;
    let info = source.info();
    info!(
        "{}x{} @ {:.2} fps, {} frames",
        info.width, info.height, info.fps, info.total_frames
    );

    let mut detector = TimelineDetector::new(config)?;
    let mut index = 0u64;
    while let Some(bgr) = source.read()? {
        let frame = Frame::new(index, video::to_gray_image(&bgr)?);
        detector.process_frame(&frame)?;
        index += 1;
        if index % ANALYSIS_PROGRESS_EVERY == 0 {
            info!("analysed {index}/{} frames", info.total_frames);
        }
    }

    if detector.timeline().is_empty() {
        bail!("no frames could be decoded from {}", path.display());
    }
    let settings = detector.scan();
    let timeline = detector.timeline().clone();
    Ok((info, timeline, settings))
}

/// Re-decodes `input` and writes a copy with the START/FINISH overlays burned in.
pub fn render_clip(input: &Path, output: &Path, settings: &LineSettings, style: &AnnotationStyle) -> Result<u64> {
    let mut source = VideoSource::open(input)?;
    let info = source.info();
    let mut sink = VideoSink::create(output, &info)?;

    let mut index = 0u64;
    while let Some(bgr) = source.read()? {
        let overlays = style.overlays_for(index, settings, bgr.rows() as u32);
        if overlays.is_empty() {
            sink.write(&bgr)?;
        } else {
            let mut rgb = video::to_rgb_image(&bgr)?;
            annotator::render(&mut rgb, &overlays);
            sink.write(&video::to_bgr_mat(&rgb)?)?;
        }
        index += 1;
        if index % RENDER_PROGRESS_EVERY == 0 {
            info!("rendered {index}/{} frames", info.total_frames);
        }
    }
    Ok(index)
}

/// Saves the planned frames of `input` as JPEGs in `output_dir`.
pub fn export_snapshots(input: &Path, output_dir: &Path, plan: &VerificationPlan) -> Result<usize> {
    let mut source = VideoSource::open(input)?;
    let base = base_name(input);
    let mut saved = 0;
    for &index in &plan.frames {
        let Some(bgr) = source.read_at(index)? else {
            warn!("frame {index} of {} could not be read", input.display());
            continue;
        };
        let path = output_dir.join(snapshot_name(&base, index));
        video::to_rgb_image(&bgr)?
            .save(&path)
            .with_context(|| format!("failed to save {}", path.display()))?;
        info!("saved {}", path.display());
        saved += 1;
    }
    Ok(saved)
}

fn log_summary(summary: &ClipSummary) {
    let Some(settings) = summary.settings else {
        warn!("{}: no qualifying motion, nothing to mark", summary.file);
        return;
    };
    info!(
        "{}: START frame {} ({:.2}s) at x={}, FINISH frame {} ({:.2}s) at x={}, duration {:.2}s",
        summary.file,
        settings.start.frame_index,
        summary.start_seconds().unwrap_or_default(),
        settings.start.x_position,
        settings.finish.frame_index,
        summary.finish_seconds().unwrap_or_default(),
        settings.finish.x_position,
        summary.duration_seconds().unwrap_or_default(),
    );
    for issue in &summary.issues {
        warn!("{}: {}", summary.file, issue.describe());
    }
}

/// Detects, renders and summarises every matching clip of `input_dir`.
pub fn detect(input_dir: &Path, output_dir: &Path, pattern: &str, config: DetectorConfig) -> Result<BatchSummary> {
    config.validate()?;
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let clips = find_clips(input_dir, pattern)?;
    if clips.is_empty() {
        warn!("no clips matching {pattern} in {}", input_dir.display());
    }
    info!("{} clip(s) to process", clips.len());

    let style = AnnotationStyle::default();
    let mut batch = BatchSummary::new(output_dir.display().to_string());

    for (n, input) in clips.iter().enumerate() {
        let file = file_label(input);
        info!("[{}/{}] {file}", n + 1, clips.len());

        let (info, timeline, settings) = match analyse_clip(input, config) {
            Ok(result) => result,
            Err(err) => {
                warn!("{file}: skipped, {err:#}");
                let video = VideoSource::open(input).ok().map(|source| source.info());
                batch.clips.push(ClipSummary::failed(file, video, format!("{err:#}")));
                continue;
            }
        };

        let mut summary = ClipSummary::new(file.clone(), info, &timeline, settings, config.warmup);
        log_summary(&summary);

        if let Some(settings) = settings.filter(|_| summary.is_renderable()) {
            let name = marked_name(input);
            let output = output_dir.join(&name);
            match render_clip(input, &output, &settings, &style) {
                Ok(frames) => {
                    info!("{file}: wrote {} ({frames} frames)", output.display());
                    summary.output = Some(name);
                }
                Err(err) => warn!("{file}: rendering failed, {err:#}"),
            }
        } else if settings.is_some() {
            warn!("{file}: FINISH precedes START, not rendering");
        }

        batch.clips.push(summary);
    }

    let summary_path = output_dir.join(SUMMARY_FILE);
    let writer = BufWriter::new(
        File::create(&summary_path)
            .with_context(|| format!("failed to create {}", summary_path.display()))?,
    );
    serde_json::to_writer_pretty(writer, &batch)
        .with_context(|| format!("failed to write {}", summary_path.display()))?;

    info!(
        "done: {} rendered, {} skipped, summary in {}",
        batch.rendered(),
        batch.skipped(),
        summary_path.display()
    );
    Ok(batch)
}

/// Rejects hand-picked frames or positions outside the clip instead of clamping them.
fn check_marks(info: &VideoInfo, start: (u64, u32), finish: (u64, u32)) -> Result<()> {
    for (label, (frame, x)) in [("START", start), ("FINISH", finish)] {
        if frame >= info.total_frames {
            bail!("{label} frame {frame} is outside the clip ({} frames)", info.total_frames);
        }
        if x >= info.width {
            bail!("{label} x {x} is outside the frame ({} px wide)", info.width);
        }
    }
    Ok(())
}

/// Places lines by hand: the positions are driven through the picker, then rendered.
pub fn mark(input: &Path, output_dir: &Path, start: (u64, u32), finish: (u64, u32)) -> Result<LineSettings> {
    let info = VideoSource::open(input)?.info();
    check_marks(&info, start, finish)?;
    let mut picker = FramePicker::new(info.total_frames, info.width)?;

    let commands = [
        PickerCommand::Seek(start.0),
        PickerCommand::Click(start.1),
        PickerCommand::MarkStart,
        PickerCommand::Seek(finish.0),
        PickerCommand::Click(finish.1),
        PickerCommand::MarkFinish,
    ];
    for command in commands {
        picker.apply(command)?;
    }
    let Some(settings) = picker.apply(PickerCommand::Confirm)? else {
        bail!("picker closed without settings");
    };
    if !settings.is_ordered() {
        bail!(
            "FINISH frame {} precedes START frame {}",
            settings.finish.frame_index,
            settings.start.frame_index
        );
    }

    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;
    let output = output_dir.join(marked_name(input));
    let frames = render_clip(input, &output, &settings, &AnnotationStyle::default())?;
    info!(
        "START frame {} at x={}, FINISH frame {} at x={}; wrote {} ({frames} frames)",
        settings.start.frame_index,
        settings.start.x_position,
        settings.finish.frame_index,
        settings.finish.x_position,
        output.display()
    );
    Ok(settings)
}

/// Snapshots around START, FINISH and their midpoint.
pub fn verify(video: &Path, output_dir: &Path, start: u64, finish: u64) -> Result<usize> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;
    let info = VideoSource::open(video)?.info();
    let plan = VerificationPlan::around_events(start, finish, info.total_frames);
    if plan.is_empty() {
        bail!("{} reports no frames", video.display());
    }
    let saved = export_snapshots(video, output_dir, &plan)?;
    info!("{saved} verification frame(s) in {}", output_dir.display());
    Ok(saved)
}

/// Key frames of each raw clip plus a detection pass reporting anything suspicious.
pub fn analyze(input_dir: &Path, output_dir: &Path, pattern: &str, config: DetectorConfig) -> Result<()> {
    config.validate()?;
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    for input in find_clips(input_dir, pattern)? {
        let file = file_label(&input);
        info!("analysing {file}");

        let (info, timeline, settings) = match analyse_clip(&input, config) {
            Ok(result) => result,
            Err(err) => {
                warn!("{file}: skipped, {err:#}");
                continue;
            }
        };

        let plan = VerificationPlan::key_frames(info.total_frames.max(timeline.len() as u64));
        if let Err(err) = export_snapshots(&input, output_dir, &plan) {
            warn!("{file}: key frames not exported, {err:#}");
        }

        let summary = ClipSummary::new(file, info, &timeline, settings, config.warmup);
        info!(
            "{}: {} of {} frames with a qualifying blob",
            summary.file, summary.detected_frames, summary.analysed_frames
        );
        log_summary(&summary);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip_info() -> VideoInfo {
        VideoInfo { width: 640, height: 480, fps: 30.0, total_frames: 300 }
    }

    #[test]
    fn marks_inside_the_clip_are_accepted() {
        assert!(check_marks(&clip_info(), (0, 0), (299, 639)).is_ok());
    }

    #[test]
    fn marks_outside_the_clip_are_rejected() {
        let info = clip_info();
        let err = check_marks(&info, (5000, 100), (200, 500)).unwrap_err();
        assert!(err.to_string().contains("START frame 5000"), "{err}");
        assert!(check_marks(&info, (10, 100), (300, 500)).is_err());
        assert!(check_marks(&info, (10, 640), (200, 500)).is_err());
        assert!(check_marks(&info, (10, 100), (200, 9999)).is_err());
    }

    #[test]
    fn marked_copy_keeps_the_file_name() {
        assert_eq!(marked_name(Path::new("/data/in/trial_03.mp4")), "marked_trial_03.mp4");
    }
}
