use image::{GrayImage, Luma};
use stride_lines::{DetectorConfig, Frame, ScanPolicy, TimelineDetector};

const BACKGROUND: u8 = 40;
const WALKER: u8 = 220;
const WALKER_WIDTH: u32 = 40;
const WALKER_HEIGHT: u32 = 80;

/// A clip of `len` frames with a 40x80 rectangle centered at `center(i)` when it returns Some.
fn clip<F>(width: u32, height: u32, len: u64, center: F) -> Vec<Frame>
where
    F: Fn(u64) -> Option<u32>,
{
    (0..len)
        .map(|i| {
            let mut image = GrayImage::from_pixel(width, height, Luma([BACKGROUND]));
            if let Some(cx) = center(i) {
                let x0 = cx - WALKER_WIDTH / 2;
                let y0 = (height - WALKER_HEIGHT) / 2;
                for y in y0..y0 + WALKER_HEIGHT {
                    for x in x0..x0 + WALKER_WIDTH {
                        image.put_pixel(x, y, Luma([WALKER]));
                    }
                }
            }
            Frame::new(i, image)
        })
        .collect()
}

/// Rectangle walking right one pixel per frame while `first..=last`.
fn walker(first: u64, last: u64) -> impl Fn(u64) -> Option<u32> {
    move |i| (first..=last).contains(&i).then(|| 30 + (i - first) as u32)
}

fn debounced(run: u32, warmup: u64) -> DetectorConfig {
    DetectorConfig {
        min_area: 3000,
        warmup,
        scan: ScanPolicy::Debounced { start_run: run, finish_run: run },
        ..DetectorConfig::default()
    }
}

#[test]
fn sweep_across_the_frame_end_to_end() {
    // Blank 0-49, a 40x80 rectangle sweeping center x 100 -> 500 over 50-150, blank 151-199.
    let frames = clip(560, 100, 200, |i| (50..=150).contains(&i).then(|| 100 + 4 * (i - 50) as u32));
    let config = DetectorConfig {
        min_area: 3000,
        warmup: 50,
        scan: ScanPolicy::Debounced { start_run: 5, finish_run: 5 },
        ..DetectorConfig::default()
    };

    let (timeline, settings) = TimelineDetector::run(config, frames).unwrap();
    let settings = settings.expect("walker should be detected");

    assert_eq!(timeline.len(), 200);
    assert_eq!(settings.start.frame_index, 50);
    assert!(settings.start.x_position.abs_diff(100) <= 4, "start x {}", settings.start.x_position);
    assert_eq!(settings.finish.frame_index, 150);
    assert!(settings.finish.x_position.abs_diff(500) <= 4, "finish x {}", settings.finish.x_position);
    assert!(settings.is_ordered());
}

#[test]
fn every_frame_of_the_sweep_is_a_hit() {
    let frames = clip(560, 100, 200, |i| (50..=150).contains(&i).then(|| 100 + 4 * (i - 50) as u32));
    let timeline = TimelineDetector::new(debounced(5, 50)).unwrap().detect(frames).unwrap();

    for record in timeline.records() {
        let expected = (50..=150).contains(&record.frame_index);
        assert_eq!(record.detected, expected, "frame {}", record.frame_index);
        if expected {
            assert_eq!(record.area, (WALKER_WIDTH * WALKER_HEIGHT) as u64);
            assert_eq!(record.center_x, Some(100 + 4 * (record.frame_index - 50) as u32));
            assert_eq!(record.bottom, Some(10 + WALKER_HEIGHT));
        }
    }
}

#[test]
fn blob_from_k_to_m_is_reported_exactly() {
    let frames = clip(200, 100, 150, walker(60, 90));
    let (_, settings) = TimelineDetector::run(debounced(5, 50), frames).unwrap();
    let settings = settings.unwrap();
    assert_eq!(settings.start.frame_index, 60);
    assert_eq!(settings.finish.frame_index, 90);
    assert_eq!(settings.start.x_position, 30);
    assert_eq!(settings.finish.x_position, 60);
}

#[test]
fn run_shorter_than_required_reports_nothing() {
    let frames = clip(200, 100, 150, walker(60, 62));
    let config = debounced(5, 50);
    let (timeline, settings) = TimelineDetector::run(config, frames).unwrap();
    assert_eq!(settings, None);
    assert_eq!(timeline.scan_events(&config.scan, config.warmup), (None, None));
    assert_eq!(timeline.detected_count(), 3);
}

#[test]
fn warmup_detections_never_set_start() {
    let frames = clip(200, 100, 120, walker(10, 40));
    let (timeline, settings) = TimelineDetector::run(debounced(5, 50), frames).unwrap();
    assert!(timeline.detected_count() > 0);
    assert_eq!(settings, None);

    let frames = clip(200, 100, 120, walker(20, 80));
    let (_, settings) = TimelineDetector::run(debounced(5, 50), frames).unwrap();
    let settings = settings.unwrap();
    assert_eq!(settings.start.frame_index, 50);
    assert_eq!(settings.finish.frame_index, 80);
}

#[test]
fn small_blobs_are_ignored() {
    let frames: Vec<Frame> = (0..100)
        .map(|i| {
            let mut image = GrayImage::from_pixel(200, 100, Luma([BACKGROUND]));
            if (60..80).contains(&i) {
                for y in 40..60 {
                    for x in 50..70 {
                        image.put_pixel(x, y, Luma([WALKER]));
                    }
                }
            }
            Frame::new(i, image)
        })
        .collect();
    let (timeline, settings) = TimelineDetector::run(debounced(5, 50), frames).unwrap();
    assert_eq!(timeline.detected_count(), 0);
    assert_eq!(settings, None);
}

#[test]
fn wide_blobs_fail_the_aspect_filter() {
    let frames: Vec<Frame> = (0..100)
        .map(|i| {
            let mut image = GrayImage::from_pixel(300, 100, Luma([BACKGROUND]));
            if (60..80).contains(&i) {
                let x0 = 20 + (i - 60) as u32;
                for y in 70..90 {
                    for x in x0..x0 + 200 {
                        image.put_pixel(x, y, Luma([WALKER]));
                    }
                }
            }
            Frame::new(i, image)
        })
        .collect();

    let (_, upright_only) = TimelineDetector::run(debounced(5, 50), frames.clone()).unwrap();
    assert_eq!(upright_only, None);

    let any_shape = DetectorConfig { min_aspect_ratio: None, ..debounced(5, 50) };
    let (_, settings) = TimelineDetector::run(any_shape, frames).unwrap();
    assert_eq!(settings.unwrap().start.frame_index, 60);
}

#[test]
fn presets_find_the_sweep() {
    let frames = clip(560, 100, 200, |i| (50..=150).contains(&i).then(|| 100 + 4 * (i - 50) as u32));
    let presets = [
        DetectorConfig::default(),
        DetectorConfig::motion(),
        DetectorConfig { min_area: 3000, ..DetectorConfig::person() },
        // Two extra dilations grow the 40x80 walker to 52x92 = 4784 px.
        DetectorConfig { scan: ScanPolicy::Naive { min_area: 4000 }, ..DetectorConfig::person_timeline() },
    ];
    for config in presets {
        let (_, settings) = TimelineDetector::run(config, frames.clone()).unwrap();
        let settings = settings.unwrap_or_else(|| panic!("no settings for {config:?}"));
        assert_eq!(settings.start.frame_index, 50, "{config:?}");
        assert_eq!(settings.finish.frame_index, 150, "{config:?}");
        assert!(settings.start.x_position.abs_diff(100) <= 4, "{config:?}");
    }
}

#[test]
fn repeated_runs_are_identical() {
    let frames = clip(200, 100, 120, walker(55, 95));
    let (first, _) = TimelineDetector::run(DetectorConfig::default(), frames.clone()).unwrap();
    let (second, _) = TimelineDetector::run(DetectorConfig::default(), frames).unwrap();
    assert_eq!(first, second);
}
