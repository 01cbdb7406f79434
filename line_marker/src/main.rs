mod clips;
mod commands;
mod video;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use stride_lines::{DetectorConfig, ScanPolicy};
use tracing::Level;

#[derive(Parser)]
#[command(name = "line_marker", version, about = "Burns START/FINISH reference lines into gait-trial clips")]
struct Cli {
    /// Per-frame detector output.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Detect the walker in every matching clip and write annotated copies.
    Detect {
        input_dir: PathBuf,
        output_dir: PathBuf,
        #[command(flatten)]
        detector: DetectorArgs,
    },
    /// Annotate one clip with hand-picked frames and positions.
    Mark {
        input: PathBuf,
        output_dir: PathBuf,
        #[arg(long)]
        start_frame: u64,
        #[arg(long)]
        start_x: u32,
        #[arg(long)]
        finish_frame: u64,
        #[arg(long)]
        finish_x: u32,
    },
    /// Export snapshots around START and FINISH of an annotated clip.
    Verify {
        video: PathBuf,
        output_dir: PathBuf,
        #[arg(long)]
        start: u64,
        #[arg(long)]
        finish: u64,
    },
    /// Export key frames of raw clips and report detection issues.
    Analyze {
        input_dir: PathBuf,
        output_dir: PathBuf,
        #[command(flatten)]
        detector: DetectorArgs,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    Default,
    Motion,
    Person,
    PersonTimeline,
}

#[derive(Args)]
struct DetectorArgs {
    /// File name pattern; a single `*` matches anything.
    #[arg(long, default_value = "*.mp4")]
    pattern: String,
    #[arg(long, value_enum, default_value_t = Preset::Default)]
    preset: Preset,
    /// Minimum blob area in pixels.
    #[arg(long)]
    min_area: Option<u64>,
    /// Frames ignored while the background model converges.
    #[arg(long)]
    warmup: Option<u64>,
    /// Consecutive detections required to place START.
    #[arg(long)]
    start_run: Option<u32>,
    /// Consecutive detections required to place FINISH.
    #[arg(long)]
    finish_run: Option<u32>,
}

impl DetectorArgs {
    fn config(&self) -> DetectorConfig {
        let mut config = match self.preset {
            Preset::Default => DetectorConfig::default(),
            Preset::Motion => DetectorConfig::motion(),
            Preset::Person => DetectorConfig::person(),
            Preset::PersonTimeline => DetectorConfig::person_timeline(),
        };
        if let Some(min_area) = self.min_area {
            config.min_area = min_area;
        }
        if let Some(warmup) = self.warmup {
            config.warmup = warmup;
        }
        if self.start_run.is_some() || self.finish_run.is_some() {
            let (start_run, finish_run) = match config.scan {
                ScanPolicy::Debounced { start_run, finish_run } => (start_run, finish_run),
                ScanPolicy::Naive { .. } => (1, 1),
            };
            config.scan = ScanPolicy::Debounced {
                start_run: self.start_run.unwrap_or(start_run),
                finish_run: self.finish_run.unwrap_or(finish_run),
            };
        }
        config
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.debug { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .init();

    match cli.command {
        Command::Detect { input_dir, output_dir, detector } => {
            let config = detector.config();
            tracing::info!(?config, "detecting");
            commands::detect(&input_dir, &output_dir, &detector.pattern, config)?;
        }
        Command::Mark { input, output_dir, start_frame, start_x, finish_frame, finish_x } => {
            commands::mark(&input, &output_dir, (start_frame, start_x), (finish_frame, finish_x))?;
        }
        Command::Verify { video, output_dir, start, finish } => {
            commands::verify(&video, &output_dir, start, finish)?;
        }
        Command::Analyze { input_dir, output_dir, detector } => {
            commands::analyze(&input_dir, &output_dir, &detector.pattern, detector.config())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_flags_switch_to_debounced_scan() {
        let cli = Cli::parse_from([
            "line_marker", "detect", "in", "out", "--preset", "person-timeline", "--start-run", "4",
        ]);
        let Command::Detect { detector, .. } = cli.command else {
            panic!("expected detect");
        };
        assert_eq!(
            detector.config().scan,
            ScanPolicy::Debounced { start_run: 4, finish_run: 1 }
        );
    }

    #[test]
    fn overrides_apply_on_top_of_the_preset() {
        let cli = Cli::parse_from(["line_marker", "analyze", "in", "out", "--min-area", "1200", "--warmup", "0"]);
        let Command::Analyze { detector, .. } = cli.command else {
            panic!("expected analyze");
        };
        let config = detector.config();
        assert_eq!(config.min_area, 1200);
        assert_eq!(config.warmup, 0);
        assert_eq!(config.scan, DetectorConfig::default().scan);
    }
}
