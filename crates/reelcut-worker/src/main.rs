//! reelcut: turn interview videos into subtitled vertical reels.
//!
//! Usage:
//!   reelcut run <URL|PATH> [--transcript <JSON>]  Download, segment, cut and reframe
//!   reelcut cut <PATH> --segments <JSON> ...       Cut known segments
//!   reelcut reframe <INPUT> <OUTPUT>               Reframe one clip into a reel
//!   reelcut check                                  Check external tools

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use reelcut_media::command::{check_ffmpeg, check_ffprobe, check_ytdlp};
use reelcut_media::{LocatorBuilder, SubjectLocator};
use reelcut_models::ReelMode;
use reelcut_worker::{
    init_tracing, load_transcript, reframe_file, run_pipeline, FixedSegments, RunReport,
    SegmentProcessor, Segmenter, TopicSegmenter, VideoSource, WorkerConfig,
};

#[derive(Parser)]
#[command(
    name = "reelcut",
    about = "Cut interviews into topic reels with a stabilized subject crop",
    version
)]
struct Cli {
    #[command(flatten)]
    overrides: ConfigOverrides,

    #[command(subcommand)]
    command: Commands,
}

/// Flags that override `REEL_*` environment settings.
#[derive(Args)]
struct ConfigOverrides {
    /// Output directory for segments and reels
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Directory for partial files
    #[arg(long, global = true)]
    work_dir: Option<PathBuf>,

    /// YOLO ONNX model path
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    /// COCO class to follow
    #[arg(long, global = true, default_value = "person")]
    class: String,

    /// Center distance in pixels before the crop follows the subject
    #[arg(long, global = true)]
    threshold: Option<f64>,

    /// Reel frame rate
    #[arg(long, global = true)]
    fps: Option<u32>,

    /// Skip detection and always crop the frame center
    #[arg(long, global = true)]
    no_detect: bool,
}

impl ConfigOverrides {
    fn apply(&self, config: &mut WorkerConfig) {
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(dir) = &self.work_dir {
            config.work_dir = Some(dir.clone());
        }
        if let Some(model) = &self.model {
            config.model_path = model.clone();
        }
        if let Some(threshold) = self.threshold {
            config.movement_threshold = threshold;
        }
        if let Some(fps) = self.fps {
            config.output_fps = fps;
        }
    }

    fn locator(&self, config: &WorkerConfig) -> anyhow::Result<Arc<dyn SubjectLocator>> {
        let builder = LocatorBuilder::new()
            .model_path(&config.model_path)
            .class_name(&self.class)?
            .disabled(self.no_detect);
        Ok(builder.build())
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Download (or open) a video, segment its transcript and cut every topic
    Run {
        /// YouTube URL or local video path
        source: String,

        /// Timed transcript JSON ([{text, start, duration}, ...]);
        /// fetched from YouTube captions when omitted for a URL
        #[arg(short, long)]
        transcript: Option<PathBuf>,

        /// Use these segments instead of asking the LLM
        #[arg(long)]
        segments: Option<PathBuf>,

        /// Also render stabilized vertical reels
        #[arg(long)]
        vertical: bool,
    },

    /// Cut a local video into the segments listed in a JSON file
    Cut {
        /// Source video
        input: PathBuf,

        /// Segment list ([{topic, start, end}, ...])
        #[arg(short, long)]
        segments: PathBuf,

        /// Timed transcript JSON for subtitles
        #[arg(short, long)]
        transcript: PathBuf,

        /// Also render stabilized vertical reels
        #[arg(long)]
        vertical: bool,
    },

    /// Reframe one clip into a portrait reel
    Reframe {
        input: PathBuf,
        output: PathBuf,

        /// ASS subtitles to burn in
        #[arg(long)]
        subtitles: Option<PathBuf>,
    },

    /// Check that ffmpeg, ffprobe and yt-dlp are installed
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let mut config = WorkerConfig::from_env();
    cli.overrides.apply(&mut config);
    info!(
        output_dir = %config.output_dir.display(),
        model = %config.model_path.display(),
        movement_threshold = config.movement_threshold,
        output_fps = config.output_fps,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Run {
            source,
            transcript,
            segments,
            vertical,
        } => {
            let segmenter: Box<dyn Segmenter> = match segments {
                Some(path) => Box::new(FixedSegments::from_file(&path).await?),
                None => Box::new(TopicSegmenter::from_config(&config)?),
            };
            let processor = processor(&cli.overrides, &config, vertical)?;
            let report = run_pipeline(
                &VideoSource::parse(&source),
                transcript.as_deref(),
                segmenter.as_ref(),
                &processor,
            )
            .await?;
            finish(report)
        }
        Commands::Cut {
            input,
            segments,
            transcript,
            vertical,
        } => {
            let segments = FixedSegments::from_file(&segments)
                .await
                .with_context(|| format!("loading segments from {}", segments.display()))?;
            let transcript = load_transcript(&transcript).await?;
            let processor = processor(&cli.overrides, &config, vertical)?;
            let report = processor.process_all(&input, &segments.0, &transcript).await;
            finish(report)
        }
        Commands::Reframe {
            input,
            output,
            subtitles,
        } => {
            let locator = cli.overrides.locator(&config)?;
            let stats = reframe_file(
                &input,
                &output,
                subtitles.as_deref(),
                locator,
                config.reframe_config()?,
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
            Ok(())
        }
        Commands::Check => {
            check_ffmpeg()?;
            check_ffprobe()?;
            check_ytdlp()?;
            println!("ffmpeg, ffprobe and yt-dlp found");
            Ok(())
        }
    }
}

fn processor(
    overrides: &ConfigOverrides,
    config: &WorkerConfig,
    vertical: bool,
) -> anyhow::Result<SegmentProcessor> {
    let mode = ReelMode::from(vertical);
    let locator = if mode.is_vertical() {
        overrides.locator(config)?
    } else {
        LocatorBuilder::new().disabled(true).build()
    };
    Ok(SegmentProcessor::new(config, mode, locator)?)
}

fn finish(report: RunReport) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.is_success() {
        bail!(
            "{} of {} segments failed",
            report.failed(),
            report.segments.len()
        );
    }
    Ok(())
}
