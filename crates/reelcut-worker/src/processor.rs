//! Segment processing: subtitles, cut, and (in vertical mode) the reel.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use reelcut_media::{
    create_vertical_reel, download_video, extract_segment, write_ass_file, ReframeStats,
    SubjectLocator, VerticalReel, DEFAULT_CAPTION_LANGUAGE,
};
use reelcut_models::{EncodingConfig, ReelMode, ReframeConfig, TopicSegment, TranscriptLine};
use serde::Serialize;
use tracing::{info, warn, Instrument};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::SegmentLogger;
use crate::retry::RetryPolicy;
use crate::segmenter::Segmenter;
use crate::transcript::{fetch_transcript, load_transcript};

/// File name the downloaded source video is stored under.
pub const SOURCE_VIDEO_NAME: &str = "original_video.mp4";

/// Files written for one segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentOutputs {
    /// Cut segment in the source aspect ratio
    pub chunk: PathBuf,
    /// Chunk-relative ASS subtitles
    pub subtitles: PathBuf,
    /// Dialogue lines in `subtitles`
    pub dialogues: usize,
    /// Portrait reel with burned-in subtitles (vertical mode)
    pub reel: Option<PathBuf>,
    /// Reframer counters for `reel`
    pub reframe: Option<ReframeStats>,
}

/// What happened to one segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SegmentStatus {
    Done(SegmentOutputs),
    Skipped { reason: String },
    Failed { error: String },
}

/// Per-segment entry of a [`RunReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentReport {
    /// 1-based position in the segment list
    pub index: usize,
    pub stem: String,
    pub segment: TopicSegment,
    #[serde(flatten)]
    pub status: SegmentStatus,
}

/// Outcome of processing a segment list.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub segments: Vec<SegmentReport>,
}

impl RunReport {
    pub fn succeeded(&self) -> usize {
        self.count(|s| matches!(s, SegmentStatus::Done(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, SegmentStatus::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, SegmentStatus::Failed { .. }))
    }

    /// True when no segment failed.
    pub fn is_success(&self) -> bool {
        self.failed() == 0
    }

    fn count(&self, pred: impl Fn(&SegmentStatus) -> bool) -> usize {
        self.segments.iter().filter(|r| pred(&r.status)).count()
    }
}

/// Turns topic segments of one source video into deliverables.
#[derive(Clone)]
pub struct SegmentProcessor {
    output_dir: PathBuf,
    work_dir: Option<PathBuf>,
    mode: ReelMode,
    reframe: ReframeConfig,
    encoding: EncodingConfig,
    locator: Arc<dyn SubjectLocator>,
}

impl std::fmt::Debug for SegmentProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentProcessor")
            .field("output_dir", &self.output_dir)
            .field("mode", &self.mode)
            .field("locator", &self.locator.name())
            .finish()
    }
}

impl SegmentProcessor {
    pub fn new(
        config: &WorkerConfig,
        mode: ReelMode,
        locator: Arc<dyn SubjectLocator>,
    ) -> WorkerResult<Self> {
        Ok(Self {
            output_dir: config.output_dir.clone(),
            work_dir: config.work_dir.clone(),
            mode,
            reframe: config.reframe_config()?,
            encoding: EncodingConfig::default(),
            locator,
        })
    }

    pub fn with_encoding(mut self, encoding: EncodingConfig) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Process every segment in order. Failures are recorded and the next
    /// segment still runs.
    pub async fn process_all(
        &self,
        source: &Path,
        segments: &[TopicSegment],
        transcript: &[TranscriptLine],
    ) -> RunReport {
        let mut report = RunReport::default();

        for (i, segment) in segments.iter().enumerate() {
            let index = i + 1;
            let stem = segment.file_stem(index);
            let logger = SegmentLogger::new(index, &stem);

            let status = if segment.duration() <= 0.0 {
                logger.log_warning("non-positive duration, skipping");
                SegmentStatus::Skipped {
                    reason: format!("duration {:.2}s", segment.duration()),
                }
            } else {
                let span = logger.create_span();
                match self
                    .process_segment(source, segment, transcript, &logger)
                    .instrument(span)
                    .await
                {
                    Ok(outputs) => SegmentStatus::Done(outputs),
                    Err(e) => {
                        logger.log_error(&e.to_string());
                        SegmentStatus::Failed {
                            error: e.to_string(),
                        }
                    }
                }
            };

            report.segments.push(SegmentReport {
                index,
                stem,
                segment: segment.clone(),
                status,
            });
        }

        info!(
            succeeded = report.succeeded(),
            skipped = report.skipped(),
            failed = report.failed(),
            output_dir = %self.output_dir.display(),
            "Segments processed"
        );
        report
    }

    async fn process_segment(
        &self,
        source: &Path,
        segment: &TopicSegment,
        transcript: &[TranscriptLine],
        logger: &SegmentLogger,
    ) -> WorkerResult<SegmentOutputs> {
        let started = Instant::now();
        logger.log_start(&format!(
            "topic={:?} start={:.2} end={:.2}",
            segment.topic, segment.start, segment.end
        ));

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let stem = logger.stem();
        let chunk = self.output_dir.join(format!("{}.mp4", stem));
        let subtitles = self.output_dir.join(format!("{}.ass", stem));

        let dialogues = write_ass_file(&subtitles, transcript, segment.start, segment.end).await?;
        extract_segment(source, &chunk, segment.start, segment.duration(), &self.encoding).await?;
        logger.log_progress(&format!("cut {}", chunk.display()));

        let (reel, reframe) = if self.mode.is_vertical() {
            let reel_path = self.output_dir.join(format!("{}_centered.mp4", stem));
            let mut job = VerticalReel::new(&chunk, &reel_path, self.reframe.clone())
                .with_subtitles(&subtitles)
                .with_encoding(self.encoding.clone());
            if let Some(dir) = &self.work_dir {
                job = job.with_work_dir(dir);
            }
            let stats = job.render(Arc::clone(&self.locator)).await?;
            if stats.detections == 0 {
                logger.log_warning("subject never detected, reel uses a center crop");
            }
            (Some(reel_path), Some(stats))
        } else {
            (None, None)
        };

        logger.log_completion(&format!(
            "{} dialogue lines in {:.1}s",
            dialogues,
            started.elapsed().as_secs_f64()
        ));

        Ok(SegmentOutputs {
            chunk,
            subtitles,
            dialogues,
            reel,
            reframe,
        })
    }
}

/// Where the source video comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    /// Downloaded with yt-dlp into the output folder
    Url(String),
    /// Already on disk
    File(PathBuf),
}

impl VideoSource {
    /// Treat `http(s)://` inputs as URLs and everything else as a path.
    pub fn parse(input: &str) -> Self {
        if input.starts_with("http://") || input.starts_with("https://") {
            VideoSource::Url(input.to_string())
        } else {
            VideoSource::File(PathBuf::from(input))
        }
    }

    /// Local path of the video, downloading it first if needed.
    pub async fn resolve(&self, download_dir: &Path) -> WorkerResult<PathBuf> {
        match self {
            VideoSource::File(path) => {
                if !path.exists() {
                    return Err(reelcut_media::MediaError::FileNotFound(path.clone()).into());
                }
                Ok(path.clone())
            }
            VideoSource::Url(url) => {
                tokio::fs::create_dir_all(download_dir).await?;
                let path = download_dir.join(SOURCE_VIDEO_NAME);
                let target = path.as_path();
                RetryPolicy::new("download")
                    .run(move || async move {
                        download_video(url, target).await.map_err(WorkerError::from)
                    })
                    .await?;
                Ok(path)
            }
        }
    }

    /// Timed transcript for this source: the given file, or for URLs the
    /// fetched caption track.
    pub async fn transcript(
        &self,
        transcript_path: Option<&Path>,
        download_dir: &Path,
    ) -> WorkerResult<Vec<TranscriptLine>> {
        match (transcript_path, self) {
            (Some(path), _) => load_transcript(path).await,
            (None, VideoSource::Url(url)) => {
                fetch_transcript(url, download_dir, DEFAULT_CAPTION_LANGUAGE).await
            }
            (None, VideoSource::File(path)) => Err(WorkerError::transcript_failed(format!(
                "{} is a local file; pass a transcript JSON",
                path.display()
            ))),
        }
    }
}

/// Full pipeline: source → transcript → topic segments → deliverables.
///
/// Without `transcript_path` the transcript is fetched from the source URL.
pub async fn run_pipeline(
    source: &VideoSource,
    transcript_path: Option<&Path>,
    segmenter: &dyn Segmenter,
    processor: &SegmentProcessor,
) -> WorkerResult<RunReport> {
    let video = source.resolve(processor.output_dir()).await?;
    let transcript = source
        .transcript(transcript_path, processor.output_dir())
        .await?;

    let lines = transcript.as_slice();
    let segments = RetryPolicy::new("segmentation")
        .run(move || segmenter.segment(lines))
        .await?;
    if segments.is_empty() {
        return Err(WorkerError::segmentation_failed("no usable segments returned"));
    }
    info!(segments = segments.len(), video = %video.display(), "Cutting topic segments");

    Ok(processor.process_all(&video, &segments, &transcript).await)
}

/// Reframe a single video into a portrait reel, outside the segment flow.
pub async fn reframe_file(
    input: &Path,
    output: &Path,
    subtitles: Option<&Path>,
    locator: Arc<dyn SubjectLocator>,
    reframe: ReframeConfig,
) -> WorkerResult<ReframeStats> {
    let stats = create_vertical_reel(input, output, subtitles, locator, reframe).await?;
    if stats.detections == 0 {
        warn!(input = %input.display(), "Subject never detected, reel uses a center crop");
    }
    Ok(stats)
}
