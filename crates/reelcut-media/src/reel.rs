//! Vertical reel rendering: decode → locate → stabilize → crop → encode.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reelcut_models::{EncodingConfig, ReframeConfig};
use tracing::info;

use crate::decode::FfmpegFrameSource;
use crate::detection::SubjectLocator;
use crate::encode::{EncodeSinkConfig, FfmpegEncodeSink};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::TempArtifact;
use crate::probe::probe_video;
use crate::reframe::{ReframeStats, Reframer};
use crate::subtitles::subtitles_filter;

/// A request to turn one landscape clip into a portrait reel.
#[derive(Debug, Clone)]
pub struct VerticalReel {
    /// Source clip; its audio (if any) is carried over
    pub input: PathBuf,
    /// Final reel path
    pub output: PathBuf,
    /// ASS script burned into the reel
    pub subtitles: Option<PathBuf>,
    pub reframe: ReframeConfig,
    pub encoding: EncodingConfig,
    /// Where the partial file is written; defaults to the output directory
    pub work_dir: Option<PathBuf>,
}

impl VerticalReel {
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>, reframe: ReframeConfig) -> Self {
        Self {
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            subtitles: None,
            reframe,
            encoding: EncodingConfig::default(),
            work_dir: None,
        }
    }

    pub fn with_subtitles(mut self, ass_path: impl AsRef<Path>) -> Self {
        self.subtitles = Some(ass_path.as_ref().to_path_buf());
        self
    }

    pub fn with_encoding(mut self, encoding: EncodingConfig) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_work_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.work_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    fn work_dir(&self) -> PathBuf {
        self.work_dir
            .clone()
            .or_else(|| {
                self.output
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .map(Path::to_path_buf)
            })
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Render the reel with `locator`.
    ///
    /// The frame loop runs on a blocking thread. On any failure the partial
    /// output is removed and nothing is left at `output`.
    pub async fn render(self, locator: Arc<dyn SubjectLocator>) -> MediaResult<ReframeStats> {
        let mut reframer = Reframer::new(self.reframe.clone())?;

        if let Some(ass) = &self.subtitles {
            if !ass.exists() {
                return Err(MediaError::FileNotFound(ass.clone()));
            }
        }

        let info = probe_video(&self.input).await?;
        info!(
            input = %self.input.display(),
            width = info.width,
            height = info.height,
            fps = info.fps,
            output_fps = self.reframe.output_fps,
            duration = info.duration,
            has_audio = info.has_audio,
            locator = locator.name(),
            "Rendering vertical reel"
        );

        let work_dir = self.work_dir();
        tokio::fs::create_dir_all(&work_dir).await?;
        let artifact = TempArtifact::for_output(&work_dir, &self.output);

        let mut sink_config = EncodeSinkConfig::new(
            artifact.path(),
            self.reframe.target_width,
            self.reframe.target_height,
            self.reframe.output_fps,
        )
        .with_audio_from(&self.input)
        .with_encoding(self.encoding.clone());
        if let Some(ass) = &self.subtitles {
            sink_config = sink_config.with_video_filter(subtitles_filter(ass));
        }

        let input = self.input.clone();
        let (width, height) = (info.width, info.height);
        let fps = self.reframe.output_fps;
        let stats = tokio::task::spawn_blocking(move || {
            let mut source = FfmpegFrameSource::open(&input, width, height, fps)?;
            let mut sink = FfmpegEncodeSink::start(sink_config)?;
            reframer.run(&mut source, locator.as_ref(), &mut sink)
        })
        .await
        .map_err(|e| MediaError::internal(format!("Reframe task panicked: {}", e)))??;

        artifact.persist(&self.output).await?;

        info!(
            output = %self.output.display(),
            frames = stats.frames,
            detections = stats.detections,
            "Vertical reel created"
        );
        Ok(stats)
    }
}

/// Render `input` into a portrait reel at `output`, burning in `subtitles`
/// when given.
pub async fn create_vertical_reel(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    subtitles: Option<&Path>,
    locator: Arc<dyn SubjectLocator>,
    reframe: ReframeConfig,
) -> MediaResult<ReframeStats> {
    let mut reel = VerticalReel::new(input, output, reframe);
    if let Some(ass) = subtitles {
        reel = reel.with_subtitles(ass);
    }
    reel.render(locator).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::NoSubjectLocator;

    #[test]
    fn test_work_dir_defaults_to_output_parent() {
        let reel = VerticalReel::new("in.mp4", "out/reels/a_centered.mp4", ReframeConfig::vertical_reel());
        assert_eq!(reel.work_dir(), PathBuf::from("out/reels"));

        let reel = VerticalReel::new("in.mp4", "a_centered.mp4", ReframeConfig::vertical_reel());
        assert_eq!(reel.work_dir(), PathBuf::from("."));

        let reel = reel.with_work_dir("/tmp/work");
        assert_eq!(reel.work_dir(), PathBuf::from("/tmp/work"));
    }

    #[tokio::test]
    async fn test_invalid_config_fails_before_probe() {
        let result = create_vertical_reel(
            "/no/such/input.mp4",
            "/tmp/never.mp4",
            None,
            Arc::new(NoSubjectLocator),
            ReframeConfig::new(f64::INFINITY),
        )
        .await;
        assert!(matches!(result, Err(MediaError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_missing_subtitles_file() {
        let result = create_vertical_reel(
            "/no/such/input.mp4",
            "/tmp/never.mp4",
            Some(Path::new("/no/such/subs.ass")),
            Arc::new(NoSubjectLocator),
            ReframeConfig::vertical_reel(),
        )
        .await;
        assert!(matches!(result, Err(MediaError::FileNotFound(_))));
    }
}
