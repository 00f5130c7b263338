//! Frame sinks: where reframed frames go.
//!
//! [`FfmpegEncodeSink`] pipes `rgb24` frames into an FFmpeg child that
//! encodes them, optionally muxing audio from a second file and burning in
//! subtitles. [`MemorySink`] keeps frames in memory for tests and previews.

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use image::RgbImage;
use reelcut_models::EncodingConfig;
use tracing::{debug, info};

use crate::command::{check_ffmpeg, FfmpegCommand, StderrTail};
use crate::error::{MediaError, MediaResult};

/// Consumer of equally sized frames in presentation order.
pub trait FrameSink {
    /// Append one frame.
    fn write_frame(&mut self, image: &RgbImage) -> MediaResult<()>;

    /// Flush and close the sink. Must be called exactly once after the last
    /// frame; dropping an unfinished sink discards its output.
    fn finish(&mut self) -> MediaResult<()>;
}

/// Collects frames in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    frames: Vec<RgbImage>,
    finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> &[RgbImage] {
        &self.frames
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn into_frames(self) -> Vec<RgbImage> {
        self.frames
    }
}

impl FrameSink for MemorySink {
    fn write_frame(&mut self, image: &RgbImage) -> MediaResult<()> {
        if self.finished {
            return Err(MediaError::internal("write to finished sink"));
        }
        self.frames.push(image.clone());
        Ok(())
    }

    fn finish(&mut self) -> MediaResult<()> {
        self.finished = true;
        Ok(())
    }
}

/// Settings for [`FfmpegEncodeSink`].
#[derive(Debug, Clone)]
pub struct EncodeSinkConfig {
    /// File FFmpeg writes to
    pub output: PathBuf,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Frame rate of the raw input and the output
    pub fps: u32,
    /// File whose first audio stream (if any) is muxed in
    pub audio_source: Option<PathBuf>,
    /// Video filter applied before encoding (e.g. burned subtitles)
    pub video_filter: Option<String>,
    /// Encoder settings
    pub encoding: EncodingConfig,
}

impl EncodeSinkConfig {
    pub fn new(output: impl AsRef<Path>, width: u32, height: u32, fps: u32) -> Self {
        Self {
            output: output.as_ref().to_path_buf(),
            width,
            height,
            fps,
            audio_source: None,
            video_filter: None,
            encoding: EncodingConfig::default(),
        }
    }

    pub fn with_audio_from(mut self, path: impl AsRef<Path>) -> Self {
        self.audio_source = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_video_filter(mut self, filter: impl Into<String>) -> Self {
        self.video_filter = Some(filter.into());
        self
    }

    pub fn with_encoding(mut self, encoding: EncodingConfig) -> Self {
        self.encoding = encoding;
        self
    }

    /// FFmpeg invocation for this sink.
    pub fn to_command(&self) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::from_stdin(&self.output)
            .without_progress()
            .input_args([
                "-f".to_string(),
                "rawvideo".to_string(),
                "-pix_fmt".to_string(),
                "rgb24".to_string(),
                "-s".to_string(),
                format!("{}x{}", self.width, self.height),
                "-r".to_string(),
                self.fps.to_string(),
            ]);

        if let Some(audio) = &self.audio_source {
            cmd = cmd.add_input(audio).map("0:v:0").map("1:a?");
        }
        if let Some(filter) = &self.video_filter {
            cmd = cmd.video_filter(filter);
        }

        cmd = cmd
            .output_args(self.encoding.video_args())
            .frame_rate(self.fps);

        if self.audio_source.is_some() {
            cmd = cmd.output_args(self.encoding.audio_args()).shortest();
        } else {
            cmd = cmd.output_arg("-an");
        }

        cmd.output_args(self.encoding.container_args())
    }
}

/// Streams raw frames into an FFmpeg encoder process.
#[derive(Debug)]
pub struct FfmpegEncodeSink {
    config: EncodeSinkConfig,
    child: Child,
    stdin: Option<ChildStdin>,
    stderr_thread: Option<JoinHandle<StderrTail>>,
    frames_written: u64,
    finished: bool,
}

impl FfmpegEncodeSink {
    /// Spawn the encoder.
    pub fn start(config: EncodeSinkConfig) -> MediaResult<Self> {
        if config.width == 0 || config.height == 0 || config.fps == 0 {
            return Err(MediaError::internal(format!(
                "invalid encode target {}x{} @ {} fps",
                config.width, config.height, config.fps
            )));
        }
        check_ffmpeg()?;

        let args = config.to_command().build_args();
        debug!("Running FFmpeg encoder: ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| MediaError::encode_failed(format!("Failed to spawn FFmpeg: {}", e), None, None))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MediaError::encode_failed("Failed to capture FFmpeg stdin", None, None))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::encode_failed("Failed to capture FFmpeg stderr", None, None))?;

        let stderr_thread = std::thread::spawn(move || {
            let mut tail = StderrTail::default();
            for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                tail.push(line);
            }
            tail
        });

        Ok(Self {
            config,
            child,
            stdin: Some(stdin),
            stderr_thread: Some(stderr_thread),
            frames_written: 0,
            finished: false,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Close stdin, reap the child, and collect its diagnostics.
    fn wait(&mut self) -> MediaResult<(Option<i32>, Option<String>)> {
        self.finished = true;
        drop(self.stdin.take());
        let status = self.child.wait()?;
        let tail = self
            .stderr_thread
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        Ok((if status.success() { Some(0) } else { status.code() }, tail.into_text()))
    }
}

impl FrameSink for FfmpegEncodeSink {
    fn write_frame(&mut self, image: &RgbImage) -> MediaResult<()> {
        if image.dimensions() != (self.config.width, self.config.height) {
            return Err(MediaError::internal(format!(
                "frame is {}x{}, encoder expects {}x{}",
                image.width(),
                image.height(),
                self.config.width,
                self.config.height
            )));
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| MediaError::internal("write to finished encoder"))?;

        match stdin.write_all(image.as_raw()) {
            Ok(()) => {
                self.frames_written += 1;
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                // FFmpeg exited early; its stderr says why.
                let (code, stderr) = self.wait()?;
                Err(MediaError::encode_failed(
                    format!("FFmpeg encoder closed its input after {} frames", self.frames_written),
                    stderr,
                    code,
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn finish(&mut self) -> MediaResult<()> {
        if self.finished {
            return Err(MediaError::internal("encoder already finished"));
        }
        if let Some(stdin) = self.stdin.as_mut() {
            stdin.flush()?;
        }

        let (code, stderr) = self.wait()?;
        if code != Some(0) {
            return Err(MediaError::encode_failed(
                "FFmpeg encoder exited with non-zero status",
                stderr,
                code,
            ));
        }

        let output = &self.config.output;
        match std::fs::metadata(output) {
            Ok(meta) if meta.len() > 0 => {
                info!(
                    path = %output.display(),
                    frames = self.frames_written,
                    bytes = meta.len(),
                    "Encoded reel"
                );
                Ok(())
            }
            _ => Err(MediaError::EmptyOutput(output.clone())),
        }
    }
}

impl Drop for FfmpegEncodeSink {
    fn drop(&mut self) {
        if !self.finished {
            drop(self.stdin.take());
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
