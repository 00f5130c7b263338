//! FFmpeg-backed frame decoding.
//!
//! FFmpeg writes `rgb24` raw frames to stdout; frames are read one at a time
//! so memory stays bounded regardless of video length.

use std::ffi::OsString;
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use image::RgbImage;
use tracing::{debug, warn};

use crate::command::{check_ffmpeg, StderrTail};
use crate::error::{MediaError, MediaResult};
use crate::frame::{Frame, FrameSource};

/// Streaming decoder over an FFmpeg child process.
#[derive(Debug)]
pub struct FfmpegFrameSource {
    path: PathBuf,
    width: u32,
    height: u32,
    child: Child,
    stdout: BufReader<ChildStdout>,
    stderr_thread: Option<JoinHandle<StderrTail>>,
    next_index: u64,
    finished: bool,
}

impl FfmpegFrameSource {
    /// Start decoding `path`, whose frames are `width`x`height`, resampled to
    /// `fps` frames per second.
    ///
    /// Dimensions come from a prior probe; FFmpeg is not asked to scale.
    pub fn open(path: impl AsRef<Path>, width: u32, height: u32, fps: u32) -> MediaResult<Self> {
        if fps == 0 {
            return Err(reelcut_models::ModelError::invalid_config("decode fps must be > 0").into());
        }
        Self::spawn(path.as_ref(), width, height, Some(fps), None)
    }

    fn spawn(
        path: &Path,
        width: u32,
        height: u32,
        fps: Option<u32>,
        max_frames: Option<u32>,
    ) -> MediaResult<Self> {
        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }
        if width == 0 || height == 0 {
            return Err(MediaError::InvalidVideo(format!(
                "cannot decode {}x{} frames",
                width, height
            )));
        }
        check_ffmpeg()?;

        let mut cmd = Command::new("ffmpeg");
        cmd.args(decode_args(path, fps, max_frames))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(path = %path.display(), width, height, ?fps, "Starting frame decoder");

        let mut child = cmd
            .spawn()
            .map_err(|e| MediaError::decode_failed(format!("Failed to spawn FFmpeg: {}", e), None))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::decode_failed("Failed to capture FFmpeg stdout", None))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::decode_failed("Failed to capture FFmpeg stderr", None))?;

        let stderr_thread = std::thread::spawn(move || {
            let mut tail = StderrTail::default();
            for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                tail.push(line);
            }
            tail
        });

        Ok(Self {
            path: path.to_path_buf(),
            width,
            height,
            child,
            stdout: BufReader::new(stdout),
            stderr_thread: Some(stderr_thread),
            next_index: 0,
            finished: false,
        })
    }

    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// Fill `buf`; returns the number of bytes read before EOF.
    fn read_full(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.stdout.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    /// Reap the child and turn a failed exit into an error.
    fn finish(&mut self) -> MediaResult<()> {
        self.finished = true;
        let status = self.child.wait()?;
        let tail = self
            .stderr_thread
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(MediaError::decode_failed(
                format!(
                    "FFmpeg decode of {} exited with {:?}",
                    self.path.display(),
                    status.code()
                ),
                tail.into_text(),
            ))
        }
    }
}

impl FrameSource for FfmpegFrameSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn next_frame(&mut self) -> MediaResult<Option<Frame>> {
        if self.finished {
            return Ok(None);
        }

        let mut buf = vec![0u8; self.frame_len()];
        let read = self.read_full(&mut buf)?;

        if read < buf.len() {
            if read > 0 {
                warn!(
                    path = %self.path.display(),
                    frame = self.next_index,
                    bytes = read,
                    "Discarding truncated trailing frame"
                );
            }
            self.finish()?;
            return Ok(None);
        }

        let image = RgbImage::from_raw(self.width, self.height, buf)
            .ok_or_else(|| MediaError::internal("raw frame buffer has wrong length"))?;
        let frame = Frame::new(self.next_index, image);
        self.next_index += 1;
        Ok(Some(frame))
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// FFmpeg arguments for decoding the first video stream of `path` to raw
/// `rgb24` frames on stdout.
///
/// With `fps` set the stream is resampled (frames dropped or duplicated) so
/// that frame count matches duration at that rate.
pub fn decode_args(path: &Path, fps: Option<u32>, max_frames: Option<u32>) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(path.as_os_str().to_os_string());
    args.extend(["-map", "0:v:0"].map(OsString::from));
    if let Some(fps) = fps {
        args.push("-vf".into());
        args.push(format!("fps={}", fps).into());
    }
    if let Some(n) = max_frames {
        args.push("-frames:v".into());
        args.push(n.to_string().into());
    }
    args.extend(["-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"].map(OsString::from));
    args
}

/// Decode only the first frame of a video.
pub fn first_frame(path: impl AsRef<Path>, width: u32, height: u32) -> MediaResult<Frame> {
    let path = path.as_ref();
    let mut source = FfmpegFrameSource::spawn(path, width, height, None, Some(1))?;
    source
        .next_frame()?
        .ok_or_else(|| MediaError::InvalidVideo(format!("{} has no frames", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_file() {
        let result = FfmpegFrameSource::open("/definitely/not/here.mp4", 1920, 1080, 30);
        assert!(matches!(result, Err(MediaError::FileNotFound(_))));
    }

    #[test]
    fn test_open_rejects_zero_dimensions() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = FfmpegFrameSource::open(file.path(), 0, 1080, 30);
        assert!(matches!(result, Err(MediaError::InvalidVideo(_))));
    }

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_decode_args_resample_to_output_rate() {
        let args = strings(decode_args(Path::new("clip.mp4"), Some(30), None));
        let vf = args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(args[vf + 1], "fps=30");
        // filter is an output option, so it must follow the input
        let input = args.iter().position(|a| a == "clip.mp4").unwrap();
        assert!(input < vf);
        assert_eq!(args.last().map(String::as_str), Some("pipe:1"));
        assert!(!args.contains(&"-frames:v".to_string()));
    }

    #[test]
    fn test_decode_args_first_frame_only() {
        let args = strings(decode_args(Path::new("clip.mp4"), None, Some(1)));
        assert!(!args.contains(&"-vf".to_string()));
        let frames = args.iter().position(|a| a == "-frames:v").unwrap();
        assert_eq!(args[frames + 1], "1");
    }

    #[test]
    fn test_open_rejects_zero_fps() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = FfmpegFrameSource::open(file.path(), 1920, 1080, 0);
        assert!(matches!(result, Err(MediaError::InvalidConfig(_))));
    }
}
