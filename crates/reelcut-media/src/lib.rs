#![deny(unreachable_patterns)]
//! FFmpeg wrapper and stabilizing subject reframer for portrait reels.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building and progress parsing
//! - Streaming frame decode and encode over FFmpeg pipes
//! - Subject locators (YOLOv8 via ONNX Runtime, or none)
//! - The stabilizing reframer and its crop geometry
//! - Segment cutting, ASS subtitles, and yt-dlp video and caption download

pub mod captions;
pub mod clip;
pub mod command;
pub mod decode;
pub mod detection;
pub mod download;
pub mod encode;
pub mod error;
pub mod frame;
pub mod fs_utils;
pub mod metrics;
pub mod probe;
pub mod progress;
pub mod reel;
pub mod reframe;
pub mod subtitles;

pub use captions::{fetch_captions, DEFAULT_CAPTION_LANGUAGE};
pub use clip::extract_segment;
pub use command::{FfmpegCommand, FfmpegRunner};
pub use decode::{first_frame, FfmpegFrameSource};
pub use detection::{LocatorBuilder, NoSubjectLocator, SubjectLocator};
#[cfg(feature = "yolo")]
pub use detection::{YoloConfig, YoloSubjectLocator};
pub use download::download_video;
pub use encode::{EncodeSinkConfig, FfmpegEncodeSink, FrameSink, MemorySink};
pub use error::{MediaError, MediaResult};
pub use frame::{Frame, FrameSource, MemoryFrameSource};
pub use fs_utils::TempArtifact;
pub use probe::{probe_video, VideoInfo};
pub use progress::FfmpegProgress;
pub use reel::{create_vertical_reel, VerticalReel};
pub use reframe::{compute_crop, ReframeStats, ReframedFrame, Reframer, Stabilizer, Transition};
pub use subtitles::{subtitles_filter, write_ass_file};
