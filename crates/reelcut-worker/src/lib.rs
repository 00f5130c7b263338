//! Interview-to-reel pipeline.
//!
//! This crate provides:
//! - Environment configuration
//! - LLM topic segmentation of timed transcripts
//! - Per-segment cutting, subtitles and vertical reel rendering
//! - Structured segment logging

pub mod config;
pub mod error;
pub mod logging;
pub mod processor;
pub mod retry;
pub mod segmenter;
pub mod transcript;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::{init_tracing, SegmentLogger};
pub use processor::{
    reframe_file, run_pipeline, RunReport, SegmentOutputs, SegmentProcessor, SegmentReport,
    SegmentStatus, VideoSource,
};
pub use retry::RetryPolicy;
pub use segmenter::{FixedSegments, Segmenter, TopicSegmenter};
pub use transcript::{fetch_transcript, load_transcript, parse_json3, video_id};
