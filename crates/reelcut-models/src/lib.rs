//! Shared data models for the reelcut pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Subject bounding boxes and crop windows
//! - Reframe and encoding configuration
//! - Topic segments and timed transcripts
//! - Output modes

pub mod encoding;
pub mod error;
pub mod geometry;
pub mod reframe;
pub mod segment;
pub mod style;
pub mod transcript;

// Re-export common types
pub use encoding::EncodingConfig;
pub use error::{ModelError, ModelResult};
pub use geometry::{BoundingBox, CropRectangle};
pub use reframe::{
    ReframeConfig, DEFAULT_PROGRESS_INTERVAL, REEL_FPS, REEL_HEIGHT, REEL_MOVEMENT_THRESHOLD,
    REEL_WIDTH,
};
pub use segment::{normalize_segments, parse_segments_json, RawSegment, TopicSegment};
pub use style::ReelMode;
pub use transcript::{render_for_prompt, TranscriptLine};
