//! Subject-tracking reframing from landscape to portrait.
//!
//! - [`geometry`]: pure crop-window math and the crop+resize step
//! - [`stabilizer`]: hysteresis over per-frame detections
//! - [`reframer`]: the streaming frame loop tying locator, stabilizer,
//!   geometry and sink together

pub mod geometry;
pub mod reframer;
pub mod stabilizer;

pub use geometry::{compute_crop, crop_and_resize, crop_width};
pub use reframer::{ReframeStats, ReframedFrame, Reframer};
pub use stabilizer::{Stabilized, Stabilizer, Transition};
