//! Reframe configuration.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Portrait output width used for reels.
pub const REEL_WIDTH: u32 = 1080;
/// Portrait output height used for reels.
pub const REEL_HEIGHT: u32 = 1920;
/// Output frame rate used for reels.
pub const REEL_FPS: u32 = 30;
/// Center-distance (pixels) a detection must move before the crop follows it
/// on the vertical reel path.
pub const REEL_MOVEMENT_THRESHOLD: f64 = 150.0;
/// Frames between reframer progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100;

/// Configuration for the stabilizing reframer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReframeConfig {
    /// Minimum center distance in pixels treated as real subject movement
    pub movement_threshold: f64,

    /// Output width in pixels
    #[serde(default = "default_target_width")]
    pub target_width: u32,

    /// Output height in pixels
    #[serde(default = "default_target_height")]
    pub target_height: u32,

    /// Output frame rate
    #[serde(default = "default_output_fps")]
    pub output_fps: u32,

    /// Log a progress line every N frames (0 disables)
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

fn default_target_width() -> u32 {
    REEL_WIDTH
}
fn default_target_height() -> u32 {
    REEL_HEIGHT
}
fn default_output_fps() -> u32 {
    REEL_FPS
}
fn default_progress_interval() -> u64 {
    DEFAULT_PROGRESS_INTERVAL
}

impl ReframeConfig {
    /// Create a portrait reel configuration with an explicit movement threshold.
    pub fn new(movement_threshold: f64) -> Self {
        Self {
            movement_threshold,
            target_width: REEL_WIDTH,
            target_height: REEL_HEIGHT,
            output_fps: REEL_FPS,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Configuration used by the vertical reel path.
    pub fn vertical_reel() -> Self {
        Self::new(REEL_MOVEMENT_THRESHOLD)
    }

    /// Returns a new config with updated output dimensions.
    pub fn with_target(mut self, width: u32, height: u32) -> Self {
        self.target_width = width;
        self.target_height = height;
        self
    }

    /// Returns a new config with updated output frame rate.
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.output_fps = fps;
        self
    }

    /// Returns a new config with updated progress interval.
    pub fn with_progress_interval(mut self, frames: u64) -> Self {
        self.progress_interval = frames;
        self
    }

    /// Check that the configuration can drive the crop geometry.
    pub fn validate(&self) -> ModelResult<()> {
        if !self.movement_threshold.is_finite() || self.movement_threshold < 0.0 {
            return Err(ModelError::invalid_config(format!(
                "movement_threshold must be a finite, non-negative pixel distance (got {})",
                self.movement_threshold
            )));
        }
        if self.target_width == 0 || self.target_height == 0 {
            return Err(ModelError::invalid_config(format!(
                "target size must be non-zero (got {}x{})",
                self.target_width, self.target_height
            )));
        }
        if self.output_fps == 0 {
            return Err(ModelError::invalid_config("output_fps must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertical_reel_defaults() {
        let config = ReframeConfig::vertical_reel();
        assert_eq!(config.movement_threshold, 150.0);
        assert_eq!((config.target_width, config.target_height), (1080, 1920));
        assert_eq!(config.output_fps, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ReframeConfig::new(-1.0).validate().is_err());
        assert!(ReframeConfig::new(f64::NAN).validate().is_err());
        assert!(ReframeConfig::new(150.0).with_target(0, 1920).validate().is_err());
        assert!(ReframeConfig::new(150.0).with_fps(0).validate().is_err());
    }

    #[test]
    fn test_threshold_is_required_in_json() {
        let parsed: Result<ReframeConfig, _> = serde_json::from_str("{}");
        assert!(parsed.is_err());

        let parsed: ReframeConfig =
            serde_json::from_str(r#"{"movement_threshold": 80.0}"#).unwrap();
        assert_eq!(parsed.movement_threshold, 80.0);
        assert_eq!(parsed.target_height, 1920);
    }
}
