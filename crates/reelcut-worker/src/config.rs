//! Worker configuration.

use std::path::PathBuf;

use reelcut_media::detection::DEFAULT_MODEL_PATH;
use reelcut_models::{
    ReframeConfig, DEFAULT_PROGRESS_INTERVAL, REEL_FPS, REEL_HEIGHT, REEL_MOVEMENT_THRESHOLD,
    REEL_WIDTH,
};

use crate::error::{WorkerError, WorkerResult};

/// Default folder for cut segments, subtitles and reels.
pub const DEFAULT_OUTPUT_DIR: &str = "topic_segments";

/// Default chat model used for topic segmentation.
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4";

/// Default OpenAI-compatible API root.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Folder for finished segment files
    pub output_dir: PathBuf,
    /// Folder for partial files; defaults to the output folder
    pub work_dir: Option<PathBuf>,
    /// YOLO ONNX model used for subject location
    pub model_path: PathBuf,
    /// Center distance (pixels) the subject must move before the crop follows
    pub movement_threshold: f64,
    /// Reel frame rate
    pub output_fps: u32,
    /// Reel width
    pub target_width: u32,
    /// Reel height
    pub target_height: u32,
    /// Log reframing progress every N frames
    pub progress_interval: u64,
    /// OpenAI API key; only needed for segmentation
    pub openai_api_key: Option<String>,
    /// Chat model for segmentation
    pub openai_model: String,
    /// API root for segmentation requests
    pub openai_base_url: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            work_dir: None,
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            movement_threshold: REEL_MOVEMENT_THRESHOLD,
            output_fps: REEL_FPS,
            target_width: REEL_WIDTH,
            target_height: REEL_HEIGHT,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            openai_api_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            output_dir: std::env::var("REEL_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            work_dir: std::env::var("REEL_WORK_DIR").ok().map(PathBuf::from),
            model_path: std::env::var("REEL_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            movement_threshold: std::env::var("REEL_MOVEMENT_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.movement_threshold),
            output_fps: std::env::var("REEL_OUTPUT_FPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.output_fps),
            target_width: std::env::var("REEL_TARGET_WIDTH")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.target_width),
            target_height: std::env::var("REEL_TARGET_HEIGHT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.target_height),
            progress_interval: std::env::var("REEL_PROGRESS_INTERVAL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.progress_interval),
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            openai_model: std::env::var("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            openai_base_url: std::env::var("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
        }
    }

    /// Reframer settings derived from this config, validated.
    pub fn reframe_config(&self) -> WorkerResult<ReframeConfig> {
        let config = ReframeConfig::new(self.movement_threshold)
            .with_target(self.target_width, self.target_height)
            .with_fps(self.output_fps)
            .with_progress_interval(self.progress_interval);
        config.validate()?;
        Ok(config)
    }

    /// The API key, or a configuration error naming the variable.
    pub fn require_openai_key(&self) -> WorkerResult<&str> {
        self.openai_api_key
            .as_deref()
            .ok_or_else(|| WorkerError::config_error("OPENAI_API_KEY not set"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_vertical_reel() {
        let config = WorkerConfig::default();
        let reframe = config.reframe_config().unwrap();
        assert_eq!(reframe, ReframeConfig::vertical_reel());
        assert_eq!(config.output_dir, PathBuf::from("topic_segments"));
    }

    #[test]
    fn test_invalid_reframe_values_are_rejected() {
        let config = WorkerConfig {
            target_width: 0,
            ..WorkerConfig::default()
        };
        assert!(matches!(config.reframe_config(), Err(WorkerError::Model(_))));
    }

    #[test]
    fn test_missing_openai_key() {
        let config = WorkerConfig::default();
        assert!(matches!(config.require_openai_key(), Err(WorkerError::ConfigError(_))));

        let config = WorkerConfig {
            openai_api_key: Some("sk-test".to_string()),
            ..WorkerConfig::default()
        };
        assert_eq!(config.require_openai_key().unwrap(), "sk-test");
    }
}
