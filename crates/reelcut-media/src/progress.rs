//! FFmpeg progress parsing.

use serde::{Deserialize, Serialize};

/// Progress snapshot from FFmpeg's `-progress` output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Frames written so far
    pub frame: u64,
    /// Current encoding FPS
    pub fps: f64,
    /// Output position in milliseconds
    pub out_time_ms: i64,
    /// Output position as `HH:MM:SS.micros`
    pub out_time: String,
    /// Encoding speed relative to realtime
    pub speed: f64,
    /// Whether FFmpeg reported `progress=end`
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Output position in seconds.
    pub fn out_seconds(&self) -> f64 {
        self.out_time_ms as f64 / 1000.0
    }

    /// Percentage of `total_seconds` written, capped at 100.
    pub fn percentage(&self, total_seconds: f64) -> f64 {
        if total_seconds <= 0.0 {
            return 0.0;
        }
        (self.out_seconds() / total_seconds * 100.0).clamp(0.0, 100.0)
    }
}
