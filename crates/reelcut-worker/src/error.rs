//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Segmentation failed: {0}")]
    SegmentationFailed(String),

    #[error("Transcript failed: {0}")]
    TranscriptFailed(String),

    #[error("Media error: {0}")]
    Media(#[from] reelcut_media::MediaError),

    #[error("Model error: {0}")]
    Model(#[from] reelcut_models::ModelError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WorkerError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn segmentation_failed(msg: impl Into<String>) -> Self {
        Self::SegmentationFailed(msg.into())
    }

    pub fn transcript_failed(msg: impl Into<String>) -> Self {
        Self::TranscriptFailed(msg.into())
    }

    /// Check if error is retryable.
    ///
    /// Only network-bound steps are worth another attempt; media and
    /// configuration failures repeat deterministically.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::SegmentationFailed(_) => true,
            WorkerError::Media(e) => matches!(e, reelcut_media::MediaError::DownloadFailed { .. }),
            _ => false,
        }
    }
}
