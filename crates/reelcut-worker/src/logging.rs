//! Structured segment logging and subscriber setup.

use tracing::{error, info, warn, Span};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global subscriber.
///
/// `LOG_FORMAT=json` selects JSON lines; anything else gets the human
/// formatter. `RUST_LOG` directives are honored on top of the defaults.
pub fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let mut env_filter = EnvFilter::from_default_env();
    for directive in ["reelcut=info", "reelcut_media=info", "reelcut_worker=info", "ort=warn"] {
        if let Ok(directive) = directive.parse() {
            env_filter = env_filter.add_directive(directive);
        }
    }

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

/// Logger for one topic segment.
///
/// Every line carries the segment index and file stem so the output of
/// several segments can be told apart.
#[derive(Debug, Clone)]
pub struct SegmentLogger {
    index: usize,
    stem: String,
}

impl SegmentLogger {
    /// `index` is 1-based, matching the segment file naming.
    pub fn new(index: usize, stem: &str) -> Self {
        Self {
            index,
            stem: stem.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(segment = self.index, stem = %self.stem, "Segment started: {}", message);
    }

    pub fn log_progress(&self, message: &str) {
        info!(segment = self.index, stem = %self.stem, "Segment progress: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(segment = self.index, stem = %self.stem, "Segment warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(segment = self.index, stem = %self.stem, "Segment error: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(segment = self.index, stem = %self.stem, "Segment completed: {}", message);
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Span to instrument the segment's work with.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("segment", segment = self.index, stem = %self.stem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_logger_creation() {
        let logger = SegmentLogger::new(3, "12.50_Intro");
        assert_eq!(logger.index(), 3);
        assert_eq!(logger.stem(), "12.50_Intro");
    }
}
