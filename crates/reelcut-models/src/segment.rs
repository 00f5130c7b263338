//! Topic segments produced by transcript segmentation.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Maximum number of characters kept from a topic in file names.
pub const MAX_LABEL_CHARS: usize = 50;

/// Topic used when the segmenter leaves one out.
pub const DEFAULT_TOPIC: &str = "NoTopic";

/// A time window of the source video about one topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicSegment {
    /// Short topic phrase
    pub topic: String,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
}

impl TopicSegment {
    /// Create a new topic segment.
    pub fn new(topic: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            topic: topic.into(),
            start,
            end,
        }
    }

    /// Duration in seconds (may be zero or negative for degenerate input).
    #[inline]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// File-name-safe label for the segment at 1-based `index`.
    ///
    /// Keeps alphanumerics, spaces, `_` and `-`, trims, and truncates to
    /// [`MAX_LABEL_CHARS`]. An empty topic falls back to `segment_{index}`.
    pub fn safe_label(&self, index: usize) -> String {
        let topic = if self.topic.trim().is_empty() {
            format!("segment_{}", index)
        } else {
            self.topic.clone()
        };

        let filtered: String = topic
            .chars()
            .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-'))
            .collect();

        filtered.trim().chars().take(MAX_LABEL_CHARS).collect()
    }

    /// Output file stem, e.g. `12.50_Politics as a Game`.
    pub fn file_stem(&self, index: usize) -> String {
        format!("{:.2}_{}", self.start, self.safe_label(index))
    }
}

/// A timestamp as returned by an LLM: either a JSON number or a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseSeconds {
    Number(f64),
    Text(String),
}

impl LooseSeconds {
    /// Parse into seconds.
    pub fn to_seconds(&self) -> ModelResult<f64> {
        match self {
            LooseSeconds::Number(n) => Ok(*n),
            LooseSeconds::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| ModelError::invalid_segment(format!("not a number of seconds: {:?}", s))),
        }
    }
}

impl Default for LooseSeconds {
    fn default() -> Self {
        LooseSeconds::Number(0.0)
    }
}

/// Segment exactly as emitted by the segmentation model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSegment {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub start: LooseSeconds,
    #[serde(default)]
    pub end: LooseSeconds,
}

/// Convert raw segments into validated topic segments sorted by start time.
///
/// Segments ending before they start are dropped; segments with unparseable
/// timestamps are an error.
pub fn normalize_segments(raw: Vec<RawSegment>) -> ModelResult<Vec<TopicSegment>> {
    let mut segments = Vec::with_capacity(raw.len());

    for seg in raw {
        let topic = seg
            .topic
            .as_deref()
            .unwrap_or(DEFAULT_TOPIC)
            .trim()
            .to_string();
        let start = seg.start.to_seconds()?;
        let end = seg.end.to_seconds()?;
        if end < start {
            continue;
        }
        segments.push(TopicSegment { topic, start, end });
    }

    segments.sort_by(|a, b| a.start.total_cmp(&b.start));
    Ok(segments)
}

/// Parse and normalize a JSON array of raw segments.
pub fn parse_segments_json(json: &str) -> ModelResult<Vec<TopicSegment>> {
    let raw: Vec<RawSegment> = serde_json::from_str(json)?;
    normalize_segments(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_sorts_and_filters() {
        let json = r#"[
            {"topic": " Medical Marijuana ", "start": "41.19", "end": "48.42"},
            {"topic": "Exchange of Political Insults", "start": 0.0, "end": 15.6},
            {"topic": "Backwards", "start": 30, "end": 20},
            {"start": 50, "end": 60}
        ]"#;
        let segments = parse_segments_json(json).unwrap();

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].topic, "Exchange of Political Insults");
        assert_eq!(segments[1].topic, "Medical Marijuana");
        assert!((segments[1].start - 41.19).abs() < 1e-9);
        assert_eq!(segments[2].topic, "NoTopic");
    }

    #[test]
    fn test_zero_length_segment_is_kept() {
        let segments = parse_segments_json(r#"[{"topic": "t", "start": 5, "end": 5}]"#).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].duration(), 0.0);
    }

    #[test]
    fn test_bad_timestamp_is_error() {
        let result = parse_segments_json(r#"[{"topic": "t", "start": "soon", "end": 5}]"#);
        assert!(matches!(result, Err(ModelError::InvalidSegment(_))));
    }

    #[test]
    fn test_safe_label() {
        let seg = TopicSegment::new("Project 2025 & Marijuana: Legalization?", 0.0, 1.0);
        assert_eq!(seg.safe_label(1), "Project 2025  Marijuana Legalization");

        let seg = TopicSegment::new("   ", 0.0, 1.0);
        assert_eq!(seg.safe_label(7), "segment_7");

        let seg = TopicSegment::new("x".repeat(80), 0.0, 1.0);
        assert_eq!(seg.safe_label(1).len(), MAX_LABEL_CHARS);
    }

    #[test]
    fn test_file_stem() {
        let seg = TopicSegment::new("Politics as a Game", 17.94, 41.19);
        assert_eq!(seg.file_stem(2), "17.94_Politics as a Game");

        let seg = TopicSegment::new("Intro", 0.0, 3.0);
        assert_eq!(seg.file_stem(1), "0.00_Intro");
    }
}
