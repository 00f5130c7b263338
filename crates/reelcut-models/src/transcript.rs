//! Timed transcript lines.

use serde::{Deserialize, Serialize};

/// One caption line of a timed transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptLine {
    /// Caption text
    pub text: String,
    /// Start time in seconds from the beginning of the source video
    pub start: f64,
    /// Display duration in seconds
    #[serde(default)]
    pub duration: f64,
}

impl TranscriptLine {
    /// Create a new transcript line.
    pub fn new(text: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            start,
            duration,
        }
    }

    /// End time in seconds.
    #[inline]
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    /// Text with embedded newlines collapsed to spaces.
    pub fn single_line_text(&self) -> String {
        self.text.replace('\n', " ")
    }
}

/// Render a transcript as `[start=S] text` lines for the segmentation prompt.
pub fn render_for_prompt(lines: &[TranscriptLine]) -> String {
    lines
        .iter()
        .map(|line| format!("[start={}] {}", line.start, line.single_line_text().trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_for_prompt() {
        let lines = vec![
            TranscriptLine::new("so tell me\nabout it ", 0.0, 2.5),
            TranscriptLine::new("well", 2.5, 1.0),
        ];
        assert_eq!(
            render_for_prompt(&lines),
            "[start=0] so tell me about it\n[start=2.5] well"
        );
    }

    #[test]
    fn test_deserialize_youtube_shape() {
        let json = r#"[{"text": "hi", "start": 1.25, "duration": 2.0}, {"text": "x", "start": 4}]"#;
        let lines: Vec<TranscriptLine> = serde_json::from_str(json).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].end(), 3.25);
        assert_eq!(lines[1].duration, 0.0);
    }
}
