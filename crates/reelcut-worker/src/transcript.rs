//! Timed transcript loading.
//!
//! Transcripts are JSON arrays of `{text, start, duration}` objects, the shape
//! YouTube caption exporters produce. For YouTube sources the caption track
//! can be fetched directly and converted from yt-dlp's `json3` format.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use reelcut_media::fetch_captions;
use reelcut_models::TranscriptLine;
use serde::Deserialize;
use tracing::info;

use crate::error::{WorkerError, WorkerResult};
use crate::retry::RetryPolicy;

static VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:[?&]v=|youtu\.be/|/shorts/)([A-Za-z0-9_-]+)").expect("video id pattern is valid")
});

/// `json3` caption document.
#[derive(Debug, Deserialize)]
struct Json3Captions {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    #[serde(default)]
    t_start_ms: u64,
    #[serde(default)]
    d_duration_ms: u64,
    #[serde(default)]
    segs: Vec<Json3Seg>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

/// YouTube video id of `url` (`watch?v=`, `youtu.be/` or `/shorts/` forms).
pub fn video_id(url: &str) -> Option<&str> {
    VIDEO_ID
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Fetch the caption track of a YouTube `url` into `dir` and parse it.
pub async fn fetch_transcript(
    url: &str,
    dir: &Path,
    language: &str,
) -> WorkerResult<Vec<TranscriptLine>> {
    let id = video_id(url).ok_or_else(|| {
        WorkerError::transcript_failed(format!("Couldn't extract a video id from {}", url))
    })?;
    let stem = dir.join(format!("captions_{}", id));
    let stem = stem.as_path();

    let path = RetryPolicy::new("captions")
        .run(move || async move {
            fetch_captions(url, stem, language)
                .await
                .map_err(WorkerError::from)
        })
        .await
        .map_err(|e| WorkerError::transcript_failed(e.to_string()))?;

    let json = tokio::fs::read_to_string(&path).await?;
    let lines = parse_json3(&json)?;
    info!(video_id = id, lines = lines.len(), "Fetched transcript");
    Ok(lines)
}

/// Convert a `json3` caption document into transcript lines.
///
/// Events without text (window and line-break events of automatic captions)
/// are dropped; an empty result is an error.
pub fn parse_json3(json: &str) -> WorkerResult<Vec<TranscriptLine>> {
    let captions: Json3Captions = serde_json::from_str(json)?;
    let mut lines: Vec<TranscriptLine> = captions
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event.segs.iter().map(|s| s.utf8.as_str()).collect();
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            (!text.is_empty()).then(|| {
                TranscriptLine::new(
                    text,
                    event.t_start_ms as f64 / 1000.0,
                    event.d_duration_ms as f64 / 1000.0,
                )
            })
        })
        .collect();
    if lines.is_empty() {
        return Err(WorkerError::transcript_failed("captions have no text"));
    }
    lines.sort_by(|a, b| a.start.total_cmp(&b.start));
    Ok(lines)
}

/// Load a transcript file, ordered by start time.
pub async fn load_transcript(path: impl AsRef<Path>) -> WorkerResult<Vec<TranscriptLine>> {
    let path = path.as_ref();
    let json = tokio::fs::read_to_string(path).await.map_err(|e| {
        WorkerError::transcript_failed(format!("Failed to read {}: {}", path.display(), e))
    })?;

    let lines = parse_transcript(&json)?;
    info!(path = %path.display(), lines = lines.len(), "Loaded transcript");
    Ok(lines)
}

/// Parse transcript JSON; an empty transcript is an error.
pub fn parse_transcript(json: &str) -> WorkerResult<Vec<TranscriptLine>> {
    let mut lines: Vec<TranscriptLine> = serde_json::from_str(json)?;
    lines.retain(|l| l.start.is_finite() && l.duration.is_finite());
    if lines.is_empty() {
        return Err(WorkerError::transcript_failed("transcript has no lines"));
    }
    lines.sort_by(|a, b| a.start.total_cmp(&b.start));
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_transcript_sorts_lines() {
        let json = r#"[
            {"text": "second", "start": 4.0, "duration": 1.5},
            {"text": "first", "start": 0.5, "duration": 3.7}
        ]"#;
        let lines = parse_transcript(json).unwrap();
        assert_eq!(lines[0].text, "first");
        assert_eq!(lines[1].end(), 5.5);
    }

    #[test]
    fn test_empty_transcript_is_rejected() {
        assert!(matches!(
            parse_transcript("[]"),
            Err(WorkerError::TranscriptFailed(_))
        ));
        assert!(matches!(parse_transcript("{"), Err(WorkerError::Json(_))));
    }

    #[test]
    fn test_video_id_forms() {
        assert_eq!(video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ"), Some("dQw4w9WgXcQ"));
        assert_eq!(
            video_id("https://www.youtube.com/watch?list=PL1&v=abc_-12&t=30s"),
            Some("abc_-12")
        );
        assert_eq!(video_id("https://youtu.be/xyz987?si=share"), Some("xyz987"));
        assert_eq!(video_id("https://www.youtube.com/shorts/short1"), Some("short1"));
        assert_eq!(video_id("https://example.com/video.mp4"), None);
    }

    #[test]
    fn test_parse_json3() {
        let json = r#"{
            "wireMagic": "pb3",
            "events": [
                {"tStartMs": 0, "dDurationMs": 5000, "id": 1, "wWinId": 1},
                {"tStartMs": 2500, "dDurationMs": 1500,
                 "segs": [{"utf8": "In a garage,"}, {"utf8": " mostly.", "tOffsetMs": 400}]},
                {"tStartMs": 3900, "dDurationMs": 100, "aAppend": 1, "segs": [{"utf8": "\n"}]},
                {"tStartMs": 500, "dDurationMs": 2000, "segs": [{"utf8": "How did\nit start?"}]}
            ]
        }"#;
        let lines = parse_json3(json).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "How did it start?");
        assert_eq!(lines[0].start, 0.5);
        assert_eq!(lines[0].duration, 2.0);
        assert_eq!(lines[1].text, "In a garage, mostly.");
        assert_eq!(lines[1].end(), 4.0);
    }

    #[test]
    fn test_json3_without_text_is_rejected() {
        let json = r#"{"events": [{"tStartMs": 0, "dDurationMs": 10, "segs": [{"utf8": " "}]}]}"#;
        assert!(matches!(
            parse_json3(json),
            Err(WorkerError::TranscriptFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_requires_video_id() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = fetch_transcript("https://example.com/talk.mp4", dir.path(), "en")
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::TranscriptFailed(_)));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = load_transcript("/no/such/transcript.json").await.unwrap_err();
        assert!(matches!(err, WorkerError::TranscriptFailed(_)));
    }
}
