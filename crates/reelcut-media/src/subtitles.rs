//! ASS subtitle generation for topic chunks.
//!
//! Every chunk gets its own script with times relative to the chunk start,
//! using a single big centered style with a short fade on each line.

use std::fmt::Write as _;
use std::path::Path;

use reelcut_models::TranscriptLine;
use tracing::debug;

use crate::error::MediaResult;

/// Name of the only style in generated scripts.
pub const STYLE_NAME: &str = "TikTokFunky";

/// Style overrides applied when burning subtitles into a reel.
pub const BURN_IN_FORCE_STYLE: &str = "FontName=Arial,FontSize=24";

/// Fade-in/out tag prepended to every dialogue line.
const FADE_TAG: &str = r"{\fad(500,500)}";

const ASS_HEADER: &str = "\
[Script Info]
ScriptType: v4.00+
PlayResX: 1280
PlayResY: 720
Title: TikTok-Style Subtitles
ScaledBorderAndShadow: yes

[V4+ Styles]
Format: Name,Fontname,Fontsize,PrimaryColour,OutlineColour,BackColour,Bold,Italic,Underline,StrikeOut,ScaleX,ScaleY,Spacing,BorderStyle,Outline,Shadow,Alignment,MarginL,MarginR,MarginV,Encoding
Style: TikTokFunky,Comic Sans MS,60,&H00FFB7FF,&H00000000,&H00000000,1,0,0,0,100,100,0,1,3,1,5,10,10,30,0

[Events]
Format: Layer,Start,End,Style,Name,MarginL,MarginR,MarginV,Effect,Text
";

/// Format seconds as an ASS timestamp `H:MM:SS.cc`; negatives clamp to zero.
pub fn ass_timestamp(seconds: f64) -> String {
    let total_cs = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 100.0).round() as u64
    } else {
        0
    };
    let cs = total_cs % 100;
    let total_secs = total_cs / 100;
    format!(
        "{}:{:02}:{:02}.{:02}",
        total_secs / 3600,
        (total_secs % 3600) / 60,
        total_secs % 60,
        cs
    )
}

/// Dialogue text: single line, commas replaced by full-width commas, fade tag.
fn dialogue_text(line: &TranscriptLine) -> String {
    format!("{}{}", FADE_TAG, line.single_line_text().replace(',', "，"))
}

/// Build a complete ASS script for the chunk `[chunk_start, chunk_end)`.
///
/// Lines entirely outside the chunk are skipped; the rest are shifted to be
/// chunk-relative and cut off at the chunk end.
pub fn build_ass(lines: &[TranscriptLine], chunk_start: f64, chunk_end: f64) -> String {
    let mut script = String::from(ASS_HEADER);
    let mut dialogues = Vec::new();

    for line in lines {
        let start = line.start;
        let end = line.end().min(chunk_end);
        if start >= chunk_end || end <= chunk_start {
            continue;
        }

        let mut dialogue = String::new();
        let _ = write!(
            dialogue,
            "Dialogue: 0,{},{},{},,0,0,0,,{}",
            ass_timestamp(start - chunk_start),
            ass_timestamp(end - chunk_start),
            STYLE_NAME,
            dialogue_text(line)
        );
        dialogues.push(dialogue);
    }

    script.push_str(&dialogues.join("\n"));
    script
}

/// Write the chunk script to `path`; returns the number of dialogue lines.
pub async fn write_ass_file(
    path: impl AsRef<Path>,
    lines: &[TranscriptLine],
    chunk_start: f64,
    chunk_end: f64,
) -> MediaResult<usize> {
    let path = path.as_ref();
    let script = build_ass(lines, chunk_start, chunk_end);
    let count = script.lines().filter(|l| l.starts_with("Dialogue:")).count();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(path, script).await?;

    debug!(path = %path.display(), dialogues = count, "Wrote subtitles");
    Ok(count)
}

/// Escape a path for use inside a single-quoted filter option value.
///
/// Backslashes and colons are escaped for the option parser; a quote closes
/// the quoted span, emits an escaped quote, and reopens it.
pub fn escape_filter_path(path: &Path) -> String {
    let raw = path.to_string_lossy();
    let mut escaped = String::with_capacity(raw.len() + 8);
    for c in raw.chars() {
        match c {
            '\\' => escaped.push_str(r"\\"),
            ':' => escaped.push_str(r"\:"),
            '\'' => escaped.push_str(r"'\\\''"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// `subtitles` filter that burns `ass_path` into the video.
pub fn subtitles_filter(ass_path: &Path) -> String {
    format!(
        "subtitles='{}':force_style='{}'",
        escape_filter_path(ass_path),
        BURN_IN_FORCE_STYLE
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ass_timestamp() {
        assert_eq!(ass_timestamp(0.0), "0:00:00.00");
        assert_eq!(ass_timestamp(-3.0), "0:00:00.00");
        assert_eq!(ass_timestamp(61.257), "0:01:01.26");
        assert_eq!(ass_timestamp(3725.5), "1:02:05.50");
        // Rounds up into the next second instead of printing ".100".
        assert_eq!(ass_timestamp(9.999), "0:00:10.00");
    }

    #[test]
    fn test_build_ass_clips_to_chunk() {
        let lines = vec![
            TranscriptLine::new("before", 0.0, 5.0),
            TranscriptLine::new("straddles, start", 8.0, 4.0),
            TranscriptLine::new("inside\nthe chunk", 12.0, 3.0),
            TranscriptLine::new("runs past end", 18.5, 5.0),
            TranscriptLine::new("after", 20.0, 2.0),
        ];
        let script = build_ass(&lines, 10.0, 20.0);
        let dialogues: Vec<&str> = script
            .lines()
            .filter(|l| l.starts_with("Dialogue:"))
            .collect();

        assert_eq!(dialogues.len(), 3);
        assert_eq!(
            dialogues[0],
            r"Dialogue: 0,0:00:00.00,0:00:02.00,TikTokFunky,,0,0,0,,{\fad(500,500)}straddles， start"
        );
        assert_eq!(
            dialogues[1],
            r"Dialogue: 0,0:00:02.00,0:00:05.00,TikTokFunky,,0,0,0,,{\fad(500,500)}inside the chunk"
        );
        assert!(dialogues[2].starts_with("Dialogue: 0,0:00:08.50,0:00:10.00,"));
        assert!(script.starts_with("[Script Info]"));
        assert!(script.contains("Style: TikTokFunky,Comic Sans MS,60,&H00FFB7FF"));
    }

    #[test]
    fn test_empty_chunk_has_header_only() {
        let script = build_ass(&[], 0.0, 10.0);
        assert!(script.ends_with("Text\n"));
    }

    #[tokio::test]
    async fn test_write_ass_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("segments").join("0.00_Intro.ass");
        let lines = vec![TranscriptLine::new("hello", 1.0, 1.0)];

        let count = write_ass_file(&path, &lines, 0.0, 5.0).await.unwrap();
        assert_eq!(count, 1);
        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(written.contains("}hello"));
    }

    #[test]
    fn test_subtitles_filter_escaping() {
        let filter = subtitles_filter(Path::new("/tmp/out/12.50_Intro.ass"));
        assert_eq!(
            filter,
            "subtitles='/tmp/out/12.50_Intro.ass':force_style='FontName=Arial,FontSize=24'"
        );

        assert_eq!(escape_filter_path(Path::new("C:/a b/x.ass")), r"C\:/a b/x.ass");
        assert_eq!(escape_filter_path(Path::new("/it's.ass")), r"/it'\\\''s.ass");
    }
}
