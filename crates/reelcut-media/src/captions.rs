//! Caption download using yt-dlp.
//!
//! Only the caption track is fetched (`--skip-download`). Uploaded subtitles
//! are preferred; yt-dlp falls back to automatic captions when none exist.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::command::check_ytdlp;
use crate::error::{MediaError, MediaResult};

/// Caption format requested from yt-dlp; timed events with millisecond offsets.
pub const CAPTION_FORMAT: &str = "json3";

/// Default caption language.
pub const DEFAULT_CAPTION_LANGUAGE: &str = "en";

/// yt-dlp arguments that write `{stem}.{lang}.json3` next to `stem`.
fn caption_args(url: &str, stem: &Path, language: &str) -> Vec<String> {
    vec![
        "--skip-download".to_string(),
        "--write-subs".to_string(),
        "--write-auto-subs".to_string(),
        "--sub-langs".to_string(),
        language.to_string(),
        "--sub-format".to_string(),
        CAPTION_FORMAT.to_string(),
        "--output".to_string(),
        format!("{}.%(ext)s", stem.to_string_lossy()),
        url.to_string(),
    ]
}

/// Path yt-dlp writes the caption track to for `stem` and `language`.
pub fn caption_path(stem: &Path, language: &str) -> PathBuf {
    let mut name = stem.as_os_str().to_os_string();
    name.push(format!(".{}.{}", language, CAPTION_FORMAT));
    PathBuf::from(name)
}

/// Download the `language` caption track of `url` next to `stem`.
///
/// Returns the written `.json3` file. A video without captions in that
/// language is a `DownloadFailed` error.
pub async fn fetch_captions(url: &str, stem: impl AsRef<Path>, language: &str) -> MediaResult<PathBuf> {
    let stem = stem.as_ref();
    let path = caption_path(stem, language);

    check_ytdlp()?;

    if let Some(parent) = stem.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    info!(url = %url, language, "Fetching captions");

    let output = Command::new("yt-dlp")
        .args(caption_args(url, stem, language))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!("yt-dlp stderr: {}", stderr);
        let error_msg = stderr.lines().last().unwrap_or("Unknown error");
        return Err(MediaError::download_failed(format!(
            "yt-dlp caption fetch exited with {:?}: {}",
            output.status.code(),
            error_msg
        )));
    }

    // yt-dlp exits 0 when the requested language has no track
    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.len() > 0 => {
            info!(path = %path.display(), "Captions downloaded");
            Ok(path)
        }
        _ => Err(MediaError::download_failed(format!(
            "no '{}' captions available for {}",
            language, url
        ))),
    }
}
