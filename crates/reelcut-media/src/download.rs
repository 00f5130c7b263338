//! Video download using yt-dlp.

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::command::check_ytdlp;
use crate::error::{MediaError, MediaResult};

/// yt-dlp format selector.
const FORMAT: &str = "best";

/// yt-dlp arguments for downloading `url` to `output_path`.
fn download_args(url: &str, output_path: &Path) -> Vec<String> {
    vec![
        "-f".to_string(),
        FORMAT.to_string(),
        "--output".to_string(),
        output_path.to_string_lossy().to_string(),
        url.to_string(),
    ]
}

/// Download `url` to `output_path`.
///
/// An existing non-empty file at `output_path` is reused.
pub async fn download_video(url: &str, output_path: impl AsRef<Path>) -> MediaResult<()> {
    let output_path = output_path.as_ref();

    if let Ok(metadata) = tokio::fs::metadata(output_path).await {
        if metadata.is_file() && metadata.len() > 0 {
            info!("Using existing video file: {}", output_path.display());
            return Ok(());
        }
        warn!(
            "Existing file {} is empty, re-downloading",
            output_path.display()
        );
        tokio::fs::remove_file(output_path).await?;
    }

    check_ytdlp()?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    info!(url = %url, output = %output_path.display(), "Downloading video");

    let output = Command::new("yt-dlp")
        .args(download_args(url, output_path))
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
            "yt-dlp exited with {:?}: {}",
            output.status.code(),
            error_msg
        )));
    }

    let file_size = match tokio::fs::metadata(output_path).await {
        Ok(meta) if meta.len() > 0 => meta.len(),
        _ => {
            return Err(MediaError::download_failed(format!(
                "yt-dlp reported success but {} is missing or empty",
                output_path.display()
            )))
        }
    };

    info!(
        output = %output_path.display(),
        size_mb = file_size as f64 / (1024.0 * 1024.0),
        "Downloaded video successfully"
    );

    Ok(())
}
