//! Cutting topic segments out of the source video.

use std::path::Path;
use tracing::{debug, info};

use reelcut_models::EncodingConfig;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::fs_utils::TempArtifact;

/// Re-encode `[start_secs, start_secs + duration)` of `input` into `output`.
///
/// The seek is placed after the input so the cut is frame accurate. The
/// result is written to a partial file next to `output` and moved into place
/// only if FFmpeg succeeds and produced data.
pub async fn extract_segment(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    start_secs: f64,
    duration: f64,
    encoding: &EncodingConfig,
) -> MediaResult<()> {
    let input = input.as_ref();
    let output = output.as_ref();

    if !input.exists() {
        return Err(MediaError::FileNotFound(input.to_path_buf()));
    }
    if !(duration > 0.0) {
        return Err(MediaError::InvalidVideo(format!(
            "segment duration must be positive (got {:.3}s)",
            duration
        )));
    }

    let out_dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(out_dir).await?;
    let artifact = TempArtifact::for_output(out_dir, output);

    info!(
        "Extracting segment: {} -> {} (start: {:.2}s, duration: {:.2}s)",
        input.display(),
        output.display(),
        start_secs,
        duration
    );

    let cmd = FfmpegCommand::new(input, artifact.path())
        .output_seek(start_secs)
        .duration(duration)
        .encoding(encoding);

    FfmpegRunner::new()
        .run_with_progress(&cmd, move |progress| {
            debug!(
                percent = progress.percentage(duration),
                speed = progress.speed,
                "Segment encode progress"
            );
        })
        .await
        .map_err(into_encode_error)?;

    artifact.persist(output).await?;

    info!("Segment extracted: {}", output.display());
    Ok(())
}

/// Report FFmpeg failures of an encode step as [`MediaError::EncodeFailed`].
fn into_encode_error(err: MediaError) -> MediaError {
    match err {
        MediaError::FfmpegFailed {
            message,
            stderr,
            exit_code,
        } => MediaError::EncodeFailed {
            message,
            stderr,
            exit_code,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_input() {
        let result = extract_segment(
            "/no/such/source.mp4",
            "/tmp/out.mp4",
            0.0,
            10.0,
            &EncodingConfig::default(),
        )
        .await;
        assert!(matches!(result, Err(MediaError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_zero_duration_is_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let result = extract_segment(
            file.path(),
            file.path().with_extension("out.mp4"),
            5.0,
            0.0,
            &EncodingConfig::default(),
        )
        .await;
        assert!(matches!(result, Err(MediaError::InvalidVideo(_))));
    }

    #[test]
    fn test_ffmpeg_failure_becomes_encode_failure() {
        let err = into_encode_error(MediaError::ffmpeg_failed("boom", Some("bad".into()), Some(1)));
        assert!(matches!(err, MediaError::EncodeFailed { exit_code: Some(1), .. }));
        assert_eq!(err.stderr(), Some("bad"));
    }
}
