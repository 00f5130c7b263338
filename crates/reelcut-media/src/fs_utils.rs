//! Filesystem helpers for media outputs.
//!
//! Encoders write into a [`TempArtifact`] next to (or in a work directory
//! away from) the final destination. The artifact removes itself when dropped
//! unless it was persisted, so a failed encode never leaves a partial file
//! behind under the final name.

use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// A file that is deleted on drop unless [`TempArtifact::persist`] succeeds.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
    persisted: bool,
}

impl TempArtifact {
    /// Reserve `{dir}/{stem}.partial.{extension}`.
    ///
    /// The extension is kept last so FFmpeg can still infer the container.
    pub fn in_dir(dir: impl AsRef<Path>, stem: &str, extension: &str) -> Self {
        let path = dir
            .as_ref()
            .join(format!("{}.partial.{}", stem, extension));
        Self {
            path,
            persisted: false,
        }
    }

    /// Temp artifact for `final_path`, placed in `work_dir`.
    pub fn for_output(work_dir: impl AsRef<Path>, final_path: &Path) -> Self {
        let stem = final_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string());
        let extension = final_path
            .extension()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "mp4".to_string());
        Self::in_dir(work_dir, &stem, &extension)
    }

    /// Path the producer should write to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check the artifact is non-empty and move it to `dst`.
    pub async fn persist(mut self, dst: impl AsRef<Path>) -> MediaResult<()> {
        ensure_nonempty(&self.path).await?;
        move_file(&self.path, dst.as_ref()).await?;
        self.persisted = true;
        Ok(())
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if self.persisted {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed partial artifact"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                "Failed to remove partial artifact: {}",
                e
            ),
        }
    }
}

/// Fail with [`MediaError::EmptyOutput`] unless `path` exists with data.
pub async fn ensure_nonempty(path: impl AsRef<Path>) -> MediaResult<u64> {
    let path = path.as_ref();
    match fs::metadata(path).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(meta.len()),
        _ => Err(MediaError::EmptyOutput(path.to_path_buf())),
    }
}

/// Move a file from `src` to `dst`, handling cross-device moves.
///
/// A plain rename is tried first; on EXDEV the file is copied next to the
/// destination and renamed into place.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if let Some(parent) = dst.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            tracing::debug!(
                "Cross-device rename, falling back to copy: {} -> {}",
                src.display(),
                dst.display()
            );
            copy_and_delete(src, dst).await
        }
        Err(e) => Err(MediaError::from(e)),
    }
}

/// EXDEV is 18 on Linux and macOS.
fn is_cross_device_error(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(18)
}

async fn copy_and_delete(src: &Path, dst: &Path) -> MediaResult<()> {
    let staging = dst.with_extension("moving");

    if let Err(e) = fs::copy(src, &staging).await {
        let _ = fs::remove_file(&staging).await;
        return Err(e.into());
    }

    if let Err(e) = fs::rename(&staging, dst).await {
        let _ = fs::remove_file(&staging).await;
        return Err(e.into());
    }

    if let Err(e) = fs::remove_file(src).await {
        tracing::warn!(
            "Failed to remove source after cross-device move: {}: {}",
            src.display(),
            e
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_dropped_artifact_is_removed() {
        let dir = TempDir::new().unwrap();
        let path = {
            let artifact = TempArtifact::in_dir(dir.path(), "reel", "mp4");
            fs::write(artifact.path(), b"partial").await.unwrap();
            assert!(artifact.path().to_string_lossy().ends_with("reel.partial.mp4"));
            artifact.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_persist_moves_into_place() {
        let dir = TempDir::new().unwrap();
        let dst = dir.path().join("out").join("12.50_Intro_centered.mp4");

        let artifact = TempArtifact::for_output(dir.path(), &dst);
        let tmp = artifact.path().to_path_buf();
        fs::write(&tmp, b"frames").await.unwrap();

        artifact.persist(&dst).await.unwrap();
        assert!(!tmp.exists());
        assert_eq!(fs::read(&dst).await.unwrap(), b"frames");
    }

    #[tokio::test]
    async fn test_persist_rejects_empty_output() {
        let dir = TempDir::new().unwrap();
        let dst = dir.path().join("final.mp4");

        let artifact = TempArtifact::for_output(dir.path(), &dst);
        let tmp = artifact.path().to_path_buf();
        fs::write(&tmp, b"").await.unwrap();

        let err = artifact.persist(&dst).await.unwrap_err();
        assert!(matches!(err, MediaError::EmptyOutput(_)));
        assert!(!tmp.exists(), "empty partial must be cleaned up");
        assert!(!dst.exists());
    }

    #[tokio::test]
    async fn test_ensure_nonempty_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(ensure_nonempty(dir.path().join("nope.mp4")).await.is_err());
    }

    #[test]
    fn test_is_cross_device_error() {
        assert!(is_cross_device_error(&std::io::Error::from_raw_os_error(18)));
        assert!(!is_cross_device_error(&std::io::Error::from_raw_os_error(2)));
    }
}
