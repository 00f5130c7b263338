//! The subject locator capability consumed by the reframer.

use reelcut_models::BoundingBox;

use crate::error::MediaResult;
use crate::frame::Frame;

/// Finds at most one subject in a frame.
///
/// Implementations answer each frame independently; callers must not assume
/// consecutive answers are temporally consistent. An `Err` is treated by the
/// reframer the same as `Ok(None)`.
pub trait SubjectLocator: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Locate the subject in `frame`, in source-frame pixel coordinates.
    fn locate(&self, frame: &Frame) -> MediaResult<Option<BoundingBox>>;
}

/// Locator that never finds anything, producing a static center crop.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSubjectLocator;

impl SubjectLocator for NoSubjectLocator {
    fn name(&self) -> &'static str {
        "none"
    }

    fn locate(&self, _frame: &Frame) -> MediaResult<Option<BoundingBox>> {
        Ok(None)
    }
}
