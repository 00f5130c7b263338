//! Subject locators.
//!
//! | Locator | Backend | Result |
//! |---------|---------|--------|
//! | [`NoSubjectLocator`] | none | always none (center crop) |
//! | `YoloSubjectLocator` | YOLOv8 ONNX via `ort` | highest-confidence box of one COCO class |
//!
//! Use [`LocatorBuilder`] to pick one from configuration; a missing model
//! degrades to [`NoSubjectLocator`] rather than failing the run.

mod locator;
#[cfg(feature = "yolo")]
mod yolo;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

pub use locator::{NoSubjectLocator, SubjectLocator};
#[cfg(feature = "yolo")]
pub use yolo::{YoloConfig, YoloSubjectLocator};

use crate::error::{MediaError, MediaResult};

/// COCO class names (80 classes) in YOLOv8 output order.
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck",
    "boat", "traffic light", "fire hydrant", "stop sign", "parking meter", "bench",
    "bird", "cat", "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra",
    "giraffe", "backpack", "umbrella", "handbag", "tie", "suitcase", "frisbee",
    "skis", "snowboard", "sports ball", "kite", "baseball bat", "baseball glove",
    "skateboard", "surfboard", "tennis racket", "bottle", "wine glass", "cup",
    "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink",
    "refrigerator", "book", "clock", "vase", "scissors", "teddy bear", "hair drier",
    "toothbrush",
];

/// Default tracked class.
pub const PERSON_CLASS_ID: usize = 0;

/// Default model location, relative to the working directory.
pub const DEFAULT_MODEL_PATH: &str = "models/object_detection/yolov8n.onnx";

/// Look up a COCO class id by name (case-insensitive).
pub fn coco_class_id(name: &str) -> Option<usize> {
    let name = name.trim();
    COCO_CLASSES
        .iter()
        .position(|class| class.eq_ignore_ascii_case(name))
}

/// Chooses a [`SubjectLocator`] implementation.
#[derive(Debug, Clone)]
pub struct LocatorBuilder {
    model_path: PathBuf,
    class_id: usize,
    disabled: bool,
}

impl Default for LocatorBuilder {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            class_id: PERSON_CLASS_ID,
            disabled: false,
        }
    }
}

impl LocatorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// ONNX model to load.
    pub fn model_path(mut self, path: impl AsRef<Path>) -> Self {
        self.model_path = path.as_ref().to_path_buf();
        self
    }

    /// Track a COCO class by name, e.g. `"person"` or `"dog"`.
    pub fn class_name(mut self, name: &str) -> MediaResult<Self> {
        self.class_id = coco_class_id(name)
            .ok_or_else(|| MediaError::detection_failed(format!("unknown COCO class: {}", name)))?;
        Ok(self)
    }

    /// Skip detection entirely.
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Build the locator, degrading to [`NoSubjectLocator`] when the model
    /// cannot be used.
    pub fn build(self) -> Arc<dyn SubjectLocator> {
        if self.disabled {
            info!("Subject detection disabled, using static center crop");
            return Arc::new(NoSubjectLocator);
        }

        match self.build_detector() {
            Ok(locator) => locator,
            Err(e) => {
                warn!(
                    model_path = %self.model_path.display(),
                    "Subject detector unavailable, using static center crop: {}",
                    e
                );
                Arc::new(NoSubjectLocator)
            }
        }
    }

    #[cfg(feature = "yolo")]
    fn build_detector(&self) -> MediaResult<Arc<dyn SubjectLocator>> {
        let config = YoloConfig {
            model_path: self.model_path.clone(),
            class_id: self.class_id,
            ..YoloConfig::default()
        };
        let locator = YoloSubjectLocator::new(config)?;
        info!(
            class = COCO_CLASSES[self.class_id],
            "Building YOLO subject locator"
        );
        Ok(Arc::new(locator))
    }

    #[cfg(not(feature = "yolo"))]
    fn build_detector(&self) -> MediaResult<Arc<dyn SubjectLocator>> {
        Err(MediaError::detection_failed(
            "built without the `yolo` feature",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coco_classes() {
        assert_eq!(COCO_CLASSES.len(), 80);
        assert_eq!(COCO_CLASSES[PERSON_CLASS_ID], "person");
        assert_eq!(coco_class_id("Person"), Some(0));
        assert_eq!(coco_class_id(" dog "), Some(16));
        assert_eq!(coco_class_id("unicorn"), None);
    }

    #[test]
    fn test_unknown_class_is_rejected() {
        assert!(LocatorBuilder::new().class_name("unicorn").is_err());
    }

    #[test]
    fn test_missing_model_degrades_to_none() {
        let locator = LocatorBuilder::new()
            .model_path("/no/such/model.onnx")
            .build();
        assert_eq!(locator.name(), "none");
    }

    #[test]
    fn test_disabled_builder() {
        let locator = LocatorBuilder::new().disabled(true).build();
        assert_eq!(locator.name(), "none");
    }
}
