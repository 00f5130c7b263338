//! YOLOv8 subject locator backed by ONNX Runtime.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::ArrayView2;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use reelcut_models::BoundingBox;
use tracing::{debug, info};

use super::locator::SubjectLocator;
use super::{COCO_CLASSES, DEFAULT_MODEL_PATH, PERSON_CLASS_ID};
use crate::error::{MediaError, MediaResult};
use crate::frame::Frame;

/// Number of COCO classes scored per candidate.
const NUM_CLASSES: usize = 80;
/// 4 box coordinates followed by the class scores.
const NUM_FEATURES: usize = 4 + NUM_CLASSES;

/// YOLO locator settings.
#[derive(Debug, Clone)]
pub struct YoloConfig {
    /// Path to ONNX model file
    pub model_path: PathBuf,
    /// COCO class to track
    pub class_id: usize,
    /// Minimum class score for a candidate
    pub confidence_threshold: f32,
    /// Square model input size
    pub input_size: u32,
}

impl Default for YoloConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            class_id: PERSON_CLASS_ID,
            confidence_threshold: 0.25,
            input_size: 640,
        }
    }
}

/// Highest-scoring candidate of the tracked class, in model input pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    cx: f32,
    cy: f32,
    w: f32,
    h: f32,
    score: f32,
}

/// Locates one subject class with a YOLOv8 model.
pub struct YoloSubjectLocator {
    session: Mutex<Session>,
    config: YoloConfig,
}

impl std::fmt::Debug for YoloSubjectLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloSubjectLocator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl YoloSubjectLocator {
    /// Load the model named by `config`.
    pub fn new(config: YoloConfig) -> MediaResult<Self> {
        if config.class_id >= NUM_CLASSES {
            return Err(MediaError::detection_failed(format!(
                "class id {} is outside the {} COCO classes",
                config.class_id, NUM_CLASSES
            )));
        }
        if !config.model_path.exists() {
            return Err(MediaError::model_not_found(
                config.model_path.to_string_lossy(),
            ));
        }

        let session = Mutex::new(create_session(&config.model_path)?);
        info!(
            model_path = %config.model_path.display(),
            class = COCO_CLASSES[config.class_id],
            input_size = config.input_size,
            "YOLO subject locator initialized"
        );

        Ok(Self { session, config })
    }

    pub fn config(&self) -> &YoloConfig {
        &self.config
    }

    /// Stretch-resize to the square model input and lay out as NCHW in [0, 1].
    fn preprocess(&self, image: &RgbImage) -> MediaResult<Value> {
        let size = self.config.input_size;
        let resized = imageops::resize(image, size, size, FilterType::Triangle);
        let plane = (size * size) as usize;

        let mut chw = vec![0f32; 3 * plane];
        for (i, pixel) in resized.pixels().enumerate() {
            chw[i] = pixel[0] as f32 / 255.0;
            chw[plane + i] = pixel[1] as f32 / 255.0;
            chw[2 * plane + i] = pixel[2] as f32 / 255.0;
        }

        let shape = vec![1usize, 3, size as usize, size as usize];
        Tensor::from_array((shape, chw.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| MediaError::detection_failed(format!("Failed to create tensor: {}", e)))
    }

    fn run_inference(&self, input: Value) -> MediaResult<Vec<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| MediaError::internal("Session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| MediaError::detection_failed(format!("ONNX inference failed: {}", e)))?;

        let output = outputs
            .get("output0")
            .ok_or_else(|| MediaError::detection_failed("Missing output0 tensor"))?;

        let tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| MediaError::detection_failed(format!("Failed to extract tensor: {}", e)))?;

        Ok(tensor.1.iter().copied().collect())
    }
}

impl SubjectLocator for YoloSubjectLocator {
    fn name(&self) -> &'static str {
        "yolo"
    }

    fn locate(&self, frame: &Frame) -> MediaResult<Option<BoundingBox>> {
        let input = self.preprocess(&frame.image)?;
        let output = self.run_inference(input)?;

        let best = best_candidate(
            &output,
            self.config.class_id,
            self.config.confidence_threshold,
        )?;

        let located = best.map(|c| {
            to_frame_box(c, self.config.input_size, frame.width(), frame.height())
        });
        if let Some(b) = &located {
            debug!(
                frame = frame.index,
                center_x = b.center_x,
                center_y = b.center_y,
                "Subject located"
            );
        }
        Ok(located)
    }
}

/// Pick the highest-scoring candidate of `class_id` from a `[1, 84, N]` output.
fn best_candidate(
    output: &[f32],
    class_id: usize,
    threshold: f32,
) -> MediaResult<Option<Candidate>> {
    if output.is_empty() || output.len() % NUM_FEATURES != 0 {
        return Err(MediaError::detection_failed(format!(
            "Unexpected output size {} (not a multiple of {})",
            output.len(),
            NUM_FEATURES
        )));
    }
    let num_boxes = output.len() / NUM_FEATURES;

    let features = ArrayView2::from_shape((NUM_FEATURES, num_boxes), output)
        .map_err(|e| MediaError::detection_failed(format!("Failed to reshape output: {}", e)))?;
    let rows = features.t();

    let mut best: Option<Candidate> = None;
    for row in rows.outer_iter() {
        let score = row[4 + class_id];
        if score < threshold || best.is_some_and(|b| b.score >= score) {
            continue;
        }
        best = Some(Candidate {
            cx: row[0],
            cy: row[1],
            w: row[2],
            h: row[3],
            score,
        });
    }

    Ok(best)
}

/// Scale a model-space candidate back to source-frame pixels.
fn to_frame_box(c: Candidate, input_size: u32, frame_width: u32, frame_height: u32) -> BoundingBox {
    let scale_w = frame_width as f64 / input_size as f64;
    let scale_h = frame_height as f64 / input_size as f64;

    let x1 = ((c.cx - c.w / 2.0) as f64 * scale_w).clamp(0.0, frame_width as f64);
    let y1 = ((c.cy - c.h / 2.0) as f64 * scale_h).clamp(0.0, frame_height as f64);
    let x2 = ((c.cx + c.w / 2.0) as f64 * scale_w).clamp(0.0, frame_width as f64);
    let y2 = ((c.cy + c.h / 2.0) as f64 * scale_h).clamp(0.0, frame_height as f64);

    BoundingBox::from_corners(x1, y1, x2, y2)
}

fn create_session(model_path: &Path) -> MediaResult<Session> {
    let model_bytes = std::fs::read(model_path)?;

    Session::builder()
        .map_err(|e| MediaError::internal(format!("Failed to create session builder: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| MediaError::internal(format!("Failed to set optimization level: {}", e)))?
        .commit_from_memory(&model_bytes)
        .map_err(|e| MediaError::internal(format!("Failed to load ONNX model: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a `[84, n]` feature-major output from per-candidate rows.
    fn output_from(candidates: &[([f32; 4], usize, f32)]) -> Vec<f32> {
        let n = candidates.len();
        let mut out = vec![0f32; NUM_FEATURES * n];
        for (i, (bbox, class, score)) in candidates.iter().enumerate() {
            for (k, v) in bbox.iter().enumerate() {
                out[k * n + i] = *v;
            }
            out[(4 + class) * n + i] = *score;
        }
        out
    }

    #[test]
    fn test_best_candidate_picks_highest_score_of_class() {
        let output = output_from(&[
            ([100.0, 100.0, 50.0, 80.0], 0, 0.40),
            ([320.0, 300.0, 60.0, 200.0], 0, 0.90),
            ([500.0, 300.0, 60.0, 60.0], 2, 0.99),
        ]);

        let best = best_candidate(&output, 0, 0.25).unwrap().unwrap();
        assert_eq!(best.cx, 320.0);
        assert!((best.score - 0.90).abs() < 1e-6);

        let car = best_candidate(&output, 2, 0.25).unwrap().unwrap();
        assert_eq!(car.cx, 500.0);
    }

    #[test]
    fn test_best_candidate_respects_threshold() {
        let output = output_from(&[([100.0, 100.0, 50.0, 80.0], 0, 0.10)]);
        assert!(best_candidate(&output, 0, 0.25).unwrap().is_none());
    }

    #[test]
    fn test_best_candidate_rejects_bad_shape() {
        assert!(best_candidate(&[0.0; 85], 0, 0.25).is_err());
        assert!(best_candidate(&[], 0, 0.25).is_err());
    }

    #[test]
    fn test_to_frame_box_scales_to_source() {
        let c = Candidate {
            cx: 320.0,
            cy: 320.0,
            w: 64.0,
            h: 128.0,
            score: 0.9,
        };
        let b = to_frame_box(c, 640, 1920, 1080);
        assert!((b.center_x - 960.0).abs() < 1e-6);
        assert!((b.center_y - 540.0).abs() < 1e-6);
        assert!((b.width - 192.0).abs() < 1e-6);
        assert!((b.height - 216.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_model() {
        let config = YoloConfig {
            model_path: PathBuf::from("/no/such/yolov8n.onnx"),
            ..YoloConfig::default()
        };
        assert!(matches!(
            YoloSubjectLocator::new(config),
            Err(MediaError::ModelNotFound(_))
        ));
    }
}
