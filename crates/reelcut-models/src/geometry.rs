//! Pixel-space geometry shared by the reframer and the crop engine.

use serde::{Deserialize, Serialize};

/// A single detected subject in source-frame pixel coordinates.
///
/// The center is authoritative for cropping; width and height are kept for
/// aspect bookkeeping and logging.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Center x-coordinate
    pub center_x: f64,
    /// Center y-coordinate
    pub center_y: f64,
    /// Box width
    pub width: f64,
    /// Box height
    pub height: f64,
}

impl BoundingBox {
    /// Create a new bounding box from its center and size.
    pub fn new(center_x: f64, center_y: f64, width: f64, height: f64) -> Self {
        Self {
            center_x,
            center_y,
            width,
            height,
        }
    }

    /// Build a center box from corner coordinates (x1, y1, x2, y2).
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            center_x: (x1 + x2) / 2.0,
            center_y: (y1 + y2) / 2.0,
            width: (x2 - x1).abs(),
            height: (y2 - y1).abs(),
        }
    }

    /// Box used when nothing has ever been detected: frame center, a third of
    /// the width and half of the height.
    pub fn frame_center(frame_width: u32, frame_height: u32) -> Self {
        let w = frame_width as f64;
        let h = frame_height as f64;
        Self {
            center_x: (w / 2.0).floor(),
            center_y: (h / 2.0).floor(),
            width: (w / 3.0).floor(),
            height: (h / 2.0).floor(),
        }
    }

    /// Center point.
    #[inline]
    pub fn center(&self) -> (f64, f64) {
        (self.center_x, self.center_y)
    }

    /// Euclidean distance between the centers of two boxes.
    #[inline]
    pub fn center_distance(&self, other: &BoundingBox) -> f64 {
        let dx = self.center_x - other.center_x;
        let dy = self.center_y - other.center_y;
        dx.hypot(dy)
    }
}

/// Horizontal crop window; the crop always spans the full frame height.
///
/// Invariant: `left <= right`, and `right - left` is the crop width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CropRectangle {
    /// First column included in the crop
    pub left: u32,
    /// One past the last column included in the crop
    pub right: u32,
}

impl CropRectangle {
    /// Create a new crop rectangle.
    pub fn new(left: u32, right: u32) -> Self {
        debug_assert!(left <= right, "crop left {} > right {}", left, right);
        Self { left, right }
    }

    /// Number of columns in the crop.
    #[inline]
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    /// Whether the crop is pinned against the left frame edge.
    pub fn is_left_pinned(&self) -> bool {
        self.left == 0
    }

    /// Whether the crop is pinned against the right frame edge.
    pub fn is_right_pinned(&self, frame_width: u32) -> bool {
        self.right == frame_width
    }
}
