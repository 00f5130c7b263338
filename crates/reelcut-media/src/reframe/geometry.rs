//! Crop geometry: where to cut a full-height portrait window out of a
//! landscape frame, and how to scale it to the output size.

use image::imageops::{self, FilterType};
use image::RgbImage;
use reelcut_models::CropRectangle;

/// Columns kept from a `frame_width`x`frame_height` frame so the crop has the
/// target aspect ratio at full frame height.
///
/// Never wider than the frame and never narrower than one column; a frame
/// narrower than the target aspect is kept whole and stretched on resize.
pub fn crop_width(frame_width: u32, frame_height: u32, target_width: u32, target_height: u32) -> u32 {
    debug_assert!(target_height > 0, "target height must be non-zero");
    let ideal = (target_width as f64 * frame_height as f64 / target_height as f64).round();
    (ideal as u32).max(1).min(frame_width)
}

/// Crop window centered on `center_x`, clamped inside the frame.
///
/// A window that would start left of column 0 is pinned to the left edge; one
/// that would run past `frame_width` is pinned to the right edge. The window
/// always has exactly [`crop_width`] columns.
pub fn compute_crop(
    frame_width: u32,
    frame_height: u32,
    target_width: u32,
    target_height: u32,
    center_x: f64,
) -> CropRectangle {
    let width = crop_width(frame_width, frame_height, target_width, target_height);
    let max_left = frame_width - width;

    let center_x = if center_x.is_finite() {
        center_x
    } else {
        frame_width as f64 / 2.0
    };
    let naive_left = (center_x - width as f64 / 2.0).floor();
    let left = naive_left.clamp(0.0, max_left as f64) as u32;

    let crop = CropRectangle::new(left, left + width);
    debug_assert!(crop.right <= frame_width);
    debug_assert_eq!(crop.width(), width);
    crop
}

/// Cut `crop` (full height) out of `image` and resize it to the target size.
pub fn crop_and_resize(
    image: &RgbImage,
    crop: CropRectangle,
    target_width: u32,
    target_height: u32,
) -> RgbImage {
    let (frame_width, frame_height) = image.dimensions();
    debug_assert!(crop.right <= frame_width, "crop exceeds frame");

    if crop.width() == frame_width && (frame_width, frame_height) == (target_width, target_height) {
        return image.clone();
    }

    let window = imageops::crop_imm(image, crop.left, 0, crop.width(), frame_height).to_image();
    imageops::resize(&window, target_width, target_height, FilterType::Triangle)
}
