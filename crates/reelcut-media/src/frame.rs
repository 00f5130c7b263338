//! Decoded frames and the sources that yield them.

use image::RgbImage;

use crate::error::MediaResult;

/// One decoded RGB frame and its position in the stream.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Zero-based index in decode order
    pub index: u64,
    /// Pixel data
    pub image: RgbImage,
}

impl Frame {
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self { index, image }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Raw interleaved RGB bytes.
    pub fn as_rgb_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }
}

/// Sequential producer of frames in presentation order.
///
/// `Ok(None)` marks the normal end of the stream.
pub trait FrameSource {
    /// Frame dimensions shared by every frame of the stream.
    fn dimensions(&self) -> (u32, u32);

    /// Decode the next frame.
    fn next_frame(&mut self) -> MediaResult<Option<Frame>>;
}

/// Frame source over images already in memory.
#[derive(Debug)]
pub struct MemoryFrameSource {
    frames: std::vec::IntoIter<RgbImage>,
    dimensions: (u32, u32),
    next_index: u64,
}

impl MemoryFrameSource {
    /// All images must share the first image's dimensions.
    pub fn new(images: Vec<RgbImage>) -> Self {
        let dimensions = images
            .first()
            .map(|img| img.dimensions())
            .unwrap_or((0, 0));
        Self {
            frames: images.into_iter(),
            dimensions,
            next_index: 0,
        }
    }
}

impl FrameSource for MemoryFrameSource {
    fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    fn next_frame(&mut self) -> MediaResult<Option<Frame>> {
        Ok(self.frames.next().map(|image| {
            let frame = Frame::new(self.next_index, image);
            self.next_index += 1;
            frame
        }))
    }
}
