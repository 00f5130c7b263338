//! The streaming reframer: locate, stabilize, crop, resize, and hand each
//! frame to a sink, one frame at a time and in order.

use std::time::Instant;

use image::RgbImage;
use reelcut_models::{BoundingBox, CropRectangle, ReframeConfig};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::geometry::{compute_crop, crop_and_resize};
use super::stabilizer::{Stabilized, Stabilizer, Transition};
use crate::detection::SubjectLocator;
use crate::encode::FrameSink;
use crate::error::{MediaError, MediaResult};
use crate::frame::{Frame, FrameSource};
use crate::metrics;

/// One reframed output frame and how it was derived.
#[derive(Debug, Clone)]
pub struct ReframedFrame {
    /// Source frame index
    pub index: u64,
    /// Box the crop was centered on
    pub stable_box: BoundingBox,
    /// Rule that produced `stable_box`
    pub transition: Transition,
    /// Crop window in source pixels
    pub crop: CropRectangle,
    /// Output pixels at the target size
    pub image: RgbImage,
}

/// Counters for one reframing run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReframeStats {
    /// Frames written to the sink
    pub frames: u64,
    /// Frames where the locator found the subject
    pub detections: u64,
    /// Frames where the locator returned an error (treated as no detection)
    pub locator_errors: u64,
    /// Times the stable box was replaced
    pub stable_box_updates: u64,
    /// Whether the frame-center fallback was used at cold start
    pub used_fallback: bool,
}

impl ReframeStats {
    /// Frames without a detection.
    pub fn misses(&self) -> u64 {
        self.frames - self.detections
    }
}

/// Stateful per-video reframer.
#[derive(Debug)]
pub struct Reframer {
    config: ReframeConfig,
    stabilizer: Stabilizer,
}

impl Reframer {
    /// Create a reframer; rejects invalid configuration.
    pub fn new(config: ReframeConfig) -> MediaResult<Self> {
        config.validate()?;
        let stabilizer = Stabilizer::new(config.movement_threshold);
        Ok(Self { config, stabilizer })
    }

    pub fn config(&self) -> &ReframeConfig {
        &self.config
    }

    /// Current stable box.
    pub fn last_stable_box(&self) -> Option<BoundingBox> {
        self.stabilizer.last_stable()
    }

    /// Stabilize `detected` against prior frames and produce the output frame.
    pub fn process_frame(&mut self, frame: &Frame, detected: Option<BoundingBox>) -> ReframedFrame {
        let (frame_width, frame_height) = (frame.width(), frame.height());
        let Stabilized { bbox, transition } =
            self.stabilizer.update(detected, frame_width, frame_height);

        let crop = compute_crop(
            frame_width,
            frame_height,
            self.config.target_width,
            self.config.target_height,
            bbox.center_x,
        );
        let image = crop_and_resize(
            &frame.image,
            crop,
            self.config.target_width,
            self.config.target_height,
        );

        ReframedFrame {
            index: frame.index,
            stable_box: bbox,
            transition,
            crop,
            image,
        }
    }

    /// Drain `source` through `locator` into `sink`, then finish the sink.
    ///
    /// Locator errors are logged and count as "no detection". Decode and
    /// sink errors abort the run. A source with no frames is an error, since
    /// it would produce an empty video.
    pub fn run(
        &mut self,
        source: &mut dyn FrameSource,
        locator: &dyn SubjectLocator,
        sink: &mut dyn FrameSink,
    ) -> MediaResult<ReframeStats> {
        let (width, height) = source.dimensions();
        if width == 0 || height == 0 {
            return Err(MediaError::InvalidVideo(format!(
                "frame source has no usable dimensions ({}x{})",
                width, height
            )));
        }

        self.stabilizer.reset();
        let started = Instant::now();
        let mut stats = ReframeStats::default();

        info!(
            locator = locator.name(),
            source_width = width,
            source_height = height,
            target_width = self.config.target_width,
            target_height = self.config.target_height,
            movement_threshold = self.config.movement_threshold,
            "Reframing started"
        );

        while let Some(frame) = source.next_frame()? {
            let detected = match locator.locate(&frame) {
                Ok(found) => found,
                Err(e) => {
                    warn!(frame = frame.index, locator = locator.name(), "Locator failed, treating as no detection: {}", e);
                    stats.locator_errors += 1;
                    metrics::record_locator_error(locator.name());
                    None
                }
            };

            let out = self.process_frame(&frame, detected);
            sink.write_frame(&out.image)?;

            let updated = out.transition.updates_stable_box();
            stats.frames += 1;
            stats.detections += u64::from(detected.is_some());
            stats.stable_box_updates += u64::from(updated);
            stats.used_fallback |= out.transition == Transition::Fallback;
            metrics::record_frame(locator.name(), detected.is_some(), updated);

            if out.transition == Transition::Moved {
                debug!(
                    frame = out.index,
                    center_x = out.stable_box.center_x,
                    left = out.crop.left,
                    "Stable box moved"
                );
            }

            let interval = self.config.progress_interval;
            if interval > 0 && stats.frames % interval == 0 {
                let elapsed = started.elapsed().as_secs_f64();
                info!(
                    frames = stats.frames,
                    detections = stats.detections,
                    fps = if elapsed > 0.0 { stats.frames as f64 / elapsed } else { 0.0 },
                    "Reframing progress"
                );
            }
        }

        if stats.frames == 0 {
            return Err(MediaError::InvalidVideo("no frames decoded".to_string()));
        }

        sink.finish()?;

        info!(
            frames = stats.frames,
            detections = stats.detections,
            misses = stats.misses(),
            locator_errors = stats.locator_errors,
            stable_box_updates = stats.stable_box_updates,
            elapsed_secs = started.elapsed().as_secs_f64(),
            "Reframing complete"
        );

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::NoSubjectLocator;
    use crate::encode::MemorySink;
    use crate::frame::MemoryFrameSource;
    use std::sync::Mutex;

    struct FailingLocator;

    impl SubjectLocator for FailingLocator {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn locate(&self, _frame: &Frame) -> MediaResult<Option<BoundingBox>> {
            Err(MediaError::detection_failed("model exploded"))
        }
    }

    struct Scripted(Mutex<std::vec::IntoIter<Option<BoundingBox>>>);

    impl SubjectLocator for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn locate(&self, _frame: &Frame) -> MediaResult<Option<BoundingBox>> {
            Ok(self.0.lock().unwrap().next().flatten())
        }
    }

    fn small_config() -> ReframeConfig {
        ReframeConfig::new(20.0).with_target(9, 16).with_progress_interval(2)
    }

    fn frames(n: usize) -> MemoryFrameSource {
        MemoryFrameSource::new(vec![RgbImage::new(64, 36); n])
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert!(Reframer::new(ReframeConfig::new(-5.0)).is_err());
    }

    #[test]
    fn test_no_detections_give_static_center_crop() {
        let mut reframer = Reframer::new(small_config()).unwrap();
        let mut sink = MemorySink::new();

        let stats = reframer
            .run(&mut frames(5), &NoSubjectLocator, &mut sink)
            .unwrap();

        assert_eq!(stats.frames, 5);
        assert_eq!(stats.misses(), 5);
        assert!(stats.used_fallback);
        assert_eq!(stats.stable_box_updates, 1);
        assert!(sink.is_finished());
        assert!(sink.frames().iter().all(|f| f.dimensions() == (9, 16)));
        assert_eq!(reframer.last_stable_box(), Some(BoundingBox::frame_center(64, 36)));
    }

    #[test]
    fn test_locator_errors_are_absorbed() {
        let mut reframer = Reframer::new(small_config()).unwrap();
        let mut sink = MemorySink::new();

        let stats = reframer
            .run(&mut frames(3), &FailingLocator, &mut sink)
            .unwrap();

        assert_eq!(stats.frames, 3);
        assert_eq!(stats.locator_errors, 3);
        assert_eq!(sink.frames().len(), 3);
    }

    #[test]
    fn test_empty_source_is_an_error() {
        let mut reframer = Reframer::new(small_config()).unwrap();
        let mut sink = MemorySink::new();
        let mut source = MemoryFrameSource::new(Vec::new());

        assert!(reframer.run(&mut source, &NoSubjectLocator, &mut sink).is_err());
        assert!(!sink.is_finished());
    }

    #[test]
    fn test_state_does_not_leak_between_runs() {
        let mut reframer = Reframer::new(small_config()).unwrap();
        let subject = BoundingBox::new(60.0, 18.0, 4.0, 8.0);

        let locator = Scripted(Mutex::new(vec![Some(subject)].into_iter()));
        reframer
            .run(&mut frames(1), &locator, &mut MemorySink::new())
            .unwrap();
        assert_eq!(reframer.last_stable_box(), Some(subject));

        let stats = reframer
            .run(&mut frames(1), &NoSubjectLocator, &mut MemorySink::new())
            .unwrap();
        assert!(stats.used_fallback);
    }

    #[test]
    fn test_process_frame_follows_large_moves() {
        let mut reframer = Reframer::new(small_config()).unwrap();
        let frame = Frame::new(0, RgbImage::new(64, 36));

        let first = reframer.process_frame(&frame, Some(BoundingBox::new(5.0, 18.0, 4.0, 8.0)));
        assert!(first.crop.is_left_pinned());

        let jitter = reframer.process_frame(&frame, Some(BoundingBox::new(10.0, 18.0, 4.0, 8.0)));
        assert_eq!(jitter.transition, Transition::HeldNoise);
        assert_eq!(jitter.crop, first.crop);

        let moved = reframer.process_frame(&frame, Some(BoundingBox::new(63.0, 18.0, 4.0, 8.0)));
        assert_eq!(moved.transition, Transition::Moved);
        assert!(moved.crop.is_right_pinned(64));
    }
}
