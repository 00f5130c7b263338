//! End-to-end reframing of a short synthetic landscape clip.

use std::collections::VecDeque;
use std::sync::Mutex;

use image::{Rgb, RgbImage};
use reelcut_media::{
    Frame, FrameSink, MediaResult, MemoryFrameSource, MemorySink, Reframer, SubjectLocator,
    Transition,
};
use reelcut_models::{BoundingBox, CropRectangle, ReframeConfig};
use tokio_test::assert_ok;

/// Locator that replays a fixed list of answers, one per frame.
struct ScriptedLocator {
    answers: Mutex<VecDeque<Option<BoundingBox>>>,
}

impl ScriptedLocator {
    fn new(answers: Vec<Option<BoundingBox>>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
        }
    }
}

impl SubjectLocator for ScriptedLocator {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn locate(&self, _frame: &Frame) -> MediaResult<Option<BoundingBox>> {
        Ok(self.answers.lock().unwrap().pop_front().flatten())
    }
}

/// Sink that records frames and checks their size as they arrive.
struct CheckingSink {
    inner: MemorySink,
    expected: (u32, u32),
}

impl FrameSink for CheckingSink {
    fn write_frame(&mut self, image: &RgbImage) -> MediaResult<()> {
        assert_eq!(image.dimensions(), self.expected);
        self.inner.write_frame(image)
    }

    fn finish(&mut self) -> MediaResult<()> {
        self.inner.finish()
    }
}

/// 1920x1080 frame: dark everywhere except a bright band in the right-most
/// 100 columns.
fn landscape_frame() -> RgbImage {
    RgbImage::from_fn(1920, 1080, |x, _| {
        if x >= 1820 {
            Rgb([250, 250, 250])
        } else {
            Rgb([10, 10, 10])
        }
    })
}

fn subject(center_x: f64) -> BoundingBox {
    BoundingBox::new(center_x, 540.0, 200.0, 400.0)
}

#[test]
fn three_frame_interview_scenario() {
    let detections = vec![Some(subject(960.0)), Some(subject(965.0)), Some(subject(1900.0))];
    let config = ReframeConfig::new(150.0).with_target(1080, 1920);

    // Frame-level view: stable boxes, transitions and crops.
    let mut reframer = assert_ok!(Reframer::new(config.clone()));
    let frames: Vec<Frame> = (0..3).map(|i| Frame::new(i, landscape_frame())).collect();
    let outputs: Vec<_> = frames
        .iter()
        .zip(detections.iter())
        .map(|(frame, detected)| reframer.process_frame(frame, *detected))
        .collect();

    let centers: Vec<(f64, f64)> = outputs.iter().map(|o| o.stable_box.center()).collect();
    assert_eq!(centers, vec![(960.0, 540.0), (960.0, 540.0), (1900.0, 540.0)]);

    assert_eq!(
        outputs.iter().map(|o| o.transition).collect::<Vec<_>>(),
        vec![Transition::Acquired, Transition::HeldNoise, Transition::Moved]
    );

    // 1080 * 1080 / 1920 rounds to 608 columns.
    assert_eq!(outputs[0].crop, CropRectangle::new(656, 1264));
    assert_eq!(outputs[1].crop, outputs[0].crop);
    assert_eq!(outputs[2].crop, CropRectangle::new(1312, 1920));
    assert!(outputs[2].crop.is_right_pinned(1920));

    for out in &outputs {
        assert_eq!(out.image.dimensions(), (1080, 1920));
    }
    // Only the right-pinned crop sees the bright band.
    assert_eq!(outputs[0].image.get_pixel(1079, 960), &Rgb([10, 10, 10]));
    assert_eq!(outputs[2].image.get_pixel(1079, 960), &Rgb([250, 250, 250]));

    // Streaming view: the same clip through source, locator and sink.
    let mut reframer = assert_ok!(Reframer::new(config));
    let mut source = MemoryFrameSource::new(vec![landscape_frame(); 3]);
    let locator = ScriptedLocator::new(detections);
    let mut sink = CheckingSink {
        inner: MemorySink::new(),
        expected: (1080, 1920),
    };

    let stats = assert_ok!(reframer.run(&mut source, &locator, &mut sink));
    assert_eq!(stats.frames, 3);
    assert_eq!(stats.detections, 3);
    assert_eq!(stats.stable_box_updates, 2);
    assert!(!stats.used_fallback);
    assert!(sink.inner.is_finished());

    let written = sink.inner.into_frames();
    assert_eq!(written.len(), 3);
    assert_eq!(written[2], outputs[2].image);
}

#[test]
fn detector_that_never_fires_yields_center_crop() {
    let mut reframer = assert_ok!(Reframer::new(ReframeConfig::vertical_reel()));
    let mut source = MemoryFrameSource::new(vec![landscape_frame(); 4]);
    let locator = ScriptedLocator::new(vec![None; 4]);
    let mut sink = MemorySink::new();

    let stats = assert_ok!(reframer.run(&mut source, &locator, &mut sink));
    assert_eq!(stats.frames, 4);
    assert_eq!(stats.misses(), 4);
    assert!(stats.used_fallback);

    let frames = sink.into_frames();
    assert_eq!(frames.len(), 4);
    assert!(frames.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(
        reframer.last_stable_box(),
        Some(BoundingBox::frame_center(1920, 1080))
    );
}
