//! Hysteresis filter over per-frame detections.
//!
//! The detector runs independently on every frame, so its boxes jitter. The
//! stabilizer holds the last accepted ("stable") box and only moves to a new
//! detection once its center is at least `movement_threshold` pixels away.
//! Frames without a detection keep the stable box; if nothing has ever been
//! detected, a frame-center box is used.

use reelcut_models::BoundingBox;

/// Which rule produced the emitted box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing detected yet; synthesized the frame-center box
    Fallback,
    /// First detection became the stable box
    Acquired,
    /// No detection; kept the stable box
    Held,
    /// Detection within threshold; kept the stable box
    HeldNoise,
    /// Detection beyond threshold; it became the stable box
    Moved,
}

impl Transition {
    /// Whether the stable box was replaced by this step.
    pub fn updates_stable_box(self) -> bool {
        matches!(self, Transition::Fallback | Transition::Acquired | Transition::Moved)
    }
}

/// Box emitted for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stabilized {
    pub bbox: BoundingBox,
    pub transition: Transition,
}

/// Per-video stabilization state.
#[derive(Debug, Clone)]
pub struct Stabilizer {
    movement_threshold: f64,
    last_stable: Option<BoundingBox>,
}

impl Stabilizer {
    /// Create an empty stabilizer.
    pub fn new(movement_threshold: f64) -> Self {
        Self {
            movement_threshold,
            last_stable: None,
        }
    }

    pub fn movement_threshold(&self) -> f64 {
        self.movement_threshold
    }

    /// Current stable box, if any frame has been processed.
    pub fn last_stable(&self) -> Option<BoundingBox> {
        self.last_stable
    }

    /// Forget the stable box (start of a new video).
    pub fn reset(&mut self) {
        self.last_stable = None;
    }

    /// Advance by one frame of size `frame_width`x`frame_height`.
    pub fn update(
        &mut self,
        detected: Option<BoundingBox>,
        frame_width: u32,
        frame_height: u32,
    ) -> Stabilized {
        let (bbox, transition) = match (self.last_stable, detected) {
            (None, None) => (
                BoundingBox::frame_center(frame_width, frame_height),
                Transition::Fallback,
            ),
            (None, Some(d)) => (d, Transition::Acquired),
            (Some(s), None) => (s, Transition::Held),
            (Some(s), Some(d)) => {
                if d.center_distance(&s) < self.movement_threshold {
                    (s, Transition::HeldNoise)
                } else {
                    (d, Transition::Moved)
                }
            }
        };

        if transition.updates_stable_box() {
            self.last_stable = Some(bbox);
        }

        Stabilized { bbox, transition }
    }
}
