//! Reframer metrics.
//!
//! Counters are recorded through the `metrics` facade; they are no-ops until
//! the host process installs a recorder.

use metrics::counter;

/// Metric names as constants for consistency.
pub mod names {
    pub const FRAMES_REFRAMED_TOTAL: &str = "reelcut_frames_reframed_total";
    pub const DETECTION_MISSES_TOTAL: &str = "reelcut_detection_misses_total";
    pub const STABLE_BOX_UPDATES_TOTAL: &str = "reelcut_stable_box_updates_total";
    pub const LOCATOR_ERRORS_TOTAL: &str = "reelcut_locator_errors_total";
}

/// Record one reframed frame for `locator`.
pub fn record_frame(locator: &'static str, detected: bool, stable_box_updated: bool) {
    counter!(names::FRAMES_REFRAMED_TOTAL, "locator" => locator).increment(1);
    if !detected {
        counter!(names::DETECTION_MISSES_TOTAL, "locator" => locator).increment(1);
    }
    if stable_box_updated {
        counter!(names::STABLE_BOX_UPDATES_TOTAL, "locator" => locator).increment(1);
    }
}

/// Record a locator call that returned an error.
pub fn record_locator_error(locator: &'static str) {
    counter!(names::LOCATOR_ERRORS_TOTAL, "locator" => locator).increment(1);
}
