pub const SSD_MODEL_NAME: &str = "res10_300x300_ssd.onnx";
pub const SSD_MODEL_URL: &str =
    "https://github.com/autocam-dev/autocam/releases/download/v0.1.0/res10_300x300_ssd.onnx";

/// Minimum confidence for a detection to be admitted at all.
pub const DEFAULT_CONFIDENCE: f64 = 0.7;

/// Detector cycle rate cap; inference is expensive relative to grabs.
pub const DEFAULT_DETECTOR_FPS: f64 = 2.0;

/// Bounded wait for a single frame grab.
pub const DEFAULT_GRAB_TIMEOUT_MS: u64 = 5000;

/// Half-width of the centering dead zone around the frame center.
pub const DEFAULT_DEAD_ZONE_PX: i32 = 150;

/// Seconds without a fresh detection before tracking is retired.
pub const DEFAULT_LOST_AFTER_SECS: f64 = 11.0;

/// An average-fps sample is emitted every this many acquisition cycles.
pub const FPS_REPORT_PERIOD: u64 = 10;

/// Preview redraw budget per frame.
pub const PREVIEW_FRAME_MS: u64 = 30;
