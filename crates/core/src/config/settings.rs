use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::shared::constants::{
    DEFAULT_CONFIDENCE, DEFAULT_DEAD_ZONE_PX, DEFAULT_DETECTOR_FPS, DEFAULT_GRAB_TIMEOUT_MS,
    DEFAULT_LOST_AFTER_SECS,
};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One immutable settings snapshot, taken when the pipeline starts.
///
/// Hot reload belongs to the hosting application: it watches the file,
/// builds a new snapshot and restarts the loops with it. The core
/// never re-reads configuration mid-run.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Capture resolution requested from the camera, `[width, height]`.
    pub input_resolution: [u32; 2],
    /// Virtual-camera output resolution, `[width, height]`.
    pub output_resolution: [u32; 2],
    /// Output frame rate.
    pub fps: f64,
    /// Upper bound for the camera's auto-exposure search, microseconds.
    pub max_exposure_time: u64,
    /// Minimum face confidence admitted by the detector.
    pub confidence: f64,
    /// Half-width of the centering dead zone, pixels.
    pub dead_zone_px: i32,
    /// Detection loop rate cap, cycles per second.
    pub detector_fps: f64,
    /// Seconds without a fresh detection before tracking retires.
    pub lost_after_secs: f64,
    /// Bounded wait for a single frame grab, milliseconds.
    pub grab_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input_resolution: [1920, 1080],
            output_resolution: [1280, 720],
            fps: 30.0,
            max_exposure_time: 20_000,
            confidence: DEFAULT_CONFIDENCE,
            dead_zone_px: DEFAULT_DEAD_ZONE_PX,
            detector_fps: DEFAULT_DETECTOR_FPS,
            lost_after_secs: DEFAULT_LOST_AFTER_SECS,
            grab_timeout_ms: DEFAULT_GRAB_TIMEOUT_MS,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Acquisition cycles the controller waits before retiring a face.
    pub fn lost_after_frames(&self) -> u32 {
        (self.fps * self.lost_after_secs).ceil() as u32
    }
}
