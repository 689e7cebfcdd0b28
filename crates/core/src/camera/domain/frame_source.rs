use std::time::Duration;

use thiserror::Error;

use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("unknown camera parameter: {0}")]
    UnknownParam(String),
    #[error("camera transport error: {0}")]
    Transport(String),
}

/// An enumerable physical camera, prior to opening.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: String,
    pub friendly_name: String,
}

/// Domain interface for discovering and opening cameras.
pub trait CameraTransport {
    fn enumerate(&self) -> Vec<DeviceInfo>;
    fn open(&self, device: &DeviceInfo) -> Result<Box<dyn FrameSource>, CameraError>;
}

/// An opened camera: frame grabs plus named register access.
///
/// Only the acquisition loop ever holds one, so all register writes
/// are serialized by construction. Parameter names follow the
/// GenICam-style conventions in [`crate::camera::domain::geometry`].
pub trait FrameSource: Send {
    /// Waits up to `timeout` for the next frame. `Ok(None)` means the
    /// grab timed out; a single missed frame is not fatal.
    fn retrieve_frame(&mut self, timeout: Duration) -> Result<Option<Frame>, CameraError>;

    fn read_param(&mut self, name: &str) -> Result<i64, CameraError>;

    fn write_param(&mut self, name: &str, value: i64) -> Result<(), CameraError>;

    /// Fires a camera-internal one-shot auto algorithm (exposure,
    /// gain, white balance). The camera adjusts once and holds.
    fn trigger_once(&mut self, name: &str) -> Result<(), CameraError>;

    /// Capability query: does this device expose the named parameter?
    fn has_param(&mut self, name: &str) -> bool;

    /// The frame rate the device actually delivers with its current
    /// configuration.
    fn resulting_frame_rate(&mut self) -> f64;

    fn close(&mut self);
}
