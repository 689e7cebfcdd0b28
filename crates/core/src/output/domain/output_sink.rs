use std::time::Duration;

use thiserror::Error;

use crate::shared::frame::{Frame, PixelLayout};

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("virtual camera unavailable: {0}")]
    Unavailable(String),
    #[error("sink not open")]
    NotOpen,
    #[error("frame geometry {got_width}x{got_height} does not match sink {want_width}x{want_height}")]
    GeometryMismatch {
        got_width: u32,
        got_height: u32,
        want_width: u32,
        want_height: u32,
    },
}

/// Domain interface for the OS-facing virtual webcam.
///
/// `pacing_sleep` is the acquisition loop's own rate limiter: it
/// sleeps until the next output-frame deadline and is never a
/// cross-loop wait.
pub trait OutputSink: Send {
    fn open(
        &mut self,
        width: u32,
        height: u32,
        fps: f64,
        layout: PixelLayout,
    ) -> Result<(), SinkError>;

    fn publish(&mut self, frame: &Frame) -> Result<(), SinkError>;

    fn pacing_sleep(&mut self);

    fn frame_interval(&self) -> Duration;

    fn close(&mut self);
}
