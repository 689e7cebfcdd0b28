use std::time::{Duration, Instant};

use crate::output::domain::output_sink::{OutputSink, SinkError};
use crate::shared::frame::{Frame, PixelLayout};

/// Sink that counts frames and paces like a real virtual camera, but
/// publishes nowhere.
///
/// Stands in for the OS virtual-camera driver in tests and in the CLI
/// soak mode. Pacing is deadline-based: the next deadline advances by
/// one frame interval per `pacing_sleep`, so a slow cycle is not
/// compounded into the following ones.
pub struct NullSink {
    geometry: Option<(u32, u32, PixelLayout)>,
    interval: Duration,
    next_deadline: Option<Instant>,
    published: u64,
}

impl NullSink {
    pub fn new() -> Self {
        Self {
            geometry: None,
            interval: Duration::from_secs(1) / 30,
            next_deadline: None,
            published: 0,
        }
    }

    pub fn published(&self) -> u64 {
        self.published
    }

    pub fn is_open(&self) -> bool {
        self.geometry.is_some()
    }
}

impl Default for NullSink {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSink for NullSink {
    fn open(
        &mut self,
        width: u32,
        height: u32,
        fps: f64,
        layout: PixelLayout,
    ) -> Result<(), SinkError> {
        if fps <= 0.0 {
            return Err(SinkError::Unavailable(format!("invalid fps {fps}")));
        }
        self.geometry = Some((width, height, layout));
        self.interval = Duration::from_secs_f64(1.0 / fps);
        self.next_deadline = None;
        Ok(())
    }

    fn publish(&mut self, frame: &Frame) -> Result<(), SinkError> {
        let (width, height, _) = self.geometry.ok_or(SinkError::NotOpen)?;
        if frame.width() != width || frame.height() != height {
            return Err(SinkError::GeometryMismatch {
                got_width: frame.width(),
                got_height: frame.height(),
                want_width: width,
                want_height: height,
            });
        }
        self.published += 1;
        Ok(())
    }

    fn pacing_sleep(&mut self) {
        let now = Instant::now();
        let deadline = self.next_deadline.unwrap_or(now);
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
        self.next_deadline = Some(deadline.max(now) + self.interval);
    }

    fn frame_interval(&self) -> Duration {
        self.interval
    }

    fn close(&mut self) {
        self.geometry = None;
        self.next_deadline = None;
    }
}
