use std::collections::HashMap;
use std::time::Duration;

use crate::camera::domain::frame_source::{CameraError, CameraTransport, DeviceInfo, FrameSource};
use crate::camera::domain::geometry;
use crate::shared::frame::{Frame, PixelLayout};

const SENSOR_WIDTH: i64 = 1920;
const SENSOR_HEIGHT: i64 = 1080;

/// In-process stand-in for a machine-vision camera.
///
/// Keeps a register map with realistic ranges and increments, honors
/// the ROI registers when generating frames, and records one-shot
/// trigger invocations so tests can assert on controller behavior.
/// Frames are a mono gradient, which is enough to exercise the
/// pipeline without real optics.
pub struct SyntheticCamera {
    registers: HashMap<String, i64>,
    ranges: HashMap<String, (i64, i64, i64)>,
    triggers: Vec<String>,
    writes: Vec<(String, i64)>,
    frame_rate: f64,
    next_seq: u64,
    open: bool,
}

impl SyntheticCamera {
    pub fn new() -> Self {
        Self::with_increment(4)
    }

    /// Builds a camera whose geometry registers step by `increment`.
    pub fn with_increment(increment: i64) -> Self {
        let mut registers = HashMap::new();
        let mut ranges = HashMap::new();
        for (axis, value, min, max) in [
            (geometry::WIDTH, SENSOR_WIDTH, 16, SENSOR_WIDTH),
            (geometry::HEIGHT, SENSOR_HEIGHT, 16, SENSOR_HEIGHT),
            (geometry::OFFSET_X, 0, 0, SENSOR_WIDTH - 16),
            (geometry::OFFSET_Y, 0, 0, SENSOR_HEIGHT - 16),
        ] {
            registers.insert(axis.to_string(), value);
            ranges.insert(axis.to_string(), (min, max, increment));
        }
        Self {
            registers,
            ranges,
            triggers: Vec::new(),
            writes: Vec::new(),
            frame_rate: 30.0,
            next_seq: 0,
            open: true,
        }
    }

    /// One-shot triggers fired so far, in order.
    pub fn triggers(&self) -> &[String] {
        &self.triggers
    }

    /// Register writes applied so far, in order.
    pub fn writes(&self) -> &[(String, i64)] {
        &self.writes
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    fn lookup(&self, name: &str) -> Result<i64, CameraError> {
        // Range pseudo-registers: WidthMin, WidthMax, WidthInc, ...
        for (suffix, pick) in [
            ("Min", 0usize),
            ("Max", 1usize),
            ("Inc", 2usize),
        ] {
            if let Some(axis) = name.strip_suffix(suffix) {
                if let Some(r) = self.ranges.get(axis) {
                    return Ok([r.0, r.1, r.2][pick]);
                }
            }
        }
        self.registers
            .get(name)
            .copied()
            .ok_or_else(|| CameraError::UnknownParam(name.to_string()))
    }
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for SyntheticCamera {
    fn retrieve_frame(&mut self, _timeout: Duration) -> Result<Option<Frame>, CameraError> {
        if !self.open {
            return Err(CameraError::DeviceUnavailable("camera closed".into()));
        }
        let width = self.registers[geometry::WIDTH] as u32;
        let height = self.registers[geometry::HEIGHT] as u32;
        let offset_x = self.registers[geometry::OFFSET_X] as u32;

        // Horizontal gradient in absolute sensor coordinates, so ROI
        // moves are visible in the pixel data.
        let mut data = Vec::with_capacity((width * height) as usize);
        for _y in 0..height {
            for x in 0..width {
                data.push(((offset_x + x) % 256) as u8);
            }
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        Ok(Some(Frame::new(data, width, height, PixelLayout::Mono8, seq)))
    }

    fn read_param(&mut self, name: &str) -> Result<i64, CameraError> {
        self.lookup(name)
    }

    fn write_param(&mut self, name: &str, value: i64) -> Result<(), CameraError> {
        if !self.registers.contains_key(name) {
            return Err(CameraError::UnknownParam(name.to_string()));
        }
        self.registers.insert(name.to_string(), value);
        self.writes.push((name.to_string(), value));
        Ok(())
    }

    fn trigger_once(&mut self, name: &str) -> Result<(), CameraError> {
        self.triggers.push(name.to_string());
        Ok(())
    }

    fn has_param(&mut self, name: &str) -> bool {
        self.lookup(name).is_ok()
    }

    fn resulting_frame_rate(&mut self) -> f64 {
        self.frame_rate
    }

    fn close(&mut self) {
        self.open = false;
    }
}

/// Transport that enumerates a single synthetic device.
pub struct SyntheticTransport;

impl CameraTransport for SyntheticTransport {
    fn enumerate(&self) -> Vec<DeviceInfo> {
        vec![DeviceInfo {
            id: "synthetic:0".to_string(),
            friendly_name: "Synthetic Camera".to_string(),
        }]
    }

    fn open(&self, device: &DeviceInfo) -> Result<Box<dyn FrameSource>, CameraError> {
        if device.id != "synthetic:0" {
            return Err(CameraError::DeviceUnavailable(device.id.clone()));
        }
        Ok(Box::new(SyntheticCamera::new()))
    }
}
