use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;
use log::warn;

use crate::pipeline::events::PipelineEvent;
use crate::shared::constants::PREVIEW_FRAME_MS;
use crate::shared::detection::{Detection, FaceBox};
use crate::shared::frame::{Frame, PixelLayout};
use crate::shared::latest::Latest;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceStatus {
    Visible,
    /// The user closed the window out from under us.
    Closed,
}

/// Domain interface for an on-screen monitoring surface.
///
/// Implementations live with the hosting application (an OS window, a
/// test recorder). Closing the surface is not an error; it is reported
/// through the status so the pipeline can emit a toggle event.
pub trait PreviewSurface: Send {
    fn show(&mut self, frame: &Frame) -> Result<SurfaceStatus, Box<dyn std::error::Error>>;
}

/// Fully decoupled human-monitoring loop.
///
/// Consumes the same latest-value cells as everything else, overlays
/// the last known detection box, and blits at a bounded rate. Never
/// reads or writes camera state; disabling it changes nothing else.
pub struct PreviewLoop {
    surface: Box<dyn PreviewSurface>,
    frames: Latest<Frame>,
    detections: Latest<Detection>,
    enabled: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    events: Sender<PipelineEvent>,
}

impl PreviewLoop {
    pub fn new(
        surface: Box<dyn PreviewSurface>,
        frames: Latest<Frame>,
        detections: Latest<Detection>,
        enabled: Arc<AtomicBool>,
        running: Arc<AtomicBool>,
        events: Sender<PipelineEvent>,
    ) -> Self {
        Self {
            surface,
            frames,
            detections,
            enabled,
            running,
            events,
        }
    }

    pub fn run(mut self) {
        let budget = Duration::from_millis(PREVIEW_FRAME_MS);
        while self.running.load(Ordering::Relaxed) {
            if self.enabled.load(Ordering::Relaxed) {
                if let Some(frame) = self.frames.take() {
                    let shown = match self.detections.peek() {
                        Some(det) => draw_face_box(&frame, &det.face),
                        None => frame,
                    };
                    match self.surface.show(&shown) {
                        Ok(SurfaceStatus::Visible) => {}
                        Ok(SurfaceStatus::Closed) => {
                            // The hosting UI reconciles its toggle state.
                            self.enabled.store(false, Ordering::Relaxed);
                            let _ = self.events.send(PipelineEvent::PreviewToggle);
                        }
                        Err(e) => warn!("preview blit failed: {e}"),
                    }
                }
            }
            std::thread::sleep(budget);
        }
    }
}

/// Returns a copy of `frame` with a 2 px rectangle on the detection
/// box, clamped to the frame bounds.
pub fn draw_face_box(frame: &Frame, face: &FaceBox) -> Frame {
    const THICKNESS: i32 = 2;
    let width = frame.width() as i32;
    let height = frame.height() as i32;
    let layout = frame.layout();
    let channels = layout.channels() as usize;
    let (w, h, seq) = (frame.width(), frame.height(), frame.seq());
    let mut data = frame.clone().into_data();

    let mut paint = |x: i32, y: i32| {
        if x < 0 || y < 0 || x >= width || y >= height {
            return;
        }
        let i = (y as usize * width as usize + x as usize) * channels;
        match layout {
            PixelLayout::Mono8 => data[i] = 255,
            // Only luma is per-pixel in packed chroma.
            PixelLayout::Yuyv422 => data[i] = 255,
            PixelLayout::Rgb8 => {
                data[i] = 255;
                data[i + 1] = 0;
                data[i + 2] = 0;
            }
            PixelLayout::Bgr8 => {
                data[i] = 0;
                data[i + 1] = 0;
                data[i + 2] = 255;
            }
        }
    };

    for t in 0..THICKNESS {
        for x in face.start_x..=face.end_x {
            paint(x, face.start_y + t);
            paint(x, face.end_y - t);
        }
        for y in face.start_y..=face.end_y {
            paint(face.start_x + t, y);
            paint(face.end_x - t, y);
        }
    }

    Frame::new(data, w, h, layout, seq)
}
