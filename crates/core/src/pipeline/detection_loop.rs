use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{info, warn};

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::detection::Detection;
use crate::shared::frame::Frame;
use crate::shared::latest::Latest;

/// The low-rate inference loop.
///
/// Consumes only the newest frame the acquisition loop handed off,
/// runs the detector, and publishes the single best face stamped with
/// a fresh `sequence_id`. Rate-capped because inference costs hundreds
/// of milliseconds; always decoupled so a long forward pass never
/// stalls acquisition.
///
/// A run with no admitted face clears the published detection only on
/// the transition from "had one" to "none": a single spurious miss
/// must not retire tracking, that decision is the controller's timeout.
/// Inference errors are logged and swallowed here; repeated failure
/// just stops fresh detections, and the controller's timeout retires
/// the face naturally.
pub struct DetectionLoop {
    detector: Box<dyn FaceDetector>,
    frames: Latest<Frame>,
    detections: Latest<Detection>,
    confidence: f64,
    cycle_budget: Duration,
    running: Arc<AtomicBool>,
}

impl DetectionLoop {
    pub fn new(
        detector: Box<dyn FaceDetector>,
        frames: Latest<Frame>,
        detections: Latest<Detection>,
        confidence: f64,
        detector_fps: f64,
        running: Arc<AtomicBool>,
    ) -> Self {
        let rate = if detector_fps > 0.0 { detector_fps } else { 1.0 };
        Self {
            detector,
            frames,
            detections,
            confidence,
            cycle_budget: Duration::from_secs_f64(1.0 / rate),
            running,
        }
    }

    pub fn run(mut self) {
        info!("detection loop started");
        let mut next_sequence_id: u64 = 1;
        let mut publishing = false;

        while self.running.load(Ordering::Relaxed) {
            let start = Instant::now();

            if let Some(frame) = self.frames.take() {
                match self.detector.detect(&frame, self.confidence) {
                    Ok(faces) => {
                        if let Some(best) = faces.first() {
                            self.detections.publish(Detection {
                                face: *best,
                                sequence_id: next_sequence_id,
                            });
                            next_sequence_id += 1;
                            publishing = true;
                        } else if publishing {
                            self.detections.clear();
                            publishing = false;
                        }
                    }
                    Err(e) => warn!("face detection failed: {e}"),
                }
            }

            // Sleep whatever remains of the cycle budget.
            let elapsed = start.elapsed();
            if elapsed < self.cycle_budget {
                std::thread::sleep(self.cycle_budget - elapsed);
            }
        }
        info!("detection loop finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_detector::DetectError;
    use crate::detection::infrastructure::scripted_detector::ScriptedDetector;
    use crate::shared::detection::FaceBox;
    use crate::shared::frame::PixelLayout;

    fn frame() -> Frame {
        Frame::new(vec![0u8; 30 * 30], 30, 30, PixelLayout::Mono8, 0)
    }

    fn face(conf: f64) -> FaceBox {
        FaceBox {
            confidence: conf,
            start_x: 5,
            start_y: 5,
            end_x: 15,
            end_y: 15,
        }
    }

    fn run_cycles(detector: Box<dyn FaceDetector>, frames_in: usize) -> Latest<Detection> {
        let frames = Latest::new();
        let detections = Latest::new();
        let running = Arc::new(AtomicBool::new(true));
        let looped = DetectionLoop::new(
            detector,
            frames.clone(),
            detections.clone(),
            0.7,
            200.0, // fast cycles for tests
            running.clone(),
        );
        let handle = std::thread::spawn(move || looped.run());
        for _ in 0..frames_in {
            frames.publish(frame());
            std::thread::sleep(Duration::from_millis(15));
        }
        running.store(false, Ordering::Relaxed);
        handle.join().unwrap();
        detections
    }

    #[test]
    fn test_publishes_best_face_with_sequence_id() {
        let detector = ScriptedDetector::new(vec![vec![face(0.8), face(0.95)]]);
        let detections = run_cycles(Box::new(detector), 1);
        let det = detections.peek().expect("detection should be published");
        assert_eq!(det.sequence_id, 1);
        assert!((det.face.confidence - 0.95).abs() < 1e-9);
    }

    #[test]
    fn test_sequence_id_increases_per_publication() {
        let detector = ScriptedDetector::new(vec![vec![face(0.9)], vec![face(0.9)]]);
        let detections = run_cycles(Box::new(detector), 2);
        let det = detections.peek().unwrap();
        assert!(det.sequence_id >= 2, "identical boxes still get fresh ids");
    }

    #[test]
    fn test_clears_on_transition_to_none() {
        let detector = ScriptedDetector::new(vec![vec![face(0.9)], vec![]]);
        let detections = run_cycles(Box::new(detector), 2);
        assert_eq!(detections.peek(), None);
    }

    #[test]
    fn test_no_face_from_the_start_publishes_nothing() {
        let detector = ScriptedDetector::new(vec![vec![]]);
        let detections = run_cycles(Box::new(detector), 2);
        assert_eq!(detections.peek(), None);
    }

    #[test]
    fn test_detector_error_is_contained() {
        struct FailingDetector;
        impl FaceDetector for FailingDetector {
            fn detect(
                &mut self,
                _frame: &Frame,
                _confidence: f64,
            ) -> Result<Vec<FaceBox>, DetectError> {
                Err(DetectError::Inference("backend exploded".into()))
            }
        }
        // The loop must survive repeated failures and publish nothing.
        let detections = run_cycles(Box::new(FailingDetector), 3);
        assert_eq!(detections.peek(), None);
    }

    #[test]
    fn test_error_does_not_clear_previous_detection() {
        struct FlakyDetector {
            calls: u32,
        }
        impl FaceDetector for FlakyDetector {
            fn detect(
                &mut self,
                _frame: &Frame,
                _confidence: f64,
            ) -> Result<Vec<FaceBox>, DetectError> {
                self.calls += 1;
                if self.calls == 1 {
                    Ok(vec![FaceBox {
                        confidence: 0.9,
                        start_x: 1,
                        start_y: 1,
                        end_x: 2,
                        end_y: 2,
                    }])
                } else {
                    Err(DetectError::Inference("flaky".into()))
                }
            }
        }
        let detections = run_cycles(Box::new(FlakyDetector { calls: 0 }), 3);
        // The last good detection stays; staleness is the controller's call.
        assert!(detections.peek().is_some());
    }
}
