use std::collections::VecDeque;

use crate::detection::domain::face_detector::{DetectError, FaceDetector};
use crate::shared::detection::FaceBox;
use crate::shared::frame::Frame;

/// Detector that replays a fixed script of per-call results.
///
/// Used by the pipeline tests and the CLI soak mode, where a real
/// network (and a real face) would make runs non-reproducible. Once
/// the script is exhausted the last entry repeats.
pub struct ScriptedDetector {
    script: VecDeque<Vec<FaceBox>>,
    last: Vec<FaceBox>,
    synthesize_centered: bool,
    calls: u64,
}

impl ScriptedDetector {
    pub fn new(script: Vec<Vec<FaceBox>>) -> Self {
        Self {
            script: script.into(),
            last: Vec::new(),
            synthesize_centered: false,
            calls: 0,
        }
    }

    /// A detector that always reports one face filling the central
    /// third of the frame.
    pub fn centered() -> Self {
        Self {
            synthesize_centered: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }

    fn centered_box(frame: &Frame) -> FaceBox {
        let w = frame.width() as i32;
        let h = frame.height() as i32;
        FaceBox {
            confidence: 0.95,
            start_x: w / 3,
            start_y: h / 3,
            end_x: 2 * w / 3,
            end_y: 2 * h / 3,
        }
    }
}

impl FaceDetector for ScriptedDetector {
    fn detect(&mut self, frame: &Frame, confidence: f64) -> Result<Vec<FaceBox>, DetectError> {
        self.calls += 1;
        let raw = match self.script.pop_front() {
            Some(step) => {
                self.last = step.clone();
                step
            }
            None if self.synthesize_centered => vec![Self::centered_box(frame)],
            None => self.last.clone(),
        };
        let mut faces: Vec<FaceBox> = raw
            .into_iter()
            .filter(|f| f.confidence >= confidence)
            .collect();
        faces.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(faces)
    }
}
