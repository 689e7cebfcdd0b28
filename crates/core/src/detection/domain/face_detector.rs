use thiserror::Error;

use crate::shared::detection::FaceBox;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum DetectError {
    #[error("failed to load detector model: {0}")]
    ModelLoad(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("unexpected model output: {0}")]
    BadOutput(String),
}

/// Domain interface for face detection.
///
/// `detect` returns boxes ordered by descending confidence, in
/// source-frame pixel coordinates, every one at or above `confidence`
/// and inside the frame bounds. Deterministic for a fixed frame and
/// model. Implementations may be stateful, hence `&mut self`.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame, confidence: f64) -> Result<Vec<FaceBox>, DetectError>;
}
