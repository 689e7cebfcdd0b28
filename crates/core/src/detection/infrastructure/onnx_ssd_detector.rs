/// ResNet-10 SSD face detector using ONNX Runtime via `ort`.
///
/// The network takes a fixed 300x300 BGR input with per-image mean
/// subtraction and emits `[1, 1, N, 7]` rows of
/// `[image_id, label, confidence, x1, y1, x2, y2]` with box corners
/// normalized to `[0, 1]`.
use std::path::Path;

use crate::detection::domain::face_detector::{DetectError, FaceDetector};
use crate::shared::detection::FaceBox;
use crate::shared::frame::{Frame, PixelLayout};

/// Fallback input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 300;

pub struct OnnxSsdDetector {
    session: ort::session::Session,
    input_size: u32,
}

impl OnnxSsdDetector {
    /// Load the SSD ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape
    /// (expecting NCHW). Falls back to 300 if the shape is dynamic.
    pub fn new(model_path: &Path) -> Result<Self, DetectError> {
        let session = ort::session::Session::builder()
            .and_then(|mut b| b.commit_from_file(model_path))
            .map_err(|e| DetectError::ModelLoad(e.to_string()))?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    if shape.len() >= 4 && shape[2] > 0 {
                        Some(shape[2] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        Ok(Self {
            session,
            input_size,
        })
    }
}

impl FaceDetector for OnnxSsdDetector {
    fn detect(&mut self, frame: &Frame, confidence: f64) -> Result<Vec<FaceBox>, DetectError> {
        let fw = frame.width();
        let fh = frame.height();

        let input_tensor = preprocess(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)
            .map_err(|e| DetectError::Inference(e.to_string()))?;
        let outputs = self
            .session
            .run(ort::inputs![input_value])
            .map_err(|e| DetectError::Inference(e.to_string()))?;
        if outputs.len() == 0 {
            return Err(DetectError::BadOutput("model produced no outputs".into()));
        }
        let tensor = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| DetectError::BadOutput(e.to_string()))?;
        let data = tensor
            .as_slice()
            .ok_or_else(|| DetectError::BadOutput("cannot view output tensor".into()))?;

        if data.len() % 7 != 0 {
            return Err(DetectError::BadOutput(format!(
                "expected rows of 7 values, got {} total",
                data.len()
            )));
        }

        let mut faces = Vec::new();
        for row in data.chunks_exact(7) {
            let conf = row[2] as f64;
            if conf < confidence {
                continue;
            }
            // Normalized corners scaled back into source-frame pixels.
            let start_x = ((row[3] as f64) * fw as f64) as i32;
            let start_y = ((row[4] as f64) * fh as f64) as i32;
            let end_x = ((row[5] as f64) * fw as f64) as i32;
            let end_y = ((row[6] as f64) * fh as f64) as i32;

            let start_x = start_x.clamp(0, fw as i32 - 1);
            let start_y = start_y.clamp(0, fh as i32 - 1);
            let end_x = end_x.clamp(start_x + 1, fw as i32);
            let end_y = end_y.clamp(start_y + 1, fh as i32);

            faces.push(FaceBox {
                confidence: conf,
                start_x,
                start_y,
                end_x,
                end_y,
            });
        }

        faces.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(faces)
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Resize to `size` x `size` (nearest-neighbor) and subtract the
/// frame's own per-channel mean, matching the original Caffe blob
/// preparation. Mono and packed-chroma frames contribute their luma to
/// all three channels.
fn preprocess(frame: &Frame, size: u32) -> ndarray::Array4<f32> {
    let fw = frame.width() as usize;
    let fh = frame.height() as usize;
    let target = size as usize;

    let bgr_at = |x: usize, y: usize| -> [f32; 3] {
        let src = frame.data();
        match frame.layout() {
            PixelLayout::Mono8 => {
                let v = src[y * fw + x] as f32;
                [v, v, v]
            }
            PixelLayout::Yuyv422 => {
                let v = src[(y * fw + x) * 2] as f32;
                [v, v, v]
            }
            PixelLayout::Bgr8 => {
                let i = (y * fw + x) * 3;
                [src[i] as f32, src[i + 1] as f32, src[i + 2] as f32]
            }
            PixelLayout::Rgb8 => {
                let i = (y * fw + x) * 3;
                [src[i + 2] as f32, src[i + 1] as f32, src[i] as f32]
            }
        }
    };

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, target, target));
    let mut sums = [0f64; 3];
    for ty in 0..target {
        let sy = (ty * fh / target).min(fh - 1);
        for tx in 0..target {
            let sx = (tx * fw / target).min(fw - 1);
            let px = bgr_at(sx, sy);
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = px[c];
                sums[c] += px[c] as f64;
            }
        }
    }

    let n = (target * target) as f64;
    for c in 0..3 {
        let mean = (sums[c] / n) as f32;
        tensor
            .slice_mut(ndarray::s![0, c, .., ..])
            .mapv_inplace(|v| v - mean);
    }
    tensor
}
