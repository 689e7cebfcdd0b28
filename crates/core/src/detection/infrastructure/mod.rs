pub mod onnx_ssd_detector;
pub mod scripted_detector;
