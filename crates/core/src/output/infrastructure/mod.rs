pub mod frame_converter;
pub mod null_sink;
