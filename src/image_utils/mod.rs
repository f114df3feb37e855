pub mod annotate;
#[cfg(feature = "onnx")]
pub mod image_conversion;
pub mod image_io;
