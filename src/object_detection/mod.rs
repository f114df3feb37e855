pub mod object_detection_model;
pub mod object_detection_utils;
pub mod yolo_txt_predictions;
#[cfg(feature = "onnx")]
pub mod yolov11_bounding_box;
