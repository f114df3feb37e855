use crate::annotations::bounding_box::BoundingBoxError;
use crate::annotations::detection::DetectionBox;
use crate::image_utils::image_conversion::convert_rgb_image_to_model_input;
use crate::image_utils::image_io::read_image_as_rgb8;
use crate::object_detection::object_detection_model::{DetectorError, ObjectDetectionModel};
use crate::object_detection::object_detection_utils::non_maximum_suppression;
use log::debug;
use ndarray::{Axis, s};
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;

/// A YOLO detection model exported to ONNX, with `images` as input and `output0` holding
/// `(1, 4 + classes, candidates)` rows of `x_center, y_center, width, height, scores...`.
///
/// The onnxruntime session handles running the model on hardware.
pub struct Yolov11BoundingBox {
    session: Session,
    input_width: u32,
    input_height: u32,
    confidence: f32,
    iou_threshold: f64,
    model_name: String,
}

impl Yolov11BoundingBox {
    pub fn new(
        model_path: &Path,
        input_width: u32,
        input_height: u32,
        confidence: f32,
        iou_threshold: f64,
    ) -> ort::Result<Self> {
        let session = Session::builder()?.commit_from_file(model_path)?;
        let model_name = model_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "yolo onnx".to_string());
        Ok(Yolov11BoundingBox {
            session,
            input_width,
            input_height,
            confidence,
            iou_threshold,
            model_name,
        })
    }
}

/// Turns one output row into a box scaled to source pixels, or `None` when its best class
/// score does not reach `min_confidence`.
fn decode_candidate(
    row: &[f32],
    scale_x: f32,
    scale_y: f32,
    min_confidence: f32,
) -> Option<Result<DetectionBox, BoundingBoxError>> {
    let (class_id, prob) = row
        .iter()
        .skip(4) // skips bounding box coords.
        .copied()
        .enumerate()
        .reduce(|best, candidate| if candidate.1 > best.1 { candidate } else { best })?;
    // NaN scores fail this comparison too.
    if !(prob >= min_confidence) {
        return None;
    }
    Some(DetectionBox::new(
        (row[0] * scale_x) as f64,
        (row[1] * scale_y) as f64,
        (row[2] * scale_x) as f64,
        (row[3] * scale_y) as f64,
        prob as f64,
        class_id as u32,
    ))
}

fn inference_error(error: ort::Error) -> DetectorError {
    DetectorError::Inference(error.to_string())
}

impl ObjectDetectionModel for Yolov11BoundingBox {
    fn name(&self) -> &str {
        &self.model_name
    }

    fn detect(&mut self, image_path: &Path) -> Result<Vec<DetectionBox>, DetectorError> {
        let rgb_image = read_image_as_rgb8(image_path)?;
        let scale_x = rgb_image.width() as f32 / self.input_width as f32;
        let scale_y = rgb_image.height() as f32 / self.input_height as f32;
        let input_array =
            convert_rgb_image_to_model_input(&rgb_image, self.input_width, self.input_height);

        let input_tensor = TensorRef::from_array_view(&input_array).map_err(inference_error)?;
        let outputs = self
            .session
            .run(ort::inputs!["images" => input_tensor])
            .map_err(inference_error)?;
        let output = outputs["output0"]
            .try_extract_array::<f32>()
            .map_err(inference_error)?
            .t()
            .into_owned();
        let output = output.slice(s![.., .., 0]);

        let mut detections: Vec<DetectionBox> = Vec::new();
        for row in output.axis_iter(Axis(0)) {
            let row: Vec<_> = row.iter().copied().collect();
            match decode_candidate(&row, scale_x, scale_y, self.confidence) {
                Some(Ok(detection)) => detections.push(detection),
                Some(Err(e)) => debug!("{}: dropping candidate: {}", image_path.display(), e),
                None => {}
            }
        }
        Ok(non_maximum_suppression(detections, self.iou_threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::bounding_box::BoundingBoxGeometry;

    #[test]
    fn best_class_is_scaled_to_source_pixels() {
        let row = [320.0, 320.0, 64.0, 32.0, 0.1, 0.8];
        let detection = decode_candidate(&row, 2.0, 0.5, 0.25).unwrap().unwrap();
        assert_eq!(detection.annotation.class_id(), 1);
        assert_eq!(detection.annotation.center(), (640.0, 160.0));
        assert!((detection.confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn weak_and_nan_scores_are_dropped() {
        assert!(decode_candidate(&[1.0, 1.0, 1.0, 1.0, 0.2], 1.0, 1.0, 0.25).is_none());
        assert!(decode_candidate(&[1.0, 1.0, 1.0, 1.0, f32::NAN], 1.0, 1.0, 0.25).is_none());
        assert!(decode_candidate(&[1.0, 1.0, 1.0, 1.0], 1.0, 1.0, 0.25).is_none());
    }

    #[test]
    fn scores_above_one_are_rejected() {
        assert!(matches!(
            decode_candidate(&[1.0, 1.0, 1.0, 1.0, 1.5], 1.0, 1.0, 0.25),
            Some(Err(BoundingBoxError::InvalidConfidence(_)))
        ));
    }
}
