use crate::annotations::detection::DetectionBox;
use crate::image_utils::image_io::read_image_dimensions;
use crate::object_detection::object_detection_model::{DetectorError, ObjectDetectionModel};
use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Reads detections that a YOLO run already wrote to disk.
///
/// Ultralytics' `predict` with `save_txt` and `save_conf` writes one `<image stem>.txt` per
/// image holding `class x_center y_center width height confidence` lines, with coordinates
/// normalized to the image size. Images without detections get no file at all.
#[derive(Clone, Debug)]
pub struct YoloTxtPredictions {
    predictions_dir: PathBuf,
    min_confidence: f64,
}

impl YoloTxtPredictions {
    pub fn new(predictions_dir: impl Into<PathBuf>, min_confidence: f64) -> Self {
        YoloTxtPredictions { predictions_dir: predictions_dir.into(), min_confidence }
    }

    pub fn prediction_path(&self, image_path: &Path) -> PathBuf {
        let mut file_name = image_path.file_stem().map(|s| s.to_os_string()).unwrap_or_default();
        file_name.push(".txt");
        self.predictions_dir.join(file_name)
    }
}

impl ObjectDetectionModel for YoloTxtPredictions {
    fn name(&self) -> &str {
        "yolo txt predictions"
    }

    fn detect(&mut self, image_path: &Path) -> Result<Vec<DetectionBox>, DetectorError> {
        let path = self.prediction_path(image_path);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No predictions for {}", image_path.display());
                return Ok(Vec::new());
            }
            Err(source) => return Err(DetectorError::Predictions { path, source }),
        };
        let (width, height) = read_image_dimensions(image_path)?;
        let mut detections = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let detection = parse_prediction_line(line, width as f64, height as f64).map_err(
                |reason| DetectorError::MalformedPrediction {
                    path: path.clone(),
                    line: index + 1,
                    reason,
                },
            )?;
            if detection.confidence >= self.min_confidence {
                detections.push(detection);
            }
        }
        Ok(detections)
    }
}

fn parse_prediction_line(line: &str, width: f64, height: f64) -> Result<DetectionBox, String> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 6 {
        return Err(format!(
            "expected `class x y w h conf`, found {} fields",
            fields.len()
        ));
    }
    let class_id: u32 = fields[0]
        .parse()
        .map_err(|_| format!("invalid class id {:?}", fields[0]))?;
    let mut values = [0.0_f64; 5];
    for (value, field) in values.iter_mut().zip(&fields[1..]) {
        *value = field.parse().map_err(|_| format!("invalid number {field:?}"))?;
    }
    let [x, y, w, h, confidence] = values;
    DetectionBox::new(x * width, y * height, w * width, h * height, confidence, class_id)
        .map_err(|e| e.to_string())
}
