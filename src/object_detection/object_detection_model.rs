use crate::annotations::detection::DetectionBox;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("Failed to read image {}: {reason}", path.display())]
    Image { path: PathBuf, reason: String },
    #[error("Failed to read predictions {}: {source}", path.display())]
    Predictions { path: PathBuf, source: io::Error },
    #[error("Malformed prediction in {} line {line}: {reason}", path.display())]
    MalformedPrediction { path: PathBuf, line: usize, reason: String },
    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Defines a trait that all object detection models must follow.
///
/// This is the only place the rest of the crate meets a detector: whatever the backend
/// produces is turned into `DetectionBox` values in source image pixels, in the order the
/// backend reports them.
pub trait ObjectDetectionModel {
    fn name(&self) -> &str;

    fn detect(&mut self, image_path: &Path) -> Result<Vec<DetectionBox>, DetectorError>;
}
