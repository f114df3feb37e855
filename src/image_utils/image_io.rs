use crate::object_detection::object_detection_model::DetectorError;
use image::{self, RgbImage};
use std::path::Path;

pub fn read_image_as_rgb8(filepath: &Path) -> Result<RgbImage, DetectorError> {
    image::open(filepath)
        .map(|img| img.into_rgb8())
        .map_err(|e| image_error(filepath, e))
}

/// Width and height without decoding the pixels.
pub fn read_image_dimensions(filepath: &Path) -> Result<(u32, u32), DetectorError> {
    image::image_dimensions(filepath).map_err(|e| image_error(filepath, e))
}

fn image_error(filepath: &Path, error: image::ImageError) -> DetectorError {
    DetectorError::Image { path: filepath.to_path_buf(), reason: error.to_string() }
}
