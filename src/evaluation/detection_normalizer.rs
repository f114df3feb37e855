use crate::annotations::bounding_box::BoundingBoxGeometry;
use crate::annotations::detection::DetectionBox;
use crate::annotations::point::Point;
use crate::evaluation::detection_record::DetectionRecord;
use crate::evaluation::label_oracle::LabelOracle;
use crate::geo::geo_transform::GeoTransform;
use crate::geo::raster_metadata::RasterMetadata;
use log::{debug, warn};
use std::path::Path;

/// Turns one image's detector output into result records.
pub struct DetectionNormalizer<R: RasterMetadata> {
    labels: LabelOracle,
    raster: R,
}

impl<R: RasterMetadata> DetectionNormalizer<R> {
    pub fn new(dataset_root: &Path, raster: R) -> Self {
        DetectionNormalizer { labels: LabelOracle::new(dataset_root), raster }
    }

    /// Emits one record per box, in the order the detector reported them, or a single negative
    /// record when the image has no boxes.
    ///
    /// The raster is only consulted when a target box needs geocoding, and at most once per
    /// image. If it cannot be read the affected records keep their scores and carry the error
    /// in `geo_error`.
    pub fn normalize(&self, image_path: &Path, detections: &[DetectionBox]) -> Vec<DetectionRecord> {
        let name = image_name(image_path);
        let mine_present = self.labels.is_present(&name);
        if detections.is_empty() {
            return vec![DetectionRecord::negative(name, mine_present)];
        }

        let mut transform: Option<Result<GeoTransform, String>> = None;
        let mut records = Vec::with_capacity(detections.len());
        for detection in detections {
            if !detection.is_target() {
                debug!(
                    "{}: box of class {} is not a target",
                    name,
                    detection.annotation.class_id()
                );
                records.push(DetectionRecord::negative(name.clone(), mine_present));
                continue;
            }
            let (x, y) = detection.annotation.center();
            let pixel = Point { x, y };
            let transform = transform.get_or_insert_with(|| {
                self.raster.geo_transform(image_path).map_err(|e| {
                    warn!("{}: cannot geocode detections: {}", name, e);
                    e.to_string()
                })
            });
            let record = match transform {
                Ok(transform) => DetectionRecord::geolocated(
                    name.clone(),
                    mine_present,
                    pixel,
                    transform.pixel_to_geo(x, y),
                    detection.confidence,
                ),
                Err(reason) => DetectionRecord::ungeolocated(
                    name.clone(),
                    mine_present,
                    pixel,
                    detection.confidence,
                    reason.clone(),
                ),
            };
            records.push(record);
        }
        records
    }
}

/// File name of an image, used as its identifier in the result document.
pub fn image_name(image_path: &Path) -> String {
    image_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| image_path.to_string_lossy().into_owned())
}
