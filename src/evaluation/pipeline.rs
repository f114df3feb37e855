use crate::annotations::detection::DetectionBox;
use crate::evaluation::detection_normalizer::DetectionNormalizer;
use crate::evaluation::detection_record::DetectionRecord;
use crate::evaluation::result_store::{ResultStore, StoreError};
use crate::geo::raster_metadata::RasterMetadata;
use crate::object_detection::object_detection_model::ObjectDetectionModel;
use log::{debug, info, warn};
use std::path::PathBuf;

/// Detector output for one image.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageDetections {
    pub image_path: PathBuf,
    pub detections: Vec<DetectionBox>,
}

/// An image the detector could not process.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageFailure {
    pub image_path: PathBuf,
    pub reason: String,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Evaluation {
    pub records: Vec<DetectionRecord>,
    pub failed_images: Vec<ImageFailure>,
}

impl Evaluation {
    /// Detected records that could not be placed on the map.
    pub fn ungeocoded(&self) -> impl Iterator<Item = &DetectionRecord> {
        self.records.iter().filter(|r| r.geo_error.is_some())
    }
}

/// Runs the detector over each image in turn. A failing image is reported and skipped.
pub fn run_detector<M: ObjectDetectionModel + ?Sized>(
    model: &mut M,
    images: &[PathBuf],
) -> (Vec<ImageDetections>, Vec<ImageFailure>) {
    let mut outputs = Vec::with_capacity(images.len());
    let mut failures = Vec::new();
    for image_path in images {
        match model.detect(image_path) {
            Ok(detections) => outputs.push(ImageDetections {
                image_path: image_path.clone(),
                detections,
            }),
            Err(e) => {
                warn!("{}: detector failed: {}", image_path.display(), e);
                failures.push(ImageFailure { image_path: image_path.clone(), reason: e.to_string() });
            }
        }
    }
    info!(
        "{} ran on {} images ({} failed)",
        model.name(),
        images.len(),
        failures.len()
    );
    (outputs, failures)
}

/// Normalizes every image's detections, keeping input order.
pub fn normalize_batch<R: RasterMetadata>(
    normalizer: &DetectionNormalizer<R>,
    batch: &[ImageDetections],
) -> Vec<DetectionRecord> {
    batch
        .iter()
        .flat_map(|image| normalizer.normalize(&image.image_path, &image.detections))
        .collect()
}

/// Normalizes a run's detector output and writes the result document. `failed_images` are
/// the images [`run_detector`] skipped; they are carried into the returned evaluation.
///
/// An empty batch leaves any existing document untouched and yields an evaluation without
/// records.
pub fn evaluate_and_save<R: RasterMetadata>(
    normalizer: &DetectionNormalizer<R>,
    batch: &[ImageDetections],
    failed_images: Vec<ImageFailure>,
    store: &ResultStore,
) -> Result<Evaluation, StoreError> {
    if batch.is_empty() {
        debug!("No results to evaluate.");
        return Ok(Evaluation { records: Vec::new(), failed_images });
    }
    let records = normalize_batch(normalizer, batch);
    let evaluation = Evaluation { records, failed_images };
    let ungeocoded = evaluation.ungeocoded().count();
    if ungeocoded > 0 {
        warn!("{} detected records could not be geocoded", ungeocoded);
    }
    store.save(&evaluation.records)?;
    info!(
        "Evaluation details for {} images saved to {}",
        batch.len(),
        store.path().display()
    );
    Ok(evaluation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::geo_transform::GeoTransform;
    use crate::geo::raster_metadata::RasterError;
    use crate::object_detection::object_detection_model::DetectorError;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    struct Flat;

    impl RasterMetadata for Flat {
        fn geo_transform(&self, _image_path: &Path) -> Result<GeoTransform, RasterError> {
            Ok(GeoTransform::from_coefficients([0.0, 1.0, 0.0, 0.0, 0.0, -1.0]))
        }
    }

    struct Scripted;

    impl ObjectDetectionModel for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn detect(&mut self, image_path: &Path) -> Result<Vec<DetectionBox>, DetectorError> {
            match image_path.file_name().and_then(|n| n.to_str()) {
                Some("hit.tiff") => Ok(vec![DetectionBox::new(4.0, 6.0, 2.0, 2.0, 0.75, 0).unwrap()]),
                Some("miss.tiff") => Ok(Vec::new()),
                _ => Err(DetectorError::Image {
                    path: image_path.to_path_buf(),
                    reason: "unsupported".to_string(),
                }),
            }
        }
    }

    #[test]
    fn failing_images_do_not_stop_the_batch() {
        let images = vec![
            PathBuf::from("hit.tiff"),
            PathBuf::from("corrupt.tiff"),
            PathBuf::from("miss.tiff"),
        ];
        let (outputs, failures) = run_detector(&mut Scripted, &images);
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].image_path, PathBuf::from("hit.tiff"));
        assert_eq!(outputs[1].image_path, PathBuf::from("miss.tiff"));
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].image_path, PathBuf::from("corrupt.tiff"));
    }

    #[test]
    fn records_follow_image_order() {
        let dir = tempdir().unwrap();
        let normalizer = DetectionNormalizer::new(dir.path(), Flat);
        let batch = vec![
            ImageDetections { image_path: PathBuf::from("b.tiff"), detections: Vec::new() },
            ImageDetections {
                image_path: PathBuf::from("a.tiff"),
                detections: vec![
                    DetectionBox::new(1.0, 1.0, 1.0, 1.0, 0.5, 0).unwrap(),
                    DetectionBox::new(2.0, 2.0, 1.0, 1.0, 0.6, 0).unwrap(),
                ],
            },
        ];
        let names: Vec<String> =
            normalize_batch(&normalizer, &batch).into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["b.tiff", "a.tiff", "a.tiff"]);
    }

    #[test]
    fn empty_batch_writes_nothing() {
        let dir = tempdir().unwrap();
        let store = ResultStore::new(dir.path().join("result.json"));
        let normalizer = DetectionNormalizer::new(dir.path(), Flat);
        let evaluation = evaluate_and_save(&normalizer, &[], Vec::new(), &store).unwrap();
        assert_eq!(evaluation, Evaluation::default());
        assert!(!store.path().exists());
    }

    #[test]
    fn detector_failures_reach_the_evaluation() {
        let dir = tempdir().unwrap();
        let store = ResultStore::new(dir.path().join("result.json"));
        let normalizer = DetectionNormalizer::new(dir.path(), Flat);
        let images = vec![PathBuf::from("hit.tiff"), PathBuf::from("corrupt.tiff")];
        let (batch, failures) = run_detector(&mut Scripted, &images);
        let evaluation = evaluate_and_save(&normalizer, &batch, failures, &store).unwrap();
        assert_eq!(evaluation.records.len(), 1);
        assert_eq!(evaluation.failed_images.len(), 1);
        assert_eq!(evaluation.failed_images[0].image_path, PathBuf::from("corrupt.tiff"));

        let (batch, failures) = run_detector(&mut Scripted, &[PathBuf::from("corrupt.tiff")]);
        let evaluation = evaluate_and_save(&normalizer, &batch, failures, &store).unwrap();
        assert!(evaluation.records.is_empty());
        assert_eq!(evaluation.failed_images.len(), 1);
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn saves_what_it_returns() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("test").join("labels")).unwrap();
        let store = ResultStore::new(dir.path().join("result.json"));
        let normalizer = DetectionNormalizer::new(dir.path(), Flat);
        let batch = vec![ImageDetections {
            image_path: PathBuf::from("hit.tiff"),
            detections: vec![DetectionBox::new(4.0, 6.0, 2.0, 2.0, 0.75, 0).unwrap()],
        }];
        let evaluation = evaluate_and_save(&normalizer, &batch, Vec::new(), &store).unwrap();
        assert_eq!(store.load().unwrap(), evaluation.records);
        assert_eq!(evaluation.records[0].lat, Some(-6.0));
        assert_eq!(evaluation.records[0].lon, Some(4.0));
    }

    #[test]
    fn unwritable_store_is_fatal() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();
        let store = ResultStore::new(blocker.join("result.json"));
        let normalizer = DetectionNormalizer::new(dir.path(), Flat);
        let batch = vec![ImageDetections { image_path: PathBuf::from("a.tiff"), detections: Vec::new() }];
        assert!(matches!(
            evaluate_and_save(&normalizer, &batch, Vec::new(), &store),
            Err(StoreError::Io { .. })
        ));
    }
}
