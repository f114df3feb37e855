use crate::annotations::bounding_box::BoundingBoxGeometry;
use crate::annotations::detection::Detection;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: [&str; 6] = ["tif", "tiff", "jpg", "jpeg", "png", "bmp"];

/// Non maxmimum suppression is a way of removing duplicate detections.
///
/// Boxes of different classes never suppress each other. The survivors come back sorted by
/// descending confidence.
pub fn non_maximum_suppression<T: BoundingBoxGeometry>(
    mut detections: Vec<Detection<T>>,
    iou_threshold: f64,
) -> Vec<Detection<T>> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    let mut detections_to_remove: Vec<bool> = vec![false; detections.len()];
    for (current_index, current_det) in detections.iter().enumerate() {
        if detections_to_remove[current_index] {
            continue;
        }
        for (other_index, other_det) in detections[current_index + 1..].iter().enumerate() {
            if detections_to_remove[current_index + other_index + 1] {
                continue;
            }
            if current_det.annotation.class_id() != other_det.annotation.class_id() {
                continue;
            }
            let iou = current_det
                .annotation
                .intersection_over_union(&other_det.annotation);
            if iou > iou_threshold {
                detections_to_remove[current_index + other_index + 1] = true;
            }
        }
    }
    let mut drop_iter = detections_to_remove.into_iter();
    detections.retain(|_| !drop_iter.next().unwrap_or(false));
    detections
}

/// Lists the images under `dir`, sorted by path so runs are reproducible.
pub fn collect_images(dir: &Path) -> walkdir::Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry?;
        if entry.file_type().is_file() && is_image(entry.path()) {
            images.push(entry.into_path());
        }
    }
    images.sort();
    Ok(images)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::bounding_box::BoundingBox;
    use std::fs;
    use tempfile::tempdir;

    fn det(left: f64, top: f64, right: f64, bottom: f64, class_id: u32, confidence: f64) -> Detection<BoundingBox> {
        Detection {
            annotation: BoundingBox::from_xyxy(left, top, right, bottom, class_id).unwrap(),
            confidence,
        }
    }

    #[test]
    fn nms_no_overlap() {
        let dets = vec![det(0.0, 0.0, 1.0, 1.0, 0, 0.6), det(2.0, 2.0, 3.0, 3.0, 0, 0.6)];
        let nms_result = non_maximum_suppression(dets.clone(), 0.5);
        assert_eq!(dets, nms_result);
    }

    #[test]
    fn nms_standard_usage() {
        let dets = vec![
            det(0.0, 0.0, 4.0, 4.0, 0, 0.6),
            det(0.0, 0.0, 5.0, 5.0, 0, 0.55),
            det(6.0, 6.0, 10.0, 10.0, 0, 0.75),
        ];
        let nms_result = non_maximum_suppression(dets, 0.5);
        let true_dets = vec![det(6.0, 6.0, 10.0, 10.0, 0, 0.75), det(0.0, 0.0, 4.0, 4.0, 0, 0.6)];
        assert_eq!(true_dets, nms_result);
    }

    #[test]
    fn nms_overlap_but_different_classes() {
        let dets = vec![
            det(0.0, 0.0, 4.5, 4.5, 0, 0.6),
            det(0.0, 0.0, 5.0, 5.0, 1, 0.55),
            det(0.5, 0.5, 4.0, 4.0, 0, 0.8),
            det(6.0, 6.0, 10.0, 10.0, 0, 0.75),
        ];
        let nms_result = non_maximum_suppression(dets, 0.5);
        let true_dets = vec![
            det(0.5, 0.5, 4.0, 4.0, 0, 0.8),
            det(6.0, 6.0, 10.0, 10.0, 0, 0.75),
            det(0.0, 0.0, 5.0, 5.0, 1, 0.55),
        ];
        assert_eq!(true_dets, nms_result);
    }

    #[test]
    fn collects_only_images_in_sorted_order() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir_all(&nested).unwrap();
        for name in ["b.TIFF", "a.jpg", "notes.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::write(nested.join("c.png"), b"").unwrap();

        let images = collect_images(dir.path()).unwrap();
        assert_eq!(
            images,
            vec![dir.path().join("a.jpg"), dir.path().join("b.TIFF"), nested.join("c.png")]
        );
    }

    #[test]
    fn missing_image_dir_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(collect_images(&dir.path().join("absent")).is_err());
    }
}
