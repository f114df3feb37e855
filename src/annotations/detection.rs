use crate::annotations::bounding_box::{
    BoundingBox, BoundingBoxError, BoundingBoxGeometry, TARGET_CLASS_ID,
};

/// A detection is what is produced as output from an object detection model.
///
/// A detection is any annotation combined with a confidence score: a probability value that
/// encodes the model's belief that the detection is true.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection<T: BoundingBoxGeometry> {
    pub annotation: T,
    pub confidence: f64,
}

/// One raw box as reported by a detector, in source image pixels.
pub type DetectionBox = Detection<BoundingBox>;

impl<T: BoundingBoxGeometry> Detection<T> {
    /// True when the detection belongs to the target class.
    pub fn is_target(&self) -> bool {
        self.annotation.class_id() == TARGET_CLASS_ID
    }
}

impl DetectionBox {
    /// Checks the box geometry and that `confidence` is a probability.
    pub fn new(
        x_center: f64,
        y_center: f64,
        width: f64,
        height: f64,
        confidence: f64,
        class_id: u32,
    ) -> Result<Self, BoundingBoxError> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(BoundingBoxError::InvalidConfidence(confidence));
        }
        let annotation = BoundingBox::new(x_center, y_center, width, height, class_id)?;
        Ok(Detection { annotation, confidence })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_must_be_a_probability() {
        for confidence in [1.5, -0.1, f64::INFINITY] {
            assert_eq!(
                DetectionBox::new(5.0, 5.0, 2.0, 2.0, confidence, 0),
                Err(BoundingBoxError::InvalidConfidence(confidence))
            );
        }
        assert!(matches!(
            DetectionBox::new(5.0, 5.0, 2.0, 2.0, f64::NAN, 0),
            Err(BoundingBoxError::InvalidConfidence(c)) if c.is_nan()
        ));
    }

    #[test]
    fn accepts_boundary_confidences() {
        for confidence in [0.0, 1.0] {
            let detection = DetectionBox::new(5.0, 5.0, 2.0, 2.0, confidence, 0).unwrap();
            assert_eq!(detection.confidence, confidence);
            assert!(detection.is_target());
        }
    }
}
