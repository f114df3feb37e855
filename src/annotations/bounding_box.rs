use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Class id the detector uses for the target object (a mine).
pub const TARGET_CLASS_ID: u32 = 0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoundingBoxError {
    #[error("Failed to create BoundingBox, negative width ({0}).")]
    NegativeWidth(f64),
    #[error("Failed to create BoundingBox, negative height ({0}).")]
    NegativeHeight(f64),
    #[error("Failed to create BoundingBox, non-finite coordinate.")]
    NonFinite,
    #[error("Failed to create detection, confidence {0} is outside 0..=1.")]
    InvalidConfidence(f64),
}

/// A struct representing a bounding box.
///
/// Detectors in the YOLO family report boxes by their center point and size, so that is the
/// representation stored here. Coordinates are in pixels of the source image, with the left
/// side of the image being x=0 and the top of the image being y=0.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct BoundingBox {
    x_center: f64,
    y_center: f64,
    width: f64,
    height: f64,
    class_id: u32,
}

impl BoundingBox {
    /// Checks if a box has valid parameters before constructing.
    pub fn new(
        x_center: f64,
        y_center: f64,
        width: f64,
        height: f64,
        class_id: u32,
    ) -> Result<Self, BoundingBoxError> {
        if ![x_center, y_center, width, height].iter().all(|v| v.is_finite()) {
            Err(BoundingBoxError::NonFinite)
        } else if width < 0.0 {
            Err(BoundingBoxError::NegativeWidth(width))
        } else if height < 0.0 {
            Err(BoundingBoxError::NegativeHeight(height))
        } else {
            Ok(BoundingBox { x_center, y_center, width, height, class_id })
        }
    }

    /// Builds a box from corner coordinates.
    pub fn from_xyxy(
        left: f64,
        top: f64,
        right: f64,
        bottom: f64,
        class_id: u32,
    ) -> Result<Self, BoundingBoxError> {
        BoundingBox::new(
            (left + right) / 2.0,
            (top + bottom) / 2.0,
            right - left,
            bottom - top,
            class_id,
        )
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }
}

/// Geometry shared by every annotation that is backed by a rectangle.
pub trait BoundingBoxGeometry {
    fn left(&self) -> f64;
    fn top(&self) -> f64;
    fn right(&self) -> f64;
    fn bottom(&self) -> f64;
    fn class_id(&self) -> u32;

    fn area(&self) -> f64 {
        (self.right() - self.left()) * (self.bottom() - self.top())
    }

    fn center(&self) -> (f64, f64) {
        (
            (self.left() + self.right()) / 2.0,
            (self.top() + self.bottom()) / 2.0,
        )
    }

    fn as_xyxy(&self) -> (f64, f64, f64, f64) {
        (self.left(), self.top(), self.right(), self.bottom())
    }

    fn intersection_over_union(&self, other: &impl BoundingBoxGeometry) -> f64 {
        let overlap_width = (self.right().min(other.right()) - self.left().max(other.left())).max(0.0);
        let overlap_height = (self.bottom().min(other.bottom()) - self.top().max(other.top())).max(0.0);
        let intersection = overlap_width * overlap_height;
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }
}

impl BoundingBoxGeometry for BoundingBox {
    fn left(&self) -> f64 {
        self.x_center - self.width / 2.0
    }

    fn top(&self) -> f64 {
        self.y_center - self.height / 2.0
    }

    fn right(&self) -> f64 {
        self.x_center + self.width / 2.0
    }

    fn bottom(&self) -> f64 {
        self.y_center + self.height / 2.0
    }

    fn class_id(&self) -> u32 {
        self.class_id
    }

    fn center(&self) -> (f64, f64) {
        (self.x_center, self.y_center)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BoundingBox {{ x_center: {}, y_center: {}, width: {}, height: {}, class_id: {} }}",
            self.x_center, self.y_center, self.width, self.height, self.class_id
        )
    }
}
