use crate::annotations::point::GeoPoint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoTransformError {
    #[error("Malformed geo transform, expected 6 coefficients, got {0}.")]
    WrongCoefficientCount(usize),
    #[error("Cannot georeference a raster with zero width or height.")]
    EmptyRaster,
}

/// The six affine coefficients that map raster pixels to geographic coordinates.
///
/// The coefficients follow the usual GDAL ordering:
/// `(origin_x, pixel_width, rotation_x, origin_y, rotation_y, pixel_height)`. North-up
/// rasters have a negative `pixel_height`, so latitude decreases as the row index grows.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub origin_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn from_coefficients(coefficients: [f64; 6]) -> Self {
        let [origin_x, pixel_width, rotation_x, origin_y, rotation_y, pixel_height] = coefficients;
        GeoTransform { origin_x, pixel_width, rotation_x, origin_y, rotation_y, pixel_height }
    }

    pub fn coefficients(&self) -> [f64; 6] {
        [
            self.origin_x,
            self.pixel_width,
            self.rotation_x,
            self.origin_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }

    /// Builds a north-up transform that stretches a `width` x `height` raster between two
    /// corner positions.
    pub fn from_corners(
        top_left: GeoPoint,
        bottom_right: GeoPoint,
        width: u32,
        height: u32,
    ) -> Result<Self, GeoTransformError> {
        if width == 0 || height == 0 {
            return Err(GeoTransformError::EmptyRaster);
        }
        let pixel_width = (bottom_right.lon - top_left.lon) / width as f64;
        let pixel_height = (top_left.lat - bottom_right.lat) / height as f64;
        Ok(GeoTransform {
            origin_x: top_left.lon,
            pixel_width,
            rotation_x: 0.0,
            origin_y: top_left.lat,
            rotation_y: 0.0,
            pixel_height: -pixel_height,
        })
    }

    /// Maps a pixel coordinate to a geographic one.
    ///
    /// Only the origin and pixel size terms take part; rotation terms are ignored.
    pub fn pixel_to_geo(&self, px: f64, py: f64) -> GeoPoint {
        GeoPoint {
            lon: self.origin_x + px * self.pixel_width,
            lat: self.origin_y + py * self.pixel_height,
        }
    }
}

impl TryFrom<&[f64]> for GeoTransform {
    type Error = GeoTransformError;

    fn try_from(coefficients: &[f64]) -> Result<Self, Self::Error> {
        let coefficients: [f64; 6] = coefficients
            .try_into()
            .map_err(|_| GeoTransformError::WrongCoefficientCount(coefficients.len()))?;
        Ok(GeoTransform::from_coefficients(coefficients))
    }
}
