use crate::geo::geo_transform::GeoTransform;
use log::debug;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tiff::decoder::Decoder;
use tiff::tags::Tag;

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("Failed to open raster {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("Failed to decode raster {}: {source}", path.display())]
    Decode { path: PathBuf, source: tiff::TiffError },
    #[error("Raster {} carries no georeferencing.", path.display())]
    NotGeoreferenced { path: PathBuf },
    #[error("Invalid georeferencing in {}: {reason}", path.display())]
    InvalidGeoreference { path: PathBuf, reason: String },
}

/// Source of the affine transform for a raster image.
pub trait RasterMetadata {
    fn geo_transform(&self, image_path: &Path) -> Result<GeoTransform, RasterError>;
}

/// Reads georeferencing from GeoTIFF tags, falling back to a world file sidecar.
#[derive(Clone, Copy, Debug, Default)]
pub struct GeoTiffMetadata;

impl RasterMetadata for GeoTiffMetadata {
    fn geo_transform(&self, image_path: &Path) -> Result<GeoTransform, RasterError> {
        let file = File::open(image_path).map_err(|source| RasterError::Open {
            path: image_path.to_path_buf(),
            source,
        })?;
        let from_tags = read_geotiff_tags(file, image_path);
        if let Ok(Some(transform)) = from_tags {
            return Ok(transform);
        }
        if let Some(world_file) = find_world_file(image_path) {
            debug!("Using world file {}", world_file.display());
            return read_world_file(&world_file);
        }
        match from_tags {
            Err(source) => Err(RasterError::Decode { path: image_path.to_path_buf(), source }),
            Ok(_) => Err(RasterError::NotGeoreferenced { path: image_path.to_path_buf() }),
        }
    }
}

fn read_geotiff_tags(file: File, path: &Path) -> tiff::TiffResult<Option<GeoTransform>> {
    let mut decoder = Decoder::new(BufReader::new(file))?;
    if let Some(matrix) = decoder.find_tag(Tag::ModelTransformationTag)? {
        let matrix = matrix.into_f64_vec()?;
        if matrix.len() >= 8 {
            return Ok(Some(GeoTransform::from_coefficients([
                matrix[3], matrix[0], matrix[1], matrix[7], matrix[4], matrix[5],
            ])));
        }
    }
    let tiepoint = decoder.find_tag(Tag::ModelTiepointTag)?;
    let scale = decoder.find_tag(Tag::ModelPixelScaleTag)?;
    let (Some(tiepoint), Some(scale)) = (tiepoint, scale) else {
        return Ok(None);
    };
    let tiepoint = tiepoint.into_f64_vec()?;
    let scale = scale.into_f64_vec()?;
    if tiepoint.len() < 6 || scale.len() < 2 {
        debug!("Ignoring short GeoTIFF tags in {}", path.display());
        return Ok(None);
    }
    let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
    let (scale_x, scale_y) = (scale[0], scale[1]);
    Ok(Some(GeoTransform::from_coefficients([
        x - i * scale_x,
        scale_x,
        0.0,
        y + j * scale_y,
        0.0,
        -scale_y,
    ])))
}

/// Candidate sidecar names: `img.tif` -> `img.tfw`, `img.tifw`, `img.wld`.
fn world_file_candidates(image_path: &Path) -> Vec<PathBuf> {
    let Some(extension) = image_path.extension().and_then(|e| e.to_str()) else {
        return vec![image_path.with_extension("wld")];
    };
    let mut candidates = Vec::new();
    let mut chars = extension.chars();
    if let (Some(first), Some(last)) = (chars.next(), chars.next_back()) {
        candidates.push(image_path.with_extension(format!("{first}{last}w")));
    }
    candidates.push(image_path.with_extension(format!("{extension}w")));
    candidates.push(image_path.with_extension("wld"));
    candidates
}

fn find_world_file(image_path: &Path) -> Option<PathBuf> {
    world_file_candidates(image_path).into_iter().find(|p| p.is_file())
}

/// Parses an ESRI world file.
///
/// The six lines hold `A D B E C F`, where `(C, F)` is the center of the upper-left pixel.
pub fn read_world_file(path: &Path) -> Result<GeoTransform, RasterError> {
    let content = fs::read_to_string(path).map_err(|source| RasterError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let values: Vec<f64> = content
        .split_whitespace()
        .map(str::parse::<f64>)
        .collect::<Result<_, _>>()
        .map_err(|e| RasterError::InvalidGeoreference {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
    let [a, d, b, e, c, f]: [f64; 6] =
        values.as_slice().try_into().map_err(|_| RasterError::InvalidGeoreference {
            path: path.to_path_buf(),
            reason: format!("expected 6 values, found {}", values.len()),
        })?;
    Ok(GeoTransform::from_coefficients([
        c - 0.5 * a - 0.5 * b,
        a,
        b,
        f - 0.5 * d - 0.5 * e,
        d,
        e,
    ]))
}
