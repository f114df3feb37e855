use crate::annotations::point::GeoPoint;
use crate::evaluation::result_store::DEFAULT_RESULT_PATH;
use crate::visualization::detection_map::{DEFAULT_MAP_CENTER, DEFAULT_MAP_ZOOM};
use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_DATASET_ROOT: &str = "dataset";
const DEFAULT_MAP_OUTPUT: &str = "detection_map.html";
/// Where `yolo predict save_txt=True save_conf=True` writes its label files.
const DEFAULT_PREDICTIONS_DIR: &str = "runs/detect/predict/labels";
const DEFAULT_CONFIDENCE: f64 = 0.25;
const DEFAULT_IOU_THRESHOLD: f64 = 0.45;
const DEFAULT_INPUT_SIZE: u32 = 640;
const MAX_ZOOM: u8 = 22;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct EvalConfigFile {
    dataset_root: Option<PathBuf>,
    result_path: Option<PathBuf>,
    map_output: Option<PathBuf>,
    detector: Option<DetectorConfigFile>,
    map: Option<MapConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DetectorConfigFile {
    predictions_dir: Option<PathBuf>,
    model_path: Option<PathBuf>,
    confidence: Option<f64>,
    iou_threshold: Option<f64>,
    input_width: Option<u32>,
    input_height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct MapConfigFile {
    center_lat: Option<f64>,
    center_lon: Option<f64>,
    zoom: Option<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EvalConfig {
    pub dataset_root: PathBuf,
    pub result_path: PathBuf,
    pub map_output: PathBuf,
    pub detector: DetectorSettings,
    pub map: MapSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectorSettings {
    pub predictions_dir: PathBuf,
    /// An ONNX model to run instead of reading `predictions_dir`.
    pub model_path: Option<PathBuf>,
    pub confidence: f64,
    pub iou_threshold: f64,
    pub input_width: u32,
    pub input_height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapSettings {
    pub center: GeoPoint,
    pub zoom: u8,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self::from_file(EvalConfigFile::default())
    }
}

impl EvalConfig {
    /// Reads the TOML file at `path` if one is given, otherwise starts from the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let cfg = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config {}", path.display()))?;
                Self::from_toml_str(&content)
                    .with_context(|| format!("invalid config {}", path.display()))?
            }
            None => Self::default(),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: EvalConfigFile = toml::from_str(content)?;
        Ok(Self::from_file(file))
    }

    fn from_file(file: EvalConfigFile) -> Self {
        let detector = file.detector.unwrap_or_default();
        let map = file.map.unwrap_or_default();
        EvalConfig {
            dataset_root: file
                .dataset_root
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATASET_ROOT)),
            result_path: file
                .result_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_RESULT_PATH)),
            map_output: file
                .map_output
                .unwrap_or_else(|| PathBuf::from(DEFAULT_MAP_OUTPUT)),
            detector: DetectorSettings {
                predictions_dir: detector
                    .predictions_dir
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_PREDICTIONS_DIR)),
                model_path: detector.model_path,
                confidence: detector.confidence.unwrap_or(DEFAULT_CONFIDENCE),
                iou_threshold: detector.iou_threshold.unwrap_or(DEFAULT_IOU_THRESHOLD),
                input_width: detector.input_width.unwrap_or(DEFAULT_INPUT_SIZE),
                input_height: detector.input_height.unwrap_or(DEFAULT_INPUT_SIZE),
            },
            map: MapSettings {
                center: GeoPoint {
                    lat: map.center_lat.unwrap_or(DEFAULT_MAP_CENTER.lat),
                    lon: map.center_lon.unwrap_or(DEFAULT_MAP_CENTER.lon),
                },
                zoom: map.zoom.unwrap_or(DEFAULT_MAP_ZOOM),
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        let detector = &self.detector;
        if !(0.0..=1.0).contains(&detector.confidence) {
            return Err(anyhow!(
                "detector confidence must be within 0..=1, got {}",
                detector.confidence
            ));
        }
        if !(0.0..=1.0).contains(&detector.iou_threshold) {
            return Err(anyhow!(
                "detector iou_threshold must be within 0..=1, got {}",
                detector.iou_threshold
            ));
        }
        if detector.input_width == 0 || detector.input_height == 0 {
            return Err(anyhow!("detector input size must be non-zero"));
        }
        let center = self.map.center;
        if !(-90.0..=90.0).contains(&center.lat) || !(-180.0..=180.0).contains(&center.lon) {
            return Err(anyhow!("map center {} is not a valid position", center));
        }
        if self.map.zoom > MAX_ZOOM {
            return Err(anyhow!("map zoom must be at most {}, got {}", MAX_ZOOM, self.map.zoom));
        }
        Ok(())
    }

    /// Images the evaluation runs over.
    pub fn test_images_dir(&self) -> PathBuf {
        self.dataset_root.join("test").join("images")
    }
}
