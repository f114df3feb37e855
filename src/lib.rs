//! Evaluation of a mine detector over georeferenced survey imagery.
//!
//! Detector output is turned into per-box records with geographic coordinates, written to a
//! result document, scored against the dataset's label files and drawn on a web map.

pub mod annotations;
pub mod config;
pub mod evaluation;
pub mod geo;
pub mod image_utils;
pub mod object_detection;
pub mod visualization;
