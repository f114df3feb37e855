use crate::evaluation::detection_record::DetectionRecord;
use log::info;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_RESULT_PATH: &str = "result.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Cannot access result document {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("Malformed result document {}: {source}", path.display())]
    Format { path: PathBuf, source: serde_json::Error },
    #[error("Record for {name} holds a non-finite value and cannot be saved to {}", path.display())]
    NonFinite { path: PathBuf, name: String },
}

/// The result document on disk: a JSON array of records, one per entry.
#[derive(Clone, Debug)]
pub struct ResultStore {
    path: PathBuf,
}

impl Default for ResultStore {
    fn default() -> Self {
        ResultStore::new(DEFAULT_RESULT_PATH)
    }
}

impl ResultStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ResultStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces whatever document was at the store's path.
    pub fn save(&self, records: &[DetectionRecord]) -> Result<(), StoreError> {
        if let Some(record) = records.iter().find(|r| !r.is_finite()) {
            return Err(StoreError::NonFinite { path: self.path.clone(), name: record.name.clone() });
        }
        let io_error = |source| StoreError::Io { path: self.path.clone(), source };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_error)?;
            }
        }
        let file = File::create(&self.path).map_err(io_error)?;
        let mut writer = BufWriter::new(file);
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(b"    "));
        records.serialize(&mut serializer).map_err(|source| StoreError::Format {
            path: self.path.clone(),
            source,
        })?;
        writer.write_all(b"\n").map_err(io_error)?;
        writer.flush().map_err(io_error)?;
        info!("Saved {} records to {}", records.len(), self.path.display());
        Ok(())
    }

    pub fn load(&self) -> Result<Vec<DetectionRecord>, StoreError> {
        let file = File::open(&self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        let records: Vec<DetectionRecord> = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| StoreError::Format { path: self.path.clone(), source })?;
        info!("Loaded {} records from {}", records.len(), self.path.display());
        Ok(records)
    }
}
