use std::fs;
use std::path::{Path, PathBuf};

/// Answers whether an image has a ground-truth object, from the dataset's label files.
///
/// Labels live at `<dataset_root>/test/labels/<image stem>.txt`. An empty label file marks a
/// negative sample, so only a file with content counts as a positive.
#[derive(Clone, Debug)]
pub struct LabelOracle {
    labels_dir: PathBuf,
}

impl LabelOracle {
    pub fn new(dataset_root: &Path) -> Self {
        LabelOracle { labels_dir: dataset_root.join("test").join("labels") }
    }

    pub fn label_path(&self, image_name: &str) -> PathBuf {
        let stem = Path::new(image_name)
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_default();
        let mut label_file = stem;
        label_file.push(".txt");
        self.labels_dir.join(label_file)
    }

    pub fn is_present(&self, image_name: &str) -> bool {
        fs::metadata(self.label_path(image_name))
            .map(|meta| meta.is_file() && meta.len() > 0)
            .unwrap_or(false)
    }
}
