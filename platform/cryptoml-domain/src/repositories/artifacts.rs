use crate::services::metadata::FeatureMetadata;
use crate::value_objects::dataset_info::DatasetInfo;
use crate::value_objects::frame::Frame;
use std::path::{Path, PathBuf};

pub trait ArtifactWriter {
    fn ensure_dir(&self, path: &Path) -> Result<(), String>;
    /// Writes `frame` with a leading `index_label` column of RFC 3339 timestamps.
    fn write_frame_csv(&self, path: &Path, frame: &Frame, index_label: &str) -> Result<(), String>;
    fn write_metadata_csv(&self, path: &Path, features: &[FeatureMetadata]) -> Result<(), String>;
    fn write_info_json(&self, path: &Path, info: &DatasetInfo) -> Result<(), String>;
    /// Copies `path` to `<path>.bak` and returns the backup location.
    fn backup(&self, path: &Path) -> Result<PathBuf, String>;
}

pub trait ArtifactReader {
    fn read_info_json(&self, path: &Path) -> Result<DatasetInfo, String>;
    fn read_frame_index(&self, path: &Path) -> Result<Vec<i64>, String>;
    fn exists(&self, path: &Path) -> bool;
}
