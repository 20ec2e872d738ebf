use crate::reporting;
use cryptoml_domain::repositories::artifacts::{ArtifactReader, ArtifactWriter};
use cryptoml_domain::services::metadata::FeatureMetadata;
use cryptoml_domain::value_objects::dataset_info::DatasetInfo;
use cryptoml_domain::value_objects::frame::Frame;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone, Copy)]
pub struct FilesystemArtifactWriter;

impl FilesystemArtifactWriter {
    pub fn new() -> Self {
        Self
    }
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(".bak");
    PathBuf::from(name)
}

impl ArtifactWriter for FilesystemArtifactWriter {
    fn ensure_dir(&self, path: &Path) -> Result<(), String> {
        fs::create_dir_all(path)
            .map_err(|err| format!("failed to create dir {}: {}", path.display(), err))
    }

    fn write_frame_csv(&self, path: &Path, frame: &Frame, index_label: &str) -> Result<(), String> {
        reporting::write_frame_csv(path, frame, index_label)
    }

    fn write_metadata_csv(&self, path: &Path, features: &[FeatureMetadata]) -> Result<(), String> {
        reporting::write_metadata_csv(path, features)
    }

    fn write_info_json(&self, path: &Path, info: &DatasetInfo) -> Result<(), String> {
        reporting::write_info_json(path, info)
    }

    fn backup(&self, path: &Path) -> Result<PathBuf, String> {
        let target = backup_path(path);
        fs::copy(path, &target).map_err(|err| {
            format!(
                "failed to back up {} to {}: {}",
                path.display(),
                target.display(),
                err
            )
        })?;
        Ok(target)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FilesystemArtifactReader;

impl FilesystemArtifactReader {
    pub fn new() -> Self {
        Self
    }
}

impl ArtifactReader for FilesystemArtifactReader {
    fn read_info_json(&self, path: &Path) -> Result<DatasetInfo, String> {
        reporting::read_info_json(path)
    }

    fn read_frame_index(&self, path: &Path) -> Result<Vec<i64>, String> {
        reporting::read_frame_index(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_tmp_dir(prefix: &str) -> PathBuf {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("{prefix}_{}_{}", std::process::id(), now))
    }

    fn info() -> DatasetInfo {
        DatasetInfo {
            symbol: "BTC".to_string(),
            currency: "USD".to_string(),
            interval: "1d".to_string(),
            records: 3,
            features_count: 2,
            index_min: "2020-01-01T00:00:00Z".to_string(),
            index_max: "2020-01-03T00:00:00Z".to_string(),
            valid_index_min: "2020-01-02T00:00:00Z".to_string(),
            valid_index_max: "2020-01-03T00:00:00Z".to_string(),
            config_sha256: "abcdef012345".to_string(),
            targets: BTreeMap::from([("class".to_string(), true), ("pct".to_string(), false)]),
            features: BTreeMap::from([("close".to_string(), true), ("rsi".to_string(), true)]),
        }
    }

    #[test]
    fn info_json_round_trips_and_backs_up() {
        let dir = unique_tmp_dir("cryptoml_artifacts");
        let writer = FilesystemArtifactWriter::new();
        let reader = FilesystemArtifactReader::new();
        writer.ensure_dir(&dir).expect("dir");

        let path = dir.join("dataset-BTCUSD.info.json");
        let original = info();
        writer.write_info_json(&path, &original).expect("write");
        assert!(reader.exists(&path));
        assert_eq!(reader.read_info_json(&path).expect("read"), original);

        let backup = writer.backup(&path).expect("backup");
        assert_eq!(backup, dir.join("dataset-BTCUSD.info.json.bak"));
        let mut updated = original.clone();
        updated.features.insert("rsi".to_string(), false);
        writer.write_info_json(&path, &updated).expect("rewrite");

        assert_eq!(reader.read_info_json(&backup).expect("backup"), original);
        assert_eq!(reader.read_info_json(&path).expect("read"), updated);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn backup_of_a_missing_file_fails() {
        let dir = unique_tmp_dir("cryptoml_artifacts_missing");
        let writer = FilesystemArtifactWriter::new();
        assert!(writer.backup(&dir.join("absent.info.json")).is_err());
    }
}
