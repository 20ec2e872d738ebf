use crate::shared::ArtifactPaths;
use cryptoml_domain::repositories::artifacts::{ArtifactReader, ArtifactWriter};
use cryptoml_domain::value_objects::dataset_info::DatasetInfo;
use cryptoml_domain::value_objects::timeframe::parse_timestamp;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info_span;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionOutcome {
    pub info_path: PathBuf,
    pub backup_path: PathBuf,
    pub enabled: usize,
    pub disabled: usize,
    pub changed: usize,
}

/// Rows of the feature table a selector may be fitted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrainingWindow {
    /// Row of the first fully valid timestamp.
    pub first: usize,
    /// Row of the last fully valid timestamp.
    pub last: usize,
    pub train_rows: usize,
    pub train_start: i64,
    pub train_end: i64,
}

/// Flips the `features` flags of an info record to the supplied support.
///
/// The previous record is kept next to it as `<name>.bak`. Features absent from `support`
/// keep their flag.
pub fn apply_feature_selection(
    info_path: &Path,
    support: &BTreeMap<String, bool>,
    reader: &dyn ArtifactReader,
    writer: &dyn ArtifactWriter,
) -> Result<SelectionOutcome, String> {
    let _span = info_span!(
        "apply_feature_selection",
        info = %info_path.display(),
        support = support.len()
    )
    .entered();

    if !reader.exists(info_path) {
        return Err(format!("dataset info not found: {}", info_path.display()));
    }
    let mut info = reader.read_info_json(info_path)?;

    let unknown: Vec<&str> = support
        .keys()
        .filter(|name| !info.features.contains_key(name.as_str()))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        return Err(format!(
            "unknown features in selection for {}: {}",
            info_path.display(),
            unknown.join(", ")
        ));
    }

    let backup_path = writer.backup(info_path)?;
    let mut changed = 0;
    for (name, selected) in support {
        if let Some(flag) = info.features.get_mut(name) {
            if *flag != *selected {
                changed += 1;
            }
            *flag = *selected;
        }
    }
    writer.write_info_json(info_path, &info)?;

    let enabled = info.enabled_features().count();
    let outcome = SelectionOutcome {
        info_path: info_path.to_path_buf(),
        backup_path,
        enabled,
        disabled: info.features.len() - enabled,
        changed,
    };
    tracing::info!(
        enabled = outcome.enabled,
        disabled = outcome.disabled,
        changed = outcome.changed,
        "feature selection applied"
    );
    Ok(outcome)
}

/// Training slice of the fully valid rows: `floor((last - first) * fraction)` rows from `first`.
pub fn training_window(
    info: &DatasetInfo,
    index: &[i64],
    fraction: f64,
) -> Result<TrainingWindow, String> {
    if !fraction.is_finite() || fraction <= 0.0 || fraction > 1.0 {
        return Err(format!("train fraction must be in (0, 1], got {fraction}"));
    }
    let start = parse_timestamp(&info.valid_index_min)?;
    let end = parse_timestamp(&info.valid_index_max)?;
    let first = index
        .binary_search(&start)
        .map_err(|_| format!("valid_index_min {} is not in the feature index", info.valid_index_min))?;
    let last = index
        .binary_search(&end)
        .map_err(|_| format!("valid_index_max {} is not in the feature index", info.valid_index_max))?;
    if last < first {
        return Err(format!(
            "empty valid range: {} .. {}",
            info.valid_index_min, info.valid_index_max
        ));
    }

    let train_rows = ((last - first) as f64 * fraction).floor() as usize;
    let end_row = first + train_rows.saturating_sub(1);
    Ok(TrainingWindow {
        first,
        last,
        train_rows,
        train_start: index[first],
        train_end: index[end_row],
    })
}

/// Training window of the dataset written under `paths`.
pub fn dataset_training_window(
    paths: &ArtifactPaths,
    fraction: f64,
    reader: &dyn ArtifactReader,
) -> Result<TrainingWindow, String> {
    let info = reader.read_info_json(&paths.info)?;
    let index = reader.read_frame_index(&paths.features)?;
    training_window(&info, &index, fraction)
}
