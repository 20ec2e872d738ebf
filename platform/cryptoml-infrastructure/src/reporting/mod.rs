use cryptoml_domain::services::metadata::FeatureMetadata;
use cryptoml_domain::value_objects::dataset_info::DatasetInfo;
use cryptoml_domain::value_objects::frame::Frame;
use cryptoml_domain::value_objects::timeframe::{format_timestamp, parse_timestamp};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

fn format_value(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Missing values are written as empty cells.
pub fn write_frame_csv(path: &Path, frame: &Frame, index_label: &str) -> Result<(), String> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|err| format!("failed to create csv {}: {}", path.display(), err))?;

    let mut header = Vec::with_capacity(frame.width() + 1);
    header.push(index_label.to_string());
    header.extend(frame.names().iter().cloned());
    wtr.write_record(&header)
        .map_err(|err| format!("failed to write csv header {}: {}", path.display(), err))?;

    for (row, ts) in frame.index().iter().enumerate() {
        let mut record = Vec::with_capacity(frame.width() + 1);
        record.push(format_timestamp(*ts));
        record.extend((0..frame.width()).map(|col| format_value(frame.value(row, col))));
        wtr.write_record(&record)
            .map_err(|err| format!("failed to write csv row {}: {}", path.display(), err))?;
    }

    wtr.flush()
        .map_err(|err| format!("failed to flush csv {}: {}", path.display(), err))
}

pub fn write_metadata_csv(path: &Path, features: &[FeatureMetadata]) -> Result<(), String> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|err| format!("failed to create metadata csv {}: {}", path.display(), err))?;
    wtr.write_record(["feature", "first", "last", "count", "null", "distinct"])
        .map_err(|err| format!("failed to write metadata csv header: {}", err))?;

    for feature in features {
        wtr.write_record([
            feature.name.clone(),
            format_timestamp(feature.first),
            format_timestamp(feature.last),
            feature.count.to_string(),
            feature.null.to_string(),
            feature.distinct.to_string(),
        ])
        .map_err(|err| format!("failed to write metadata row: {}", err))?;
    }

    wtr.flush()
        .map_err(|err| format!("failed to flush metadata csv: {}", err))
}

pub fn write_info_json(path: &Path, info: &DatasetInfo) -> Result<(), String> {
    let json = serde_json::to_string_pretty(info)
        .map_err(|err| format!("failed to serialize dataset info: {}", err))?;
    fs::write(path, json)
        .map_err(|err| format!("failed to write dataset info {}: {}", path.display(), err))
}

pub fn read_info_json(path: &Path) -> Result<DatasetInfo, String> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read dataset info {}: {}", path.display(), err))?;
    serde_json::from_str(&contents)
        .map_err(|err| format!("failed to parse dataset info {}: {}", path.display(), err))
}

/// Timestamps of the first column of a frame CSV.
pub fn read_frame_index(path: &Path) -> Result<Vec<i64>, String> {
    let mut rdr = csv::Reader::from_path(path)
        .map_err(|err| format!("failed to open csv {}: {}", path.display(), err))?;
    let mut index = Vec::new();
    for result in rdr.records() {
        let record =
            result.map_err(|err| format!("failed to read csv row {}: {}", path.display(), err))?;
        let ts = record
            .get(0)
            .ok_or_else(|| format!("empty row in {}", path.display()))?;
        index.push(parse_timestamp(ts)?);
    }
    Ok(index)
}

#[derive(Debug, Deserialize)]
struct SupportRecord {
    feature: String,
    selected: String,
}

fn parse_flag(value: &str) -> Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(format!("invalid selection flag: {other}")),
    }
}

/// Two-column `feature,selected` support table produced by a feature selector.
pub fn read_support_csv(path: &Path) -> Result<BTreeMap<String, bool>, String> {
    let mut rdr = csv::Reader::from_path(path)
        .map_err(|err| format!("failed to open support csv {}: {}", path.display(), err))?;
    let mut support = BTreeMap::new();
    for result in rdr.deserialize::<SupportRecord>() {
        let record = result
            .map_err(|err| format!("failed to parse support row {}: {}", path.display(), err))?;
        let selected = parse_flag(&record.selected)?;
        if support.insert(record.feature.clone(), selected).is_some() {
            return Err(format!(
                "feature '{}' listed twice in {}",
                record.feature,
                path.display()
            ));
        }
    }
    Ok(support)
}
