use crate::error::{DatasetError, DatasetResult};
use crate::value_objects::frame::Frame;
use serde::Serialize;
use std::collections::HashSet;

/// Validity bookkeeping for one feature column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureMetadata {
    pub name: String,
    /// Timestamp of the first non-missing value.
    pub first: i64,
    /// Timestamp of the last non-missing value.
    pub last: i64,
    pub count: usize,
    pub null: usize,
    /// Number of distinct non-missing values.
    pub distinct: usize,
}

/// Timestamps where every feature is present: `[max(first), min(last)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidRange {
    pub start: i64,
    pub end: i64,
}

impl ValidRange {
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, ts: i64) -> bool {
        ts >= self.start && ts <= self.end
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMetadataReport {
    pub valid_range: ValidRange,
    pub features: Vec<FeatureMetadata>,
}

/// Per-column metadata plus the global valid range.
///
/// Columns with no value at all are skipped with a warning. Fails with
/// [`DatasetError::EmptyFeatureSet`] when nothing is left.
pub fn feature_metadata(frame: &Frame) -> DatasetResult<FeatureMetadataReport> {
    let index = frame.index();
    let mut features = Vec::with_capacity(frame.width());
    let mut range: Option<ValidRange> = None;

    for (name, values) in frame.columns() {
        let first = values.iter().position(Option::is_some);
        let last = values.iter().rposition(Option::is_some);
        let (Some(first), Some(last)) = (first, last) else {
            tracing::warn!(feature = name, "feature is empty, skipping metadata");
            continue;
        };
        let first = index[first];
        let last = index[last];

        let distinct = values
            .iter()
            .flatten()
            .map(|v| if *v == 0.0 { 0u64 } else { v.to_bits() })
            .collect::<HashSet<u64>>()
            .len();
        features.push(FeatureMetadata {
            name: name.to_string(),
            first,
            last,
            count: values.len(),
            null: values.iter().filter(|v| v.is_none()).count(),
            distinct,
        });

        range = Some(match range {
            None => ValidRange { start: first, end: last },
            Some(current) => ValidRange {
                start: current.start.max(first),
                end: current.end.min(last),
            },
        });
    }

    let valid_range = range.ok_or(DatasetError::EmptyFeatureSet)?;
    if valid_range.is_empty() {
        tracing::warn!(
            start = valid_range.start,
            end = valid_range.end,
            "feature validity windows do not overlap"
        );
    }
    Ok(FeatureMetadataReport {
        valid_range,
        features,
    })
}
