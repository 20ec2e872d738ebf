use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Structured description of a built dataset.
///
/// Feature-selection tooling flips entries of `features` after the build; everything else
/// is fixed at build time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub symbol: String,
    pub currency: String,
    pub interval: String,
    pub records: usize,
    pub features_count: usize,
    pub index_min: String,
    pub index_max: String,
    pub valid_index_min: String,
    pub valid_index_max: String,
    pub config_sha256: String,
    pub targets: BTreeMap<String, bool>,
    pub features: BTreeMap<String, bool>,
}

impl DatasetInfo {
    pub fn enabled_features(&self) -> impl Iterator<Item = &str> {
        self.features
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(name, _)| name.as_str())
    }
}
