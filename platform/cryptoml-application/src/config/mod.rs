use cryptoml_domain::services::discretization::DiscretizationStrategy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub paths: PathsConfig,
    pub features: Option<FeaturesConfig>,
    pub targets: Option<TargetsConfig>,
    pub selection: Option<SelectionConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct DatasetConfig {
    pub symbol: String,
    pub currency: String,
    pub interval: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    pub ticks_csv: Option<String>,
    pub ohlcv_csv: Option<String>,
    pub metrics_csv: Option<String>,
    pub out_dir: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct FeaturesConfig {
    pub lags: Option<usize>,
    pub residual_period: Option<usize>,
    pub splines: Option<bool>,
    pub resample_periods: Option<Vec<usize>>,
    pub volatility_windows: Option<Vec<usize>>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct TargetsConfig {
    pub horizon: Option<usize>,
    pub class_thresholds: Option<[f64; 2]>,
    pub binary_threshold: Option<f64>,
    pub bin_strategy: Option<DiscretizationStrategy>,
    pub enabled: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct SelectionConfig {
    pub train_fraction: Option<f64>,
}

pub fn load_config(path: &Path) -> Result<Config, String> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read config {}: {}", path.display(), err))?;
    toml::from_str(&contents)
        .map_err(|err| format!("failed to parse TOML {}: {}", path.display(), err))
}
