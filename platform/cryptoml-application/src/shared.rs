use crate::config::Config;
use cryptoml_domain::repositories::market_data::{MarketDataRepository, OhlcvQuery};
use cryptoml_domain::services::dataset::BuildConfig;
use cryptoml_domain::services::discretization::DiscretizationStrategy;
use cryptoml_domain::services::ohlcv::{data_quality_from_bars, ohlcv_from_ticks, DataQualityReport};
use cryptoml_domain::services::targets::{TargetConfig, TARGET_COLUMNS};
use cryptoml_domain::value_objects::ohlcv::Ohlcv;
use cryptoml_domain::value_objects::timeframe::Interval;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

pub const DEFAULT_TRAIN_FRACTION: f64 = 0.7;
const DEFAULT_ENABLED_TARGETS: [&str; 1] = ["class"];

/// Where the price history comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Ticks(PathBuf),
    Ohlcv(PathBuf),
}

impl InputSource {
    pub fn resolve(config: &Config) -> Result<Self, String> {
        match (&config.paths.ticks_csv, &config.paths.ohlcv_csv) {
            (Some(ticks), None) => Ok(Self::Ticks(PathBuf::from(ticks))),
            (None, Some(ohlcv)) => Ok(Self::Ohlcv(PathBuf::from(ohlcv))),
            (Some(_), Some(_)) => {
                Err("paths: set only one of ticks_csv | ohlcv_csv".to_string())
            }
            (None, None) => Err("paths: one of ticks_csv | ohlcv_csv is required".to_string()),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Ticks(path) | Self::Ohlcv(path) => path,
        }
    }
}

/// Output file locations for one symbol/currency pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub dir: PathBuf,
    pub features: PathBuf,
    pub metadata: PathBuf,
    pub targets: PathBuf,
    pub info: PathBuf,
}

impl ArtifactPaths {
    pub fn new(out_dir: &Path, symbol: &str, currency: &str) -> Self {
        let stem = format!(
            "dataset-{}{}",
            symbol.to_uppercase(),
            currency.to_uppercase()
        );
        Self {
            dir: out_dir.to_path_buf(),
            features: out_dir.join(format!("{stem}.csv")),
            metadata: out_dir.join(format!("{stem}.meta.csv")),
            targets: out_dir.join(format!("{stem}.target.csv")),
            info: out_dir.join(format!("{stem}.info.json")),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Path::new(&config.paths.out_dir),
            &config.dataset.symbol,
            &config.dataset.currency,
        )
    }
}

pub fn parse_interval(config: &Config) -> Result<Interval, String> {
    Interval::parse(&config.dataset.interval)
}

pub fn resolve_build_config(config: &Config, interval: &Interval) -> Result<BuildConfig, String> {
    let defaults = BuildConfig::default();
    let features = config.features.clone().unwrap_or_default();
    BuildConfig::new(
        features.lags.unwrap_or(defaults.lags()),
        features
            .residual_period
            .unwrap_or(defaults.residual_period()),
        features.splines.unwrap_or(defaults.splines()),
        features
            .resample_periods
            .unwrap_or_else(|| defaults.resample_periods().to_vec()),
        features
            .volatility_windows
            .unwrap_or_else(|| defaults.volatility_windows().to_vec()),
        interval.step_seconds,
    )
    .map_err(|err| err.to_string())
}

pub fn resolve_target_config(config: &Config) -> Result<TargetConfig, String> {
    let defaults = TargetConfig::default();
    let targets = config.targets.clone().unwrap_or_default();
    let [lo, hi] = targets
        .class_thresholds
        .unwrap_or([defaults.class_thresholds().0, defaults.class_thresholds().1]);
    TargetConfig::new(
        targets.horizon.unwrap_or(defaults.horizon()),
        (lo, hi),
        targets
            .binary_threshold
            .unwrap_or(defaults.binary_threshold()),
        targets
            .bin_strategy
            .unwrap_or(DiscretizationStrategy::Quantile),
    )
    .map_err(|err| err.to_string())
}

/// Target columns flagged as enabled in the info record. Unknown names are rejected.
pub fn enabled_targets(config: &Config) -> Result<Vec<String>, String> {
    let enabled: Vec<String> = config
        .targets
        .as_ref()
        .and_then(|t| t.enabled.clone())
        .unwrap_or_else(|| DEFAULT_ENABLED_TARGETS.iter().map(|s| s.to_string()).collect());
    for name in &enabled {
        if !TARGET_COLUMNS.contains(&name.as_str()) {
            return Err(format!(
                "targets.enabled: unknown target '{}' (expected one of: {})",
                name,
                TARGET_COLUMNS.join(" | ")
            ));
        }
    }
    Ok(enabled)
}

pub fn resolve_train_fraction(config: &Config) -> Result<f64, String> {
    let fraction = config
        .selection
        .as_ref()
        .and_then(|s| s.train_fraction)
        .unwrap_or(DEFAULT_TRAIN_FRACTION);
    if !fraction.is_finite() || fraction <= 0.0 || fraction > 1.0 {
        return Err(format!(
            "selection.train_fraction must be in (0, 1], got {fraction}"
        ));
    }
    Ok(fraction)
}

/// Short SHA-256 of the config as canonical JSON.
pub fn config_fingerprint(config: &Config) -> Result<String, String> {
    let canonical = serde_json::to_string(config)
        .map_err(|err| format!("failed to serialize config: {err}"))?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let bytes = hasher.finalize();
    Ok(to_hex_short(&bytes[..], 12))
}

fn to_hex_short(bytes: &[u8], chars: usize) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(chars);
    for b in bytes {
        for nibble in [b >> 4, b & 0x0f] {
            if out.len() >= chars {
                return out;
            }
            out.push(HEX[nibble as usize] as char);
        }
    }
    out
}

/// OHLCV for the configured source, with a quality report over the loaded rows.
///
/// Tick files are aggregated to the configured interval first.
pub fn load_ohlcv(
    config: &Config,
    interval: &Interval,
    market_data: &dyn MarketDataRepository,
) -> Result<(Ohlcv, DataQualityReport), String> {
    let source = InputSource::resolve(config)?;
    let query = OhlcvQuery {
        path: source.path().to_path_buf(),
        symbol: config.dataset.symbol.clone(),
        currency: config.dataset.currency.clone(),
        expected_step_seconds: Some(interval.step_seconds),
    };

    match source {
        InputSource::Ticks(_) => {
            let ticks = market_data.load_ticks(&query)?;
            let ohlcv = ohlcv_from_ticks(&ticks, interval).map_err(|err| err.to_string())?;
            let report = data_quality_from_bars(&ohlcv.bars(), Some(interval.step_seconds));
            tracing::info!(ticks = ticks.len(), bars = ohlcv.len(), "aggregated ticks into bars");
            Ok((ohlcv, report))
        }
        InputSource::Ohlcv(path) => {
            let (bars, report) = market_data.load_ohlcv(&query)?;
            if !report.is_ordered() {
                tracing::warn!(
                    path = %path.display(),
                    duplicates = report.duplicates,
                    out_of_order = report.out_of_order,
                    "OHLCV rows were reordered and deduplicated on load"
                );
            }
            let ohlcv = Ohlcv::from_bars(&bars).map_err(|err| err.to_string())?;
            Ok((ohlcv, report))
        }
    }
}
