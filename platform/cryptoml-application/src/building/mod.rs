use crate::config::Config;
use crate::shared::{
    config_fingerprint, enabled_targets, load_ohlcv, parse_interval, resolve_build_config,
    resolve_target_config, ArtifactPaths,
};
use cryptoml_domain::repositories::artifacts::ArtifactWriter;
use cryptoml_domain::repositories::market_data::{MarketDataRepository, MetricsRepository};
use cryptoml_domain::services::dataset::build;
use cryptoml_domain::services::metadata::{feature_metadata, ValidRange};
use cryptoml_domain::services::ohlcv::DataQualityReport;
use cryptoml_domain::services::targets::{make_target, TARGET_COLUMNS};
use cryptoml_domain::value_objects::dataset_info::DatasetInfo;
use cryptoml_domain::value_objects::frame::Frame;
use cryptoml_domain::value_objects::timeframe::format_timestamp;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use tracing::info_span;

pub const FEATURE_INDEX_LABEL: &str = "timestamp";

#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub paths: ArtifactPaths,
    pub info: DatasetInfo,
    pub valid_range: ValidRange,
    pub quality: DataQualityReport,
}

/// Loads the configured inputs, assembles features and targets and writes every artifact.
pub fn build_dataset(
    config: &Config,
    market_data: &dyn MarketDataRepository,
    metrics_repo: &dyn MetricsRepository,
    artifacts: &dyn ArtifactWriter,
) -> Result<BuildOutcome, String> {
    let _span = info_span!(
        "build_dataset",
        symbol = %config.dataset.symbol,
        currency = %config.dataset.currency,
        interval = %config.dataset.interval
    )
    .entered();

    let interval = parse_interval(config)?;
    let build_config = resolve_build_config(config, &interval)?;
    let target_config = resolve_target_config(config)?;
    let enabled = enabled_targets(config)?;
    let fingerprint = config_fingerprint(config)?;

    let stage_start = Instant::now();
    let (ohlcv, quality) = load_ohlcv(config, &interval, market_data)?;
    let metrics_frame = match &config.paths.metrics_csv {
        Some(path) => Some(metrics_repo.load_metrics(Path::new(path))?),
        None => None,
    };
    metrics::histogram!("cryptoml.build.load_ohlcv_ms")
        .record(stage_start.elapsed().as_millis() as f64);
    tracing::info!(
        rows = ohlcv.len(),
        gaps = quality.gaps,
        metrics = metrics_frame.as_ref().map_or(0, Frame::width),
        "loaded inputs"
    );

    let stage_start = Instant::now();
    let features =
        build(&ohlcv, metrics_frame.as_ref(), &build_config).map_err(|err| err.to_string())?;
    metrics::histogram!("cryptoml.build.features_ms")
        .record(stage_start.elapsed().as_millis() as f64);

    let stage_start = Instant::now();
    let report = feature_metadata(&features).map_err(|err| err.to_string())?;
    metrics::histogram!("cryptoml.build.metadata_ms")
        .record(stage_start.elapsed().as_millis() as f64);

    let stage_start = Instant::now();
    let targets = make_target(&ohlcv, &target_config).map_err(|err| err.to_string())?;
    metrics::histogram!("cryptoml.build.targets_ms")
        .record(stage_start.elapsed().as_millis() as f64);

    let paths = ArtifactPaths::from_config(config);
    let info = DatasetInfo {
        symbol: config.dataset.symbol.to_uppercase(),
        currency: config.dataset.currency.to_uppercase(),
        interval: interval.label.clone(),
        records: features.height(),
        features_count: features.width(),
        index_min: features
            .index()
            .first()
            .map(|ts| format_timestamp(*ts))
            .unwrap_or_default(),
        index_max: features
            .index()
            .last()
            .map(|ts| format_timestamp(*ts))
            .unwrap_or_default(),
        valid_index_min: format_timestamp(report.valid_range.start),
        valid_index_max: format_timestamp(report.valid_range.end),
        config_sha256: fingerprint,
        targets: TARGET_COLUMNS
            .iter()
            .map(|name| (name.to_string(), enabled.iter().any(|e| e == name)))
            .collect(),
        features: features
            .names()
            .iter()
            .map(|name| (name.clone(), true))
            .collect::<BTreeMap<_, _>>(),
    };

    let stage_start = Instant::now();
    artifacts.ensure_dir(&paths.dir)?;
    artifacts.write_frame_csv(&paths.features, &features, FEATURE_INDEX_LABEL)?;
    artifacts.write_metadata_csv(&paths.metadata, &report.features)?;
    artifacts.write_frame_csv(&paths.targets, &targets, FEATURE_INDEX_LABEL)?;
    artifacts.write_info_json(&paths.info, &info)?;
    metrics::histogram!("cryptoml.build.write_ms")
        .record(stage_start.elapsed().as_millis() as f64);

    metrics::gauge!("cryptoml.build.rows").set(features.height() as f64);
    metrics::gauge!("cryptoml.build.features").set(features.width() as f64);
    tracing::info!(
        rows = info.records,
        features = info.features_count,
        valid_from = %info.valid_index_min,
        valid_to = %info.valid_index_max,
        out = %paths.features.display(),
        "dataset written"
    );

    Ok(BuildOutcome {
        paths,
        info,
        valid_range: report.valid_range,
        quality,
    })
}
