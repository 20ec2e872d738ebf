use crate::config::Config;
use crate::shared::{parse_interval, InputSource};
use cryptoml_domain::repositories::market_data::{
    MarketDataRepository, MetricsRepository, OhlcvQuery,
};
use cryptoml_domain::services::ohlcv::{data_quality_from_bars, ohlcv_from_ticks, DataQualityReport};
use std::path::Path;
use std::time::Instant;
use tracing::info_span;

/// Data-quality report for the configured inputs.
///
/// With `strict`, duplicated or out-of-order OHLCV rows and an unordered metrics index are
/// errors.
pub fn validate_inputs(
    config: &Config,
    strict: bool,
    market_data: &dyn MarketDataRepository,
    metrics_repo: &dyn MetricsRepository,
) -> Result<serde_json::Value, String> {
    let _span = info_span!(
        "validate_inputs",
        strict = strict,
        symbol = %config.dataset.symbol,
        currency = %config.dataset.currency,
        interval = %config.dataset.interval
    )
    .entered();

    let stage_start = Instant::now();
    let interval = parse_interval(config)?;
    let source = InputSource::resolve(config)?;
    let query = OhlcvQuery {
        path: source.path().to_path_buf(),
        symbol: config.dataset.symbol.clone(),
        currency: config.dataset.currency.clone(),
        expected_step_seconds: Some(interval.step_seconds),
    };

    let (report, source_kind, ticks) = match &source {
        InputSource::Ohlcv(_) => {
            let (_bars, report) = market_data.load_ohlcv(&query)?;
            (report, "ohlcv", None)
        }
        InputSource::Ticks(_) => {
            let ticks = market_data.load_ticks(&query)?;
            let ohlcv = ohlcv_from_ticks(&ticks, &interval).map_err(|err| err.to_string())?;
            let report = data_quality_from_bars(&ohlcv.bars(), Some(interval.step_seconds));
            (report, "ticks", Some(ticks.len()))
        }
    };
    metrics::histogram!("cryptoml.validate.load_ohlcv_ms")
        .record(stage_start.elapsed().as_millis() as f64);

    let metrics_json = match &config.paths.metrics_csv {
        Some(path) => {
            let frame = metrics_repo.load_metrics(Path::new(path))?;
            let ordered = frame.check_index("metrics");
            if strict {
                ordered.clone().map_err(|err| err.to_string())?;
            }
            serde_json::json!({
                "path": path,
                "rows": frame.height(),
                "columns": frame.names(),
                "ordered": ordered.is_ok(),
            })
        }
        None => serde_json::Value::Null,
    };

    if strict && !report.is_ordered() {
        return Err(format!(
            "strict validation failed: {} duplicates, {} out-of-order rows in {}",
            report.duplicates,
            report.out_of_order,
            source.path().display()
        ));
    }

    metrics::gauge!("cryptoml.validate.ohlcv.gaps").set(report.gaps as f64);
    metrics::gauge!("cryptoml.validate.ohlcv.duplicates").set(report.duplicates as f64);
    metrics::gauge!("cryptoml.validate.ohlcv.out_of_order").set(report.out_of_order as f64);
    metrics::gauge!("cryptoml.validate.ohlcv.invalid_close").set(report.invalid_close as f64);

    Ok(serde_json::json!({
        "source": {
            "kind": source_kind,
            "path": source.path().display().to_string(),
            "ticks": ticks,
        },
        "interval": interval.label,
        "ohlcv": data_quality_json(&report),
        "metrics": metrics_json,
        "strict": strict,
    }))
}

fn data_quality_json(report: &DataQualityReport) -> serde_json::Value {
    serde_json::json!({
        "rows": report.rows,
        "duplicates": report.duplicates,
        "gaps": report.gaps,
        "missing_bars": report.gap_count,
        "out_of_order": report.out_of_order,
        "invalid_close": report.invalid_close,
        "first_timestamp": report.first_timestamp,
        "last_timestamp": report.last_timestamp,
        "first_gap": report.first_gap,
        "first_duplicate": report.first_duplicate,
        "first_out_of_order": report.first_out_of_order,
        "first_invalid_close": report.first_invalid_close,
        "max_gap_seconds": report.max_gap_seconds,
    })
}
