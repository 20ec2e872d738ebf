use cryptoml_domain::services::ohlcv::DataQualityReport;
use cryptoml_domain::value_objects::bar::Bar;
use cryptoml_domain::value_objects::timeframe::parse_timestamp;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct OhlcvRecord {
    #[serde(alias = "timestamp_utc", alias = "date", alias = "time")]
    pub timestamp: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Bars sorted by timestamp. Later rows win on duplicate timestamps. A row with a
/// non-positive or non-finite close is counted and replaced by a flat bar at the previous
/// close with zero volume; invalid rows before the first valid bar are dropped.
pub fn load_csv(
    path: &Path,
    expected_step_seconds: Option<i64>,
) -> Result<(Vec<Bar>, DataQualityReport), String> {
    let file = File::open(path)
        .map_err(|err| format!("failed to open OHLCV CSV {}: {}", path.display(), err))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut bars_by_ts: BTreeMap<i64, Option<Bar>> = BTreeMap::new();
    let mut report = DataQualityReport::default();
    let mut last_seen_ts: Option<i64> = None;
    let mut max_gap: Option<i64> = None;
    let step = expected_step_seconds.unwrap_or(1).max(1);

    for result in reader.deserialize::<OhlcvRecord>() {
        let record = result.map_err(|err| {
            format!("failed to parse OHLCV row in {}: {}", path.display(), err)
        })?;
        let timestamp = parse_timestamp(&record.timestamp)?;
        report.rows += 1;

        if !record.close.is_finite() || record.close <= 0.0 {
            report.invalid_close += 1;
            if report.first_invalid_close.is_none() {
                report.first_invalid_close = Some(timestamp);
            }
            bars_by_ts.entry(timestamp).or_insert(None);
            continue;
        }

        if let Some(prev) = last_seen_ts {
            if timestamp < prev {
                report.out_of_order += 1;
                if report.first_out_of_order.is_none() {
                    report.first_out_of_order = Some(timestamp);
                }
            }
        }
        last_seen_ts = Some(timestamp);

        let bar = Bar {
            timestamp,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
        };
        if matches!(bars_by_ts.insert(timestamp, Some(bar)), Some(Some(_))) {
            report.duplicates += 1;
            if report.first_duplicate.is_none() {
                report.first_duplicate = Some(timestamp);
            }
        }
    }

    let mut bars: Vec<Bar> = Vec::with_capacity(bars_by_ts.len());
    let mut last_unique_ts: Option<i64> = None;
    let mut filled = 0usize;
    for (timestamp, slot) in bars_by_ts {
        let bar = match (slot, bars.last()) {
            (Some(bar), _) => bar,
            (None, Some(prev)) => {
                filled += 1;
                Bar {
                    timestamp,
                    open: prev.close,
                    high: prev.close,
                    low: prev.close,
                    close: prev.close,
                    volume: 0.0,
                }
            }
            (None, None) => continue,
        };
        if report.first_timestamp.is_none() {
            report.first_timestamp = Some(timestamp);
        }
        report.last_timestamp = Some(timestamp);

        if let Some(prev) = last_unique_ts {
            let diff = timestamp - prev;
            if diff > step {
                report.gaps += 1;
                report.gap_count += ((diff - 1) / step) as usize;
                if report.first_gap.is_none() {
                    report.first_gap = Some(timestamp);
                }
                max_gap = Some(max_gap.map_or(diff, |current| current.max(diff)));
            }
        }
        last_unique_ts = Some(timestamp);
        bars.push(bar);
    }

    report.max_gap_seconds = max_gap;
    if filled > 0 {
        tracing::warn!(
            path = %path.display(),
            filled,
            first_invalid_close = ?report.first_invalid_close,
            "forward-filled OHLCV rows with an invalid close"
        );
    }
    metrics::counter!("cryptoml.infra.rows_read_total", "source" => "ohlcv")
        .increment(report.rows as u64);
    tracing::debug!(
        path = %path.display(),
        rows = report.rows,
        bars = bars.len(),
        duplicates = report.duplicates,
        gaps = report.gaps,
        "loaded OHLCV CSV"
    );
    Ok((bars, report))
}

#[cfg(test)]
mod tests {
    use super::load_csv;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_tmp_path(name: &str) -> PathBuf {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("cryptoml_{name}_{}_{}", std::process::id(), now))
    }

    #[test]
    fn load_csv_detects_duplicates_and_gaps() {
        let tmp_path = unique_tmp_path("ohlcv_gaps.csv");
        let csv_data = "timestamp,open,high,low,close,volume\n\
2026-01-01,1,1,1,1,1\n\
2026-01-01,1,1,1,1,1\n\
2026-01-03,1,1,1,1,1\n";
        fs::write(&tmp_path, csv_data).expect("write csv");

        let (bars, report) = load_csv(&tmp_path, Some(86_400)).expect("load csv");
        assert_eq!(bars.len(), 2);
        assert_eq!(report.rows, 3);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.gaps, 1);
        assert_eq!(report.gap_count, 1);
        assert_eq!(report.max_gap_seconds, Some(2 * 86_400));
        let _ = fs::remove_file(&tmp_path);
    }

    #[test]
    fn load_csv_sorts_out_of_order_rows_and_keeps_the_last_duplicate() {
        let tmp_path = unique_tmp_path("ohlcv_unordered.csv");
        let csv_data = "timestamp_utc,open,high,low,close,volume\n\
2026-01-01T00:00:00Z,1,1,1,1,1\n\
2026-01-01T00:00:02Z,1,1,1,1,1\n\
2026-01-01T00:00:01Z,1,1,1,1,1\n\
2026-01-01T00:00:00Z,2,2,2,2,2\n";
        fs::write(&tmp_path, csv_data).expect("write csv");

        let (bars, report) = load_csv(&tmp_path, None).expect("load csv");
        assert_eq!(report.out_of_order, 2);
        assert_eq!(report.duplicates, 1);
        assert!(!report.is_ordered());
        assert_eq!(bars.len(), 3);
        assert!(bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert!((bars[0].close - 2.0).abs() < 1e-9);
        let _ = fs::remove_file(&tmp_path);
    }

    #[test]
    fn load_csv_forward_fills_invalid_closes() {
        let tmp_path = unique_tmp_path("ohlcv_invalid.csv");
        let csv_data = "date,open,high,low,close,volume\n\
2026-01-01,1,1,1,0,1\n\
2026-01-02,5,6,4,5,7\n\
2026-01-03,1,1,1,NaN,1\n\
2026-01-04,6,7,5,6,8\n";
        fs::write(&tmp_path, csv_data).expect("write csv");

        let (bars, report) = load_csv(&tmp_path, Some(86_400)).expect("load csv");
        assert_eq!(report.invalid_close, 2);
        assert_eq!(report.first_invalid_close, Some(1_767_225_600));
        assert_eq!(bars.len(), 3);
        assert_eq!(report.gaps, 0);
        assert_eq!(bars[1].timestamp, 1_767_225_600 + 2 * 86_400);
        assert!((bars[1].open - 5.0).abs() < 1e-9);
        assert!((bars[1].close - 5.0).abs() < 1e-9);
        assert_eq!(bars[1].volume, 0.0);
        assert!((bars[2].close - 6.0).abs() < 1e-9);
        let _ = fs::remove_file(&tmp_path);
    }
}
