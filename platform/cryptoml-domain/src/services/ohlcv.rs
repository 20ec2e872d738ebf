use crate::error::{DatasetError, DatasetResult};
use crate::value_objects::bar::{Bar, Tick};
use crate::value_objects::frame::Frame;
use crate::value_objects::ohlcv::{Ohlcv, OHLCV_COLUMNS};
use crate::value_objects::timeframe::Interval;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DataQualityReport {
    pub rows: usize,
    pub duplicates: usize,
    pub gaps: usize,
    pub out_of_order: usize,
    pub invalid_close: usize,
    pub first_timestamp: Option<i64>,
    pub last_timestamp: Option<i64>,
    pub first_gap: Option<i64>,
    pub first_duplicate: Option<i64>,
    pub first_out_of_order: Option<i64>,
    pub first_invalid_close: Option<i64>,
    pub max_gap_seconds: Option<i64>,
    pub gap_count: usize,
}

impl DataQualityReport {
    /// No duplicate and no out-of-order rows.
    pub fn is_ordered(&self) -> bool {
        self.duplicates == 0 && self.out_of_order == 0
    }
}

pub fn data_quality_from_bars(
    bars: &[Bar],
    expected_step_seconds: Option<i64>,
) -> DataQualityReport {
    let mut report = DataQualityReport {
        rows: bars.len(),
        ..DataQualityReport::default()
    };
    if bars.is_empty() {
        return report;
    }

    let step = expected_step_seconds.unwrap_or(1).max(1);
    report.first_timestamp = Some(bars[0].timestamp);
    report.last_timestamp = Some(bars[bars.len() - 1].timestamp);

    let mut last_ts: Option<i64> = None;
    let mut max_gap: Option<i64> = None;

    for bar in bars {
        let ts = bar.timestamp;

        if !bar.close.is_finite() || bar.close <= 0.0 {
            report.invalid_close += 1;
            if report.first_invalid_close.is_none() {
                report.first_invalid_close = Some(ts);
            }
        }

        if let Some(prev) = last_ts {
            if ts == prev {
                report.duplicates += 1;
                if report.first_duplicate.is_none() {
                    report.first_duplicate = Some(ts);
                }
            } else if ts < prev {
                report.out_of_order += 1;
                if report.first_out_of_order.is_none() {
                    report.first_out_of_order = Some(ts);
                }
            } else {
                let diff = ts - prev;
                if diff > step {
                    report.gaps += 1;
                    report.gap_count += ((diff / step) - 1).max(1) as usize;
                    if report.first_gap.is_none() {
                        report.first_gap = Some(ts);
                    }
                    max_gap = Some(max_gap.map_or(diff, |current| current.max(diff)));
                }
            }
        }

        last_ts = Some(ts);
    }

    report.max_gap_seconds = max_gap;
    report
}

/// Aggregates bars into buckets of `span` seconds aligned on `origin`; each output bar carries
/// its bucket start. Empty buckets are not emitted.
pub fn resample_bars(bars: &[Bar], origin: i64, span: i64) -> DatasetResult<Vec<Bar>> {
    if span <= 0 {
        return Err(DatasetError::Configuration(
            "resample span must be > 0".to_string(),
        ));
    }

    let mut output = Vec::new();
    let mut bucket: Option<Bar> = None;

    for bar in bars {
        let bucket_start = origin + (bar.timestamp - origin).div_euclid(span) * span;

        match bucket {
            Some(ref mut agg) if agg.timestamp == bucket_start => {
                agg.high = agg.high.max(bar.high);
                agg.low = agg.low.min(bar.low);
                agg.close = bar.close;
                agg.volume += bar.volume;
            }
            _ => {
                if let Some(agg) = bucket.take() {
                    output.push(agg);
                }
                bucket = Some(Bar {
                    timestamp: bucket_start,
                    ..*bar
                });
            }
        }
    }

    if let Some(agg) = bucket {
        output.push(agg);
    }

    Ok(output)
}

/// Trade ticks aggregated into interval bars. Buckets without trades between the first and the
/// last tick repeat the previous close with zero volume.
pub fn ohlcv_from_ticks(ticks: &[Tick], interval: &Interval) -> DatasetResult<Ohlcv> {
    if ticks.is_empty() {
        return Err(DatasetError::UpstreamData("no ticks to aggregate".to_string()));
    }
    if let Some(pos) = ticks.windows(2).position(|w| w[1].timestamp < w[0].timestamp) {
        return Err(DatasetError::UpstreamData(format!(
            "ticks: out-of-order timestamp {} at row {}",
            ticks[pos + 1].timestamp,
            pos + 1
        )));
    }

    let as_bars: Vec<Bar> = ticks
        .iter()
        .map(|tick| Bar {
            timestamp: tick.timestamp,
            open: tick.price,
            high: tick.price,
            low: tick.price,
            close: tick.price,
            volume: tick.volume,
        })
        .collect();
    let step = interval.step_seconds;
    let buckets = resample_bars(&as_bars, 0, step)?;

    let mut filled: Vec<Bar> = Vec::with_capacity(buckets.len());
    for bar in buckets {
        if let Some(prev) = filled.last().copied() {
            let mut ts = prev.timestamp + step;
            while ts < bar.timestamp {
                filled.push(Bar {
                    timestamp: ts,
                    open: prev.close,
                    high: prev.close,
                    low: prev.close,
                    close: prev.close,
                    volume: 0.0,
                });
                ts += step;
            }
        }
        filled.push(bar);
    }

    tracing::debug!(
        ticks = ticks.len(),
        bars = filled.len(),
        interval = %interval.label,
        "aggregated ticks"
    );
    Ohlcv::from_bars(&filled)
}

/// Trailing `period`-bar OHLCV as of every bar.
///
/// One bucketing pass per offset `0..period`, each anchored on the bar at that offset. Buckets
/// are closed on the left and labelled with their right edge, so the row labelled `t`
/// aggregates the bars in `[t - period * step, t)`. The passes are merged, sorted and trimmed
/// to the input's first/last timestamp. Buckets with no bar keep missing prices and zero
/// volume.
pub fn ohlcv_resample(ohlcv: &Ohlcv, period: usize, step_seconds: i64) -> DatasetResult<Frame> {
    if period == 0 {
        return Err(DatasetError::Configuration(
            "resample period must be >= 1".to_string(),
        ));
    }
    if step_seconds <= 0 {
        return Err(DatasetError::Configuration(
            "resample step must be > 0".to_string(),
        ));
    }
    let index = ohlcv.index();
    if index.is_empty() {
        return Ok(Frame::new(Vec::new()));
    }

    let span = step_seconds * period as i64;
    let bars = ohlcv.bars();
    let mut rows: BTreeMap<i64, [Option<f64>; 5]> = BTreeMap::new();

    for offset in 0..period.min(bars.len()) {
        let origin = index[offset] - index[offset].rem_euclid(step_seconds);
        let buckets = resample_bars(&bars[offset..], origin, span)?;
        let Some(last) = buckets.last().map(|b| b.timestamp) else {
            continue;
        };
        let mut filled = buckets.into_iter().peekable();
        let mut start = origin;
        while start <= last {
            let row = match filled.next_if(|bar| bar.timestamp == start) {
                Some(bar) => [
                    Some(bar.open),
                    Some(bar.high),
                    Some(bar.low),
                    Some(bar.close),
                    Some(bar.volume),
                ],
                None => [None, None, None, None, Some(0.0)],
            };
            rows.entry(start + span).or_insert(row);
            start += span;
        }
    }

    let first = index[0];
    let last = index[index.len() - 1];
    let trimmed: Vec<(i64, [Option<f64>; 5])> =
        rows.into_iter().filter(|(ts, _)| *ts >= first && *ts <= last).collect();

    let mut frame = Frame::new(trimmed.iter().map(|(ts, _)| *ts).collect());
    for (col, name) in OHLCV_COLUMNS.iter().enumerate() {
        frame.push(*name, trimmed.iter().map(|(_, row)| row[col]).collect())?;
    }
    Ok(frame)
}
