use super::bar::Bar;
use super::frame::{check_strictly_increasing, Frame};
use super::series::Series;
use crate::error::{DatasetError, DatasetResult};

pub const OHLCV_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// Column-oriented OHLCV history with validated preconditions.
///
/// Timestamps are strictly increasing and every value is finite, so indicator kernels can
/// work on dense `f64` slices.
#[derive(Debug, Clone, PartialEq)]
pub struct Ohlcv {
    index: Vec<i64>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
}

impl Ohlcv {
    pub fn from_bars(bars: &[Bar]) -> DatasetResult<Self> {
        if bars.is_empty() {
            return Err(DatasetError::UpstreamData("OHLCV input is empty".to_string()));
        }
        let index: Vec<i64> = bars.iter().map(|b| b.timestamp).collect();
        check_strictly_increasing(&index, "ohlcv")?;

        for bar in bars {
            let values = [bar.open, bar.high, bar.low, bar.close, bar.volume];
            if values.iter().any(|v| !v.is_finite()) {
                return Err(DatasetError::UpstreamData(format!(
                    "ohlcv: non-finite value at timestamp {}",
                    bar.timestamp
                )));
            }
        }

        Ok(Self {
            index,
            open: bars.iter().map(|b| b.open).collect(),
            high: bars.iter().map(|b| b.high).collect(),
            low: bars.iter().map(|b| b.low).collect(),
            close: bars.iter().map(|b| b.close).collect(),
            volume: bars.iter().map(|b| b.volume).collect(),
        })
    }

    pub fn index(&self) -> &[i64] {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn bars(&self) -> Vec<Bar> {
        (0..self.len())
            .map(|i| Bar {
                timestamp: self.index[i],
                open: self.open[i],
                high: self.high[i],
                low: self.low[i],
                close: self.close[i],
                volume: self.volume[i],
            })
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        match name {
            "open" => Some(&self.open),
            "high" => Some(&self.high),
            "low" => Some(&self.low),
            "close" => Some(&self.close),
            "volume" => Some(&self.volume),
            _ => None,
        }
    }

    pub fn series(&self, name: &str) -> Option<Series> {
        self.column(name)
            .map(|values| Series::from_dense(name, &self.index, values))
    }

    /// The five raw columns as a frame named open/high/low/close/volume.
    pub fn to_frame(&self) -> DatasetResult<Frame> {
        self.select(&OHLCV_COLUMNS)
    }

    /// A subset of the raw columns as a frame.
    pub fn select(&self, names: &[&str]) -> DatasetResult<Frame> {
        let mut frame = Frame::new(self.index.clone());
        for name in names {
            let series = self.series(name).ok_or_else(|| {
                DatasetError::Configuration(format!("unknown OHLCV column '{name}'"))
            })?;
            frame.push(series.name, series.values)?;
        }
        Ok(frame)
    }
}
