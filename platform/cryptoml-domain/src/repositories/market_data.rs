use crate::services::ohlcv::DataQualityReport;
use crate::value_objects::bar::{Bar, Tick};
use crate::value_objects::frame::Frame;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct OhlcvQuery {
    pub path: PathBuf,
    pub symbol: String,
    pub currency: String,
    pub expected_step_seconds: Option<i64>,
}

pub trait MarketDataRepository {
    /// Bars sorted by timestamp with duplicates collapsed; the report describes the raw rows.
    fn load_ohlcv(&self, query: &OhlcvQuery) -> Result<(Vec<Bar>, DataQualityReport), String>;
    fn load_ticks(&self, query: &OhlcvQuery) -> Result<Vec<Tick>, String>;
}

/// Auxiliary on-chain metrics, one column per metric.
pub trait MetricsRepository {
    fn load_metrics(&self, path: &std::path::Path) -> Result<Frame, String>;
}
