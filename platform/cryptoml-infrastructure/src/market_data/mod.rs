use cryptoml_domain::repositories::market_data::{
    MarketDataRepository, MetricsRepository, OhlcvQuery,
};
use cryptoml_domain::services::ohlcv::DataQualityReport;
use cryptoml_domain::value_objects::bar::{Bar, Tick};
use cryptoml_domain::value_objects::frame::Frame;
use std::path::Path;

pub mod ohlcv;
pub mod onchain;
pub mod ticks;

/// Market data read from local CSV exports.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvMarketDataRepository;

impl CsvMarketDataRepository {
    pub fn new() -> Self {
        Self
    }
}

impl MarketDataRepository for CsvMarketDataRepository {
    fn load_ohlcv(&self, query: &OhlcvQuery) -> Result<(Vec<Bar>, DataQualityReport), String> {
        ohlcv::load_csv(&query.path, query.expected_step_seconds)
    }

    fn load_ticks(&self, query: &OhlcvQuery) -> Result<Vec<Tick>, String> {
        ticks::load_csv(&query.path)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CsvMetricsRepository;

impl CsvMetricsRepository {
    pub fn new() -> Self {
        Self
    }
}

impl MetricsRepository for CsvMetricsRepository {
    fn load_metrics(&self, path: &Path) -> Result<Frame, String> {
        onchain::load_csv(path)
    }
}
