use serde::{Deserialize, Serialize};

/// One OHLCV bar. Assumed (not enforced) `low <= min(open, close) <= max(open, close) <= high`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// A single trade print.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub timestamp: i64,
    pub price: f64,
    pub volume: f64,
}
