use crate::error::{DatasetError, DatasetResult};
use crate::value_objects::frame::{Frame, JoinKind};
use crate::value_objects::ohlcv::{Ohlcv, OHLCV_COLUMNS};

pub const PCT_SUFFIX: &str = "_pct";

pub fn lag_suffix(periods: usize) -> String {
    format!("_lag{periods}")
}

/// Every column shifted `periods` rows into the future and renamed `<name>_lag<periods>`; the
/// index is untouched, so the first `periods` rows are missing.
pub fn make_lagged(frame: &Frame, periods: usize) -> Frame {
    frame
        .map_series(|s| s.shift(periods as isize))
        .with_suffix(&lag_suffix(periods))
}

/// Lags `1..=window` joined side by side on the rows they all share.
pub fn make_ohlcv_lags(frame: &Frame, window: usize) -> DatasetResult<Frame> {
    if window == 0 {
        return Err(DatasetError::Configuration(
            "lag window must be >= 1".to_string(),
        ));
    }
    let lagged: Vec<Frame> = (1..=window).map(|k| make_lagged(frame, k)).collect();
    Frame::join(&lagged, JoinKind::Inner)
}

/// One-period percent change of every column, suffixed `_pct`.
pub fn make_pct(frame: &Frame) -> Frame {
    frame.map_series(|s| s.pct_change(1)).with_suffix(PCT_SUFFIX)
}

/// `make_pct` over the five OHLCV columns.
pub fn make_ohlcv_pct(ohlcv: &Ohlcv) -> DatasetResult<Frame> {
    Ok(make_pct(&ohlcv.select(&OHLCV_COLUMNS)?))
}
