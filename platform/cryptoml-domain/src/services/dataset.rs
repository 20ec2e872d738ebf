use super::decompose::{get_residual, DAILY_PERIOD};
use super::indicators::make_ohlcv_ta;
use super::lagging::{make_ohlcv_lags, make_ohlcv_pct, make_pct};
use super::ohlcv::ohlcv_resample;
use super::patterns::make_ohlc_patterns;
use super::spline::get_spline;
use crate::error::{DatasetError, DatasetResult};
use crate::value_objects::frame::{Frame, JoinKind};
use crate::value_objects::ohlcv::Ohlcv;
use crate::value_objects::series::Series;
use crate::value_objects::timeframe::SECONDS_PER_DAY;

const OHLC: [&str; 4] = ["open", "high", "low", "close"];

/// Feature assembly parameters, validated on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    lags: usize,
    residual_period: usize,
    splines: bool,
    resample_periods: Vec<usize>,
    volatility_windows: Vec<usize>,
    step_seconds: i64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            lags: 10,
            residual_period: DAILY_PERIOD,
            splines: false,
            resample_periods: vec![3, 7, 30],
            volatility_windows: vec![3, 7, 30],
            step_seconds: SECONDS_PER_DAY,
        }
    }
}

impl BuildConfig {
    pub fn new(
        lags: usize,
        residual_period: usize,
        splines: bool,
        resample_periods: Vec<usize>,
        volatility_windows: Vec<usize>,
        step_seconds: i64,
    ) -> DatasetResult<Self> {
        if lags == 0 {
            return Err(DatasetError::Configuration(
                "features.lags must be >= 1".to_string(),
            ));
        }
        if residual_period < 2 {
            return Err(DatasetError::Configuration(format!(
                "features.residual_period must be >= 2, got {residual_period}"
            )));
        }
        if resample_periods.contains(&0) {
            return Err(DatasetError::Configuration(
                "features.resample_periods entries must be >= 1".to_string(),
            ));
        }
        if volatility_windows.contains(&0) {
            return Err(DatasetError::Configuration(
                "features.volatility_windows entries must be >= 1".to_string(),
            ));
        }
        if step_seconds <= 0 {
            return Err(DatasetError::Configuration(format!(
                "interval step must be > 0 seconds, got {step_seconds}"
            )));
        }
        Ok(Self {
            lags,
            residual_period,
            splines,
            resample_periods,
            volatility_windows,
            step_seconds,
        })
    }

    pub fn lags(&self) -> usize {
        self.lags
    }

    pub fn residual_period(&self) -> usize {
        self.residual_period
    }

    pub fn splines(&self) -> bool {
        self.splines
    }

    pub fn resample_periods(&self) -> &[usize] {
        &self.resample_periods
    }

    pub fn volatility_windows(&self) -> &[usize] {
        &self.volatility_windows
    }

    pub fn step_seconds(&self) -> i64 {
        self.step_seconds
    }
}

/// Columns produced by one build stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Facet {
    pub name: &'static str,
    pub frame: Frame,
}

impl Facet {
    /// Wraps `frame`, dropping its all-missing and all-infinite columns.
    pub fn new(name: &'static str, mut frame: Frame) -> Self {
        let dropped = frame.drop_unusable_columns();
        if !dropped.is_empty() {
            tracing::debug!(facet = name, dropped = dropped.len(), columns = ?dropped, "dropped unusable columns");
        }
        tracing::debug!(facet = name, columns = frame.width(), rows = frame.height(), "facet ready");
        Self { name, frame }
    }
}

/// Body, wick, shadow and range percent changes of a candle series.
fn candle_stats(open: &Series, high: &Series, low: &Series, close: &Series) -> DatasetResult<Vec<Series>> {
    Ok(vec![
        close.sub(open)?.pct_change(1).renamed("close_open_pct"),
        high.sub(close)?.pct_change(1).renamed("high_close_dist_pct"),
        close.sub(low)?.pct_change(1).renamed("low_close_dist_pct"),
        high.sub(low)?.pct_change(1).renamed("high_low_dist_pct"),
    ])
}

fn frame_series(frame: &Frame, name: &str) -> DatasetResult<Series> {
    frame
        .series(name)
        .ok_or_else(|| DatasetError::UpstreamData(format!("missing column '{name}'")))
}

fn ohlcv_series(ohlcv: &Ohlcv, name: &str) -> DatasetResult<Series> {
    ohlcv
        .series(name)
        .ok_or_else(|| DatasetError::UpstreamData(format!("missing column '{name}'")))
}

/// Candle statistics on the raw bars, close volatility, and the same candle statistics on
/// each trailing multi-period rollup (suffix `_d<period>`), aligned on the OHLCV index.
pub fn make_ohlcv_stats(ohlcv: &Ohlcv, config: &BuildConfig) -> DatasetResult<Frame> {
    let [open, high, low, close] = OHLC.map(|name| ohlcv_series(ohlcv, name));
    let (open, high, low, close) = (open?, high?, low?, close?);

    let mut frame = Frame::new(ohlcv.index().to_vec());
    for s in candle_stats(&open, &high, &low, &close)? {
        frame.push_series(s)?;
    }

    let returns = close.pct_change(1);
    for window in config.volatility_windows() {
        frame.push_series(
            returns
                .rolling_std(*window)
                .renamed(format!("close_volatility_{window}d")),
        )?;
    }

    for period in config.resample_periods() {
        let rollup = ohlcv_resample(ohlcv, *period, config.step_seconds())?;
        let stats = candle_stats(
            &frame_series(&rollup, "open")?,
            &frame_series(&rollup, "high")?,
            &frame_series(&rollup, "low")?,
            &frame_series(&rollup, "close")?,
        )?;
        for s in stats {
            let name = format!("{}_d{period}", s.name);
            frame.push_series(s.renamed(name))?;
        }
    }
    Ok(frame)
}

/// STL residual of each price column, named `<column>_resid`.
pub fn make_ohlc_residual(ohlcv: &Ohlcv, period: usize) -> DatasetResult<Frame> {
    let mut frame = Frame::new(ohlcv.index().to_vec());
    for name in OHLC {
        let resid = get_residual(&ohlcv_series(ohlcv, name)?, period)?;
        frame.push_series(resid.renamed(format!("{name}_resid")))?;
    }
    Ok(frame)
}

/// Slope (`_spl_d1`) and convexity (`_spl_d2`) of each price column.
pub fn make_ohlc_splines(ohlcv: &Ohlcv) -> DatasetResult<Frame> {
    let mut frame = Frame::new(ohlcv.index().to_vec());
    for nu in [1u8, 2] {
        for name in OHLC {
            let spline = get_spline(&ohlcv_series(ohlcv, name)?, nu)?;
            frame.push_series(spline.renamed(format!("{name}_spl_d{nu}")))?;
        }
    }
    Ok(frame)
}

/// Every facet in build order, unusable columns already dropped.
pub fn build_facets(
    ohlcv: &Ohlcv,
    metrics: Option<&Frame>,
    config: &BuildConfig,
) -> DatasetResult<Vec<Facet>> {
    let window = config.lags();
    let raw = ohlcv.to_frame()?;
    let raw_lags = make_ohlcv_lags(&raw, window)?;
    let pct = make_ohlcv_pct(ohlcv)?;
    let pct_lags = make_ohlcv_lags(&pct, window)?;
    let residuals = make_ohlc_residual(ohlcv, config.residual_period())?;
    let residual_lags = make_ohlcv_lags(&residuals, window)?;

    let mut facets = vec![
        Facet::new("ohlcv", raw),
        Facet::new("ohlcv_lags", raw_lags),
        Facet::new("ohlcv_pct", pct),
        Facet::new("ohlcv_pct_lags", pct_lags),
        Facet::new("ohlc_residuals", residuals),
        Facet::new("ohlc_residual_lags", residual_lags),
    ];
    if config.splines() {
        facets.push(Facet::new("ohlc_splines", make_ohlc_splines(ohlcv)?));
    }
    facets.push(Facet::new("ohlcv_stats", make_ohlcv_stats(ohlcv, config)?));
    facets.push(Facet::new("ohlc_patterns", make_ohlc_patterns(ohlcv)?));
    facets.push(Facet::new("ta", make_ohlcv_ta(ohlcv)?));

    if let Some(metrics) = metrics {
        metrics.check_index("metrics")?;
        facets.push(Facet::new("metrics", metrics.clone()));
        facets.push(Facet::new("metrics_pct", make_pct(metrics)));
    }
    Ok(facets)
}

/// Outer join of every facet on timestamp.
///
/// Fails with [`DatasetError::IntegrityViolation`] when two facets share a column name.
pub fn build(ohlcv: &Ohlcv, metrics: Option<&Frame>, config: &BuildConfig) -> DatasetResult<Frame> {
    let facets = build_facets(ohlcv, metrics, config)?;
    let frames: Vec<Frame> = facets.into_iter().map(|f| f.frame).collect();
    let features = Frame::join(&frames, JoinKind::Outer)?;
    tracing::info!(
        rows = features.height(),
        features = features.width(),
        facets = frames.len(),
        "assembled feature table"
    );
    Ok(features)
}
