//! Seasonal-trend decomposition by loess (STL), inner loop only.
//!
//! Positions inside the loess routines are 1-based, as in the classic formulation; slices are
//! indexed with `position - 1`.

use crate::error::{DatasetError, DatasetResult};
use crate::value_objects::series::{finite, Series};

/// Default periodicity of daily bars.
pub const DAILY_PERIOD: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StlParams {
    pub period: usize,
    pub seasonal: usize,
    pub trend: usize,
    pub low_pass: usize,
    pub seasonal_deg: u8,
    pub trend_deg: u8,
    pub low_pass_deg: u8,
    pub inner_iter: usize,
}

impl StlParams {
    /// Seasonal window 7; trend and low-pass windows derived from the period.
    pub fn for_period(period: usize) -> DatasetResult<Self> {
        if period < 2 {
            return Err(DatasetError::Configuration(format!(
                "seasonal period must be >= 2, got {period}"
            )));
        }
        let seasonal = 7usize;
        let trend = (1.5 * period as f64 / (1.0 - 1.5 / seasonal as f64)).ceil() as usize;
        Ok(Self {
            period,
            seasonal,
            trend: next_odd(trend),
            low_pass: next_odd(period + 1),
            seasonal_deg: 1,
            trend_deg: 1,
            low_pass_deg: 1,
            inner_iter: 2,
        })
    }
}

fn next_odd(value: usize) -> usize {
    let value = value.max(3);
    if value % 2 == 0 {
        value + 1
    } else {
        value
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StlDecomposition {
    pub seasonal: Vec<f64>,
    pub trend: Vec<f64>,
    pub resid: Vec<f64>,
}

pub fn stl(values: &[f64], params: &StlParams) -> DatasetResult<StlDecomposition> {
    let n = values.len();
    let np = params.period;
    if n < 2 * np {
        return Err(DatasetError::insufficient(
            format!("stl(period={np})"),
            2 * np,
            n,
        ));
    }

    let mut trend = vec![0.0; n];
    let mut seasonal = vec![0.0; n];
    let mut detrended = vec![0.0; n];

    for _ in 0..params.inner_iter {
        for i in 0..n {
            detrended[i] = values[i] - trend[i];
        }
        let cycle = cycle_subseries(&detrended, np, params.seasonal, params.seasonal_deg);
        let low = low_pass_filter(&cycle, np);
        let low = loess_smooth(&low, params.low_pass, params.low_pass_deg);
        for i in 0..n {
            seasonal[i] = cycle[np + i] - low[i];
        }
        let deseasonalized: Vec<f64> = values.iter().zip(&seasonal).map(|(y, s)| y - s).collect();
        trend = loess_smooth(&deseasonalized, params.trend, params.trend_deg);
    }

    let resid = (0..n).map(|i| values[i] - seasonal[i] - trend[i]).collect();
    Ok(StlDecomposition {
        seasonal,
        trend,
        resid,
    })
}

/// Residual component of `series`, on the same index.
///
/// Fails with `InsufficientHistory` below two full periods and with `UpstreamData` when the
/// series has gaps.
pub fn get_residual(series: &Series, period: usize) -> DatasetResult<Series> {
    let values = series.dense().ok_or_else(|| {
        DatasetError::UpstreamData(format!(
            "stl({}): series has {} missing values",
            series.name,
            series.null_count()
        ))
    })?;
    let params = StlParams::for_period(period)?;
    let decomposition = stl(&values, &params).map_err(|err| match err {
        DatasetError::InsufficientHistory {
            required,
            available,
            ..
        } => DatasetError::insufficient(format!("stl({})", series.name), required, available),
        other => other,
    })?;
    Ok(Series {
        name: series.name.clone(),
        index: series.index.clone(),
        values: decomposition.resid.into_iter().map(finite).collect(),
    })
}

/// Loess estimate at position `xs` from `y[nleft..=nright]`; `None` when every weight is zero.
fn loess_estimate(
    y: &[f64],
    len: usize,
    deg: u8,
    xs: f64,
    nleft: usize,
    nright: usize,
) -> Option<f64> {
    let n = y.len();
    let range = n as f64 - 1.0;
    let mut h = (xs - nleft as f64).max(nright as f64 - xs);
    if len > n {
        h += ((len - n) / 2) as f64;
    }
    let h9 = 0.999 * h;
    let h1 = 0.001 * h;

    let mut w = vec![0.0; nright + 1];
    let mut total = 0.0;
    for j in nleft..=nright {
        let r = (j as f64 - xs).abs();
        if r <= h9 {
            w[j] = if r <= h1 {
                1.0
            } else {
                (1.0 - (r / h).powi(3)).powi(3)
            };
            total += w[j];
        }
    }
    if total <= 0.0 {
        return None;
    }
    for weight in &mut w[nleft..=nright] {
        *weight /= total;
    }

    if h > 0.0 && deg > 0 {
        let a: f64 = (nleft..=nright).map(|j| w[j] * j as f64).sum();
        let c: f64 = (nleft..=nright)
            .map(|j| w[j] * (j as f64 - a) * (j as f64 - a))
            .sum();
        if c.sqrt() > 0.001 * range {
            let b = (xs - a) / c;
            for j in nleft..=nright {
                w[j] *= b * (j as f64 - a) + 1.0;
            }
        }
    }

    Some((nleft..=nright).map(|j| w[j] * y[j - 1]).sum())
}

/// Loess smoothing evaluated at every position.
fn loess_smooth(y: &[f64], len: usize, deg: u8) -> Vec<f64> {
    let n = y.len();
    if n < 2 {
        return y.to_vec();
    }
    let mut out = vec![0.0; n];
    if len >= n {
        for i in 1..=n {
            out[i - 1] = loess_estimate(y, len, deg, i as f64, 1, n).unwrap_or(y[i - 1]);
        }
        return out;
    }

    let half = (len + 1) / 2;
    let (mut nleft, mut nright) = (1, len);
    for i in 1..=n {
        if i > half && nright != n {
            nleft += 1;
            nright += 1;
        }
        out[i - 1] = loess_estimate(y, len, deg, i as f64, nleft, nright).unwrap_or(y[i - 1]);
    }
    out
}

/// Smooths every cycle-subseries and extends each by one point on both ends, giving a series
/// of `n + 2 * period` values.
fn cycle_subseries(y: &[f64], period: usize, len: usize, deg: u8) -> Vec<f64> {
    let n = y.len();
    let mut cycle = vec![0.0; n + 2 * period];
    for j in 0..period {
        let sub: Vec<f64> = y.iter().skip(j).step_by(period).copied().collect();
        let k = sub.len();
        let mut smoothed = Vec::with_capacity(k + 2);

        let nright = len.min(k);
        let before = loess_estimate(&sub, len, deg, 0.0, 1, nright);
        let inner = loess_smooth(&sub, len, deg);
        let nleft = (k + 1).saturating_sub(len).max(1);
        let after = loess_estimate(&sub, len, deg, (k + 1) as f64, nleft, k);

        smoothed.push(before.unwrap_or(inner[0]));
        smoothed.extend_from_slice(&inner);
        smoothed.push(after.unwrap_or(inner[k - 1]));

        for (m, value) in smoothed.into_iter().enumerate() {
            cycle[m * period + j] = value;
        }
    }
    cycle
}

fn moving_average(x: &[f64], len: usize) -> Vec<f64> {
    if len == 0 || x.len() < len {
        return Vec::new();
    }
    let flen = len as f64;
    let mut v: f64 = x[..len].iter().sum();
    let mut out = Vec::with_capacity(x.len() - len + 1);
    out.push(v / flen);
    for j in len..x.len() {
        v += x[j] - x[j - len];
        out.push(v / flen);
    }
    out
}

/// MA(period), MA(period), MA(3): `n + 2 * period` values in, `n` out.
fn low_pass_filter(cycle: &[f64], period: usize) -> Vec<f64> {
    moving_average(&moving_average(&moving_average(cycle, period), period), 3)
}
