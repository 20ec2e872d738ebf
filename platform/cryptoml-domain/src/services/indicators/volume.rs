//! Volume-weighted indicators.

use crate::services::rolling::{ratio_or_zero, sma, zip_with};
use crate::value_objects::series::finite;

/// Close location value: where the close sits inside the bar's range, in [-1, 1].
fn clv(high: f64, low: f64, close: f64) -> f64 {
    ratio_or_zero((close - low) - (high - close), high - low)
}

/// Money flow index. A window with less than one unit of total flow reads 0.
pub fn mfi(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    volume: &[f64],
    period: usize,
) -> Vec<Option<f64>> {
    let n = close.len();
    let mut out = vec![None; n];
    if period == 0 || n <= period {
        return out;
    }
    let typical: Vec<f64> = (0..n).map(|i| (high[i] + low[i] + close[i]) / 3.0).collect();
    let mut positive = vec![0.0; n];
    let mut negative = vec![0.0; n];
    for i in 1..n {
        let flow = typical[i] * volume[i];
        if typical[i] > typical[i - 1] {
            positive[i] = flow;
        } else if typical[i] < typical[i - 1] {
            negative[i] = flow;
        }
    }
    for (t, slot) in out.iter_mut().enumerate().skip(period) {
        let range = t + 1 - period..=t;
        let pos: f64 = positive[range.clone()].iter().sum();
        let neg: f64 = negative[range].iter().sum();
        let total = pos + neg;
        *slot = if total < 1.0 {
            Some(0.0)
        } else {
            finite(100.0 * pos / total)
        };
    }
    out
}

/// Chaikin accumulation/distribution line.
pub fn ad(high: &[f64], low: &[f64], close: &[f64], volume: &[f64]) -> Vec<Option<f64>> {
    let mut acc = 0.0;
    (0..close.len())
        .map(|i| {
            acc += clv(high[i], low[i], close[i]) * volume[i];
            finite(acc)
        })
        .collect()
}

/// Chaikin oscillator: fast EMA minus slow EMA of the A/D line, both seeded with its first
/// value.
pub fn adosc(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    volume: &[f64],
    fast: usize,
    slow: usize,
) -> Vec<Option<f64>> {
    let line = ad(high, low, close, volume);
    let lookback = fast.max(slow).saturating_sub(1);
    let fast_k = 2.0 / (fast as f64 + 1.0);
    let slow_k = 2.0 / (slow as f64 + 1.0);
    let mut fast_ema: Option<f64> = None;
    let mut slow_ema: Option<f64> = None;
    line.iter()
        .enumerate()
        .map(|(t, value)| {
            let v = (*value)?;
            let f = fast_ema.map_or(v, |prev| prev + fast_k * (v - prev));
            let s = slow_ema.map_or(v, |prev| prev + slow_k * (v - prev));
            fast_ema = Some(f);
            slow_ema = Some(s);
            if t < lookback {
                None
            } else {
                finite(f - s)
            }
        })
        .collect()
}

/// On-balance volume, starting from the first bar's volume.
pub fn obv(close: &[f64], volume: &[f64]) -> Vec<Option<f64>> {
    let mut acc = 0.0;
    (0..close.len())
        .map(|i| {
            if i == 0 {
                acc = volume[0];
            } else if close[i] > close[i - 1] {
                acc += volume[i];
            } else if close[i] < close[i - 1] {
                acc -= volume[i];
            }
            finite(acc)
        })
        .collect()
}

/// Raw force index `(close - prev_close) * volume`.
pub fn force_index(close: &[f64], volume: &[f64]) -> Vec<Option<f64>> {
    (0..close.len())
        .map(|i| {
            let prev = close[i.checked_sub(1)?];
            finite((close[i] - prev) * volume[i])
        })
        .collect()
}

/// Percentage volume oscillator on simple averages.
pub fn pvo(volume: &[f64], short: usize, long: usize) -> Vec<Option<f64>> {
    zip_with(&sma(volume, short), &sma(volume, long), |s, l| {
        100.0 * (s - l) / l
    })
}

/// Per-bar money flow volume (not accumulated).
pub fn adi(high: &[f64], low: &[f64], close: &[f64], volume: &[f64]) -> Vec<Option<f64>> {
    (0..close.len())
        .map(|i| finite(clv(high[i], low[i], close[i]) * volume[i]))
        .collect()
}
