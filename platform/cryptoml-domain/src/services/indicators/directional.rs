//! Directional movement and true-range family.

use crate::services::rolling::ratio_or_zero;
use crate::value_objects::series::finite;

pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<Option<f64>> {
    (0..close.len())
        .map(|t| {
            let prev = close[t.checked_sub(1)?];
            finite(high[t].max(prev) - low[t].min(prev))
        })
        .collect()
}

pub fn atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = close.len();
    let tr = true_range(high, low, close);
    if period <= 1 {
        return tr;
    }
    let mut out = vec![None; n];
    if n <= period {
        return out;
    }
    let p = period as f64;
    let mut value = tr[1..=period].iter().flatten().sum::<f64>() / p;
    out[period] = finite(value);
    for t in (period + 1)..n {
        value = (value * (p - 1.0) + tr[t].unwrap_or(0.0)) / p;
        out[t] = finite(value);
    }
    out
}

/// ATR as a percentage of close.
pub fn natr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<Option<f64>> {
    atr(high, low, close, period)
        .into_iter()
        .zip(close)
        .map(|(a, c)| a.and_then(|a| finite(100.0 * ratio_or_zero(a, *c))))
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
struct Movement {
    plus: f64,
    minus: f64,
    range: f64,
}

/// One-bar (+DM, -DM); only the dominant side counts.
fn dm_pair(high: &[f64], low: &[f64], t: usize) -> (f64, f64) {
    let up = high[t] - high[t - 1];
    let down = low[t - 1] - low[t];
    (
        if up > 0.0 && up > down { up } else { 0.0 },
        if down > 0.0 && down > up { down } else { 0.0 },
    )
}

fn movement(high: &[f64], low: &[f64], close: &[f64], t: usize) -> Movement {
    let (plus, minus) = dm_pair(high, low, t);
    let prev = close[t - 1];
    Movement {
        plus,
        minus,
        range: high[t].max(prev) - low[t].min(prev),
    }
}

fn smooth(prev: f64, period: f64, value: f64) -> f64 {
    prev - prev / period + value
}

fn directional_movement(high: &[f64], low: &[f64], period: usize, plus: bool) -> Vec<Option<f64>> {
    let n = high.len();
    let mut out = vec![None; n];
    if period == 0 || n < period {
        return out;
    }
    let pick = |t: usize| {
        let (up, down) = dm_pair(high, low, t);
        if plus {
            up
        } else {
            down
        }
    };
    let p = period as f64;
    let mut acc = (1..period).map(pick).sum::<f64>();
    out[period - 1] = finite(acc);
    for t in period..n {
        acc = smooth(acc, p, pick(t));
        out[t] = finite(acc);
    }
    out
}

pub fn plus_dm(high: &[f64], low: &[f64], period: usize) -> Vec<Option<f64>> {
    directional_movement(high, low, period, true)
}

pub fn minus_dm(high: &[f64], low: &[f64], period: usize) -> Vec<Option<f64>> {
    directional_movement(high, low, period, false)
}

/// (+DI, -DI), first available at `period`.
fn directional_indices(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    period: usize,
) -> Vec<Option<(f64, f64)>> {
    let n = close.len();
    let mut out = vec![None; n];
    if period == 0 || n <= period {
        return out;
    }
    let p = period as f64;
    let mut acc = Movement::default();
    for t in 1..period {
        let m = movement(high, low, close, t);
        acc.plus += m.plus;
        acc.minus += m.minus;
        acc.range += m.range;
    }
    for t in period..n {
        let m = movement(high, low, close, t);
        acc.plus = smooth(acc.plus, p, m.plus);
        acc.minus = smooth(acc.minus, p, m.minus);
        acc.range = smooth(acc.range, p, m.range);
        out[t] = Some((
            100.0 * ratio_or_zero(acc.plus, acc.range),
            100.0 * ratio_or_zero(acc.minus, acc.range),
        ));
    }
    out
}

pub fn plus_di(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<Option<f64>> {
    directional_indices(high, low, close, period)
        .into_iter()
        .map(|di| di.and_then(|(plus, _)| finite(plus)))
        .collect()
}

pub fn minus_di(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<Option<f64>> {
    directional_indices(high, low, close, period)
        .into_iter()
        .map(|di| di.and_then(|(_, minus)| finite(minus)))
        .collect()
}

pub fn dx(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<Option<f64>> {
    directional_indices(high, low, close, period)
        .into_iter()
        .map(|di| {
            di.and_then(|(plus, minus)| finite(100.0 * ratio_or_zero((minus - plus).abs(), minus + plus)))
        })
        .collect()
}

/// Average directional index, first available at `2 * period - 1`.
pub fn adx(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = close.len();
    let dx = dx(high, low, close, period);
    let mut out = vec![None; n];
    let lookback = (2 * period).saturating_sub(1);
    if period == 0 || n <= lookback {
        return out;
    }
    let p = period as f64;
    let mut value = dx[period..=lookback].iter().flatten().sum::<f64>() / p;
    out[lookback] = finite(value);
    for t in (lookback + 1)..n {
        value = (value * (p - 1.0) + dx[t].unwrap_or(0.0)) / p;
        out[t] = finite(value);
    }
    out
}

/// ADX averaged with its value `period - 1` bars earlier.
pub fn adxr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<Option<f64>> {
    let adx = adx(high, low, close, period);
    let shift = period.saturating_sub(1);
    (0..adx.len())
        .map(|t| {
            let earlier = adx[t.checked_sub(shift)?]?;
            finite((adx[t]? + earlier) / 2.0)
        })
        .collect()
}
