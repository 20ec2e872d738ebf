//! Oscillators and momentum indicators over close prices (plus high/low where the formula
//! needs a range). Output vectors are aligned with the input; warm-up positions are missing.

use crate::services::rolling::{
    ema, ema_of, mask_lookback, ratio_or_zero, rolling_max, rolling_min, sma, sma_of, zip_with,
    RollingStd,
};
use crate::value_objects::series::finite;

fn dense(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().copied().map(finite).collect()
}

/// Wilder-smoothed average gain and loss, first available at `period`.
fn wilder_gain_loss(close: &[f64], period: usize) -> Vec<Option<(f64, f64)>> {
    let n = close.len();
    let mut out = vec![None; n];
    if period == 0 || n <= period {
        return out;
    }
    let p = period as f64;
    let (mut gain, mut loss) = (0.0, 0.0);
    for t in 1..=period {
        let diff = close[t] - close[t - 1];
        if diff > 0.0 {
            gain += diff;
        } else {
            loss -= diff;
        }
    }
    gain /= p;
    loss /= p;
    out[period] = Some((gain, loss));
    for t in (period + 1)..n {
        let diff = close[t] - close[t - 1];
        let (up, down) = if diff > 0.0 { (diff, 0.0) } else { (0.0, -diff) };
        gain = (gain * (p - 1.0) + up) / p;
        loss = (loss * (p - 1.0) + down) / p;
        out[t] = Some((gain, loss));
    }
    out
}

pub fn rsi(close: &[f64], period: usize) -> Vec<Option<f64>> {
    wilder_gain_loss(close, period)
        .into_iter()
        .map(|gl| gl.and_then(|(g, l)| finite(100.0 * ratio_or_zero(g, g + l))))
        .collect()
}

/// Chande momentum oscillator.
pub fn cmo(close: &[f64], period: usize) -> Vec<Option<f64>> {
    wilder_gain_loss(close, period)
        .into_iter()
        .map(|gl| gl.and_then(|(g, l)| finite(100.0 * ratio_or_zero(g - l, g + l))))
        .collect()
}

/// Absolute price oscillator on simple averages.
pub fn apo(close: &[f64], fast: usize, slow: usize) -> Vec<Option<f64>> {
    zip_with(&sma(close, fast), &sma(close, slow), |f, s| f - s)
}

/// Percentage price oscillator on simple averages.
pub fn ppo(close: &[f64], fast: usize, slow: usize) -> Vec<Option<f64>> {
    zip_with(&sma(close, fast), &sma(close, slow), |f, s| {
        100.0 * ratio_or_zero(f - s, s)
    })
}

/// EMA whose first value sits at `start`, seeded with the mean of the `period` values ending
/// there.
fn ema_seeded_at(values: &[f64], period: usize, start: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let mut out = vec![None; n];
    if period == 0 || start + 1 < period || start >= n {
        return out;
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut value = values[start + 1 - period..=start].iter().sum::<f64>() / period as f64;
    out[start] = finite(value);
    for t in (start + 1)..n {
        value += alpha * (values[t] - value);
        out[t] = finite(value);
    }
    out
}

/// MACD line, signal line and histogram. Both averages start on the slow average's first bar,
/// so every output begins at `slow - 1 + signal - 1`.
pub fn macd(
    close: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> (Vec<Option<f64>>, Vec<Option<f64>>, Vec<Option<f64>>) {
    let start = slow.saturating_sub(1);
    let line = zip_with(
        &ema_seeded_at(close, fast, start),
        &ema_seeded_at(close, slow, start),
        |f, s| f - s,
    );
    let signal_line = ema_of(&line, signal);
    let hist = zip_with(&line, &signal_line, |m, s| m - s);
    let lookback = start + signal.saturating_sub(1);
    (mask_lookback(line, lookback), signal_line, hist)
}

fn against_lag(close: &[f64], period: usize, f: impl Fn(f64, f64) -> f64) -> Vec<Option<f64>> {
    (0..close.len())
        .map(|t| {
            if t < period {
                None
            } else {
                finite(f(close[t], close[t - period]))
            }
        })
        .collect()
}

pub fn mom(close: &[f64], period: usize) -> Vec<Option<f64>> {
    against_lag(close, period, |c, prev| c - prev)
}

pub fn roc(close: &[f64], period: usize) -> Vec<Option<f64>> {
    against_lag(close, period, |c, prev| 100.0 * ratio_or_zero(c - prev, prev))
}

pub fn rocp(close: &[f64], period: usize) -> Vec<Option<f64>> {
    against_lag(close, period, |c, prev| ratio_or_zero(c - prev, prev))
}

pub fn rocr(close: &[f64], period: usize) -> Vec<Option<f64>> {
    against_lag(close, period, ratio_or_zero)
}

pub fn rocr100(close: &[f64], period: usize) -> Vec<Option<f64>> {
    against_lag(close, period, |c, prev| 100.0 * ratio_or_zero(c, prev))
}

/// Raw %K over series that may carry missing values; a window touching a gap is missing.
fn fast_k(
    high: &[Option<f64>],
    low: &[Option<f64>],
    close: &[Option<f64>],
    period: usize,
) -> Vec<Option<f64>> {
    let n = close.len();
    let mut out = vec![None; n];
    if period == 0 {
        return out;
    }
    for t in (period - 1)..n {
        let window = t + 1 - period..=t;
        let hh = high[window.clone()].iter().copied().collect::<Option<Vec<f64>>>();
        let ll = low[window].iter().copied().collect::<Option<Vec<f64>>>();
        let (Some(hh), Some(ll), Some(c)) = (hh, ll, close[t]) else {
            continue;
        };
        let hh = hh.into_iter().fold(f64::MIN, f64::max);
        let ll = ll.into_iter().fold(f64::MAX, f64::min);
        out[t] = finite(100.0 * ratio_or_zero(c - ll, hh - ll));
    }
    out
}

/// Slow stochastic: (%K smoothed once, smoothed twice).
pub fn stoch(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    fastk: usize,
    slowk: usize,
    slowd: usize,
) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let raw = fast_k(&dense(high), &dense(low), &dense(close), fastk);
    let k = sma_of(&raw, slowk);
    let d = sma_of(&k, slowd);
    let lookback = fastk.saturating_sub(1) + slowk.saturating_sub(1) + slowd.saturating_sub(1);
    (mask_lookback(k, lookback), d)
}

/// Fast stochastic: (%K, %D).
pub fn stochf(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    fastk: usize,
    fastd: usize,
) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let k = fast_k(&dense(high), &dense(low), &dense(close), fastk);
    let d = sma_of(&k, fastd);
    let lookback = fastk.saturating_sub(1) + fastd.saturating_sub(1);
    (mask_lookback(k, lookback), d)
}

/// Fast stochastic applied to RSI.
pub fn stochrsi(
    close: &[f64],
    period: usize,
    fastk: usize,
    fastd: usize,
) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let r = rsi(close, period);
    let k = fast_k(&r, &r, &r, fastk);
    let d = sma_of(&k, fastd);
    let lookback = period + fastk.saturating_sub(1) + fastd.saturating_sub(1);
    (mask_lookback(k, lookback), d)
}

/// One-period rate of change of a triple-smoothed EMA, in percent.
pub fn trix(close: &[f64], period: usize) -> Vec<Option<f64>> {
    let e3 = ema_of(&ema_of(&ema(close, period), period), period);
    (0..e3.len())
        .map(|t| match (t.checked_sub(1).and_then(|p| e3[p]), e3[t]) {
            (Some(prev), Some(cur)) => finite(100.0 * ratio_or_zero(cur - prev, prev)),
            _ => None,
        })
        .collect()
}

/// Ultimate oscillator with three buying-pressure windows weighted 4:2:1.
pub fn ultosc(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    p1: usize,
    p2: usize,
    p3: usize,
) -> Vec<Option<f64>> {
    let n = close.len();
    let lookback = p1.max(p2).max(p3);
    let mut out = vec![None; n];
    if lookback == 0 || n <= lookback {
        return out;
    }
    let mut bp = vec![0.0; n];
    let mut tr = vec![0.0; n];
    for i in 1..n {
        let true_low = low[i].min(close[i - 1]);
        let true_high = high[i].max(close[i - 1]);
        bp[i] = close[i] - true_low;
        tr[i] = true_high - true_low;
    }
    let average = |t: usize, p: usize| {
        let range = t + 1 - p..=t;
        ratio_or_zero(bp[range.clone()].iter().sum(), tr[range].iter().sum())
    };
    for (t, slot) in out.iter_mut().enumerate().skip(lookback) {
        let value = 100.0 * (4.0 * average(t, p1) + 2.0 * average(t, p2) + average(t, p3)) / 7.0;
        *slot = finite(value);
    }
    out
}

/// Williams %R.
pub fn willr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<Option<f64>> {
    let hh = rolling_max(high, period);
    let ll = rolling_min(low, period);
    (0..close.len())
        .map(|t| match (hh[t], ll[t]) {
            (Some(h), Some(l)) => finite(-100.0 * ratio_or_zero(h - close[t], h - l)),
            _ => None,
        })
        .collect()
}

/// Commodity channel index on the typical price.
pub fn cci(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = close.len();
    let tp: Vec<f64> = (0..n).map(|i| (high[i] + low[i] + close[i]) / 3.0).collect();
    let mean = sma(&tp, period);
    (0..n)
        .map(|t| {
            let m = mean[t]?;
            let window = &tp[t + 1 - period..=t];
            let deviation = window.iter().map(|v| (v - m).abs()).sum::<f64>() / period as f64;
            finite(ratio_or_zero(tp[t] - m, 0.015 * deviation))
        })
        .collect()
}

/// Balance of power.
pub fn bop(open: &[f64], high: &[f64], low: &[f64], close: &[f64]) -> Vec<Option<f64>> {
    (0..close.len())
        .map(|i| {
            let range = high[i] - low[i];
            if range <= 0.0 {
                Some(0.0)
            } else {
                finite((close[i] - open[i]) / range)
            }
        })
        .collect()
}

/// Aroon (down, up). Ties resolve to the most recent extreme.
pub fn aroon(high: &[f64], low: &[f64], period: usize) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let n = high.len();
    let mut down = vec![None; n];
    let mut up = vec![None; n];
    if period == 0 {
        return (down, up);
    }
    let p = period as f64;
    for t in period..n {
        let start = t - period;
        let mut hi_idx = start;
        let mut lo_idx = start;
        for i in start..=t {
            if high[i] >= high[hi_idx] {
                hi_idx = i;
            }
            if low[i] <= low[lo_idx] {
                lo_idx = i;
            }
        }
        up[t] = finite(100.0 * (p - (t - hi_idx) as f64) / p);
        down[t] = finite(100.0 * (p - (t - lo_idx) as f64) / p);
    }
    (down, up)
}

pub fn aroonosc(high: &[f64], low: &[f64], period: usize) -> Vec<Option<f64>> {
    let (down, up) = aroon(high, low, period);
    zip_with(&up, &down, |u, d| u - d)
}

/// `(sma_short - sma_long) / sma_long`.
pub fn relative_sma(close: &[f64], short: usize, long: usize) -> Vec<Option<f64>> {
    zip_with(&sma(close, short), &sma(close, long), |s, l| (s - l) / l)
}

/// `(ema_short - ema_long) / ema_long`.
pub fn relative_ema(close: &[f64], short: usize, long: usize) -> Vec<Option<f64>> {
    zip_with(&ema(close, short), &ema(close, long), |s, l| (s - l) / l)
}

/// True strength index: double-smoothed momentum over double-smoothed absolute momentum.
pub fn tsi(close: &[f64], long: usize, short: usize) -> Vec<Option<f64>> {
    let momentum: Vec<Option<f64>> = (0..close.len())
        .map(|t| t.checked_sub(1).map(|p| close[t] - close[p]))
        .collect();
    let magnitude: Vec<Option<f64>> = momentum.iter().map(|m| m.map(f64::abs)).collect();
    let num = ema_of(&ema_of(&momentum, long), short);
    let den = ema_of(&ema_of(&magnitude, long), short);
    zip_with(&num, &den, |a, b| 100.0 * a / b)
}

/// Bollinger %B: position of close inside the `k`-sigma band.
pub fn bbands_pctb(close: &[f64], period: usize, k: f64) -> Vec<Option<f64>> {
    let mid = sma(close, period);
    let mut std = RollingStd::new(period);
    close
        .iter()
        .zip(mid)
        .map(|(c, m)| {
            let s = std.update(*c);
            let (m, s) = (m?, s?);
            let lower = m - k * s;
            let upper = m + k * s;
            finite((c - lower) / (upper - lower))
        })
        .collect()
}
