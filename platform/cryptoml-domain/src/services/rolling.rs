use crate::value_objects::series::finite;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct RollingSma {
    window: usize,
    buf: VecDeque<f64>,
    sum: f64,
}

impl RollingSma {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            buf: VecDeque::new(),
            sum: 0.0,
        }
    }

    pub fn update(&mut self, value: f64) -> Option<f64> {
        if self.window == 0 {
            return None;
        }

        self.buf.push_back(value);
        self.sum += value;
        while self.buf.len() > self.window {
            if let Some(front) = self.buf.pop_front() {
                self.sum -= front;
            }
        }

        if self.buf.len() == self.window {
            Some(self.sum / self.window as f64)
        } else {
            None
        }
    }
}

/// Population standard deviation over a trailing window.
#[derive(Debug, Clone)]
pub struct RollingStd {
    window: usize,
    buf: VecDeque<f64>,
}

impl RollingStd {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            buf: VecDeque::new(),
        }
    }

    pub fn update(&mut self, value: f64) -> Option<f64> {
        if self.window == 0 {
            return None;
        }

        self.buf.push_back(value);
        while self.buf.len() > self.window {
            self.buf.pop_front();
        }
        if self.buf.len() < self.window {
            return None;
        }

        let n = self.window as f64;
        let mean = self.buf.iter().sum::<f64>() / n;
        let var = self.buf.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        Some(var.max(0.0).sqrt())
    }
}

/// Exponential average seeded with the simple mean of its first `period` inputs.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    alpha: f64,
    seed_sum: f64,
    seed_count: usize,
    value: Option<f64>,
}

impl Ema {
    /// Smoothing factor `2 / (period + 1)`.
    pub fn new(period: usize) -> Self {
        Self::with_alpha(period, 2.0 / (period as f64 + 1.0))
    }

    /// Wilder smoothing, factor `1 / period`.
    pub fn wilder(period: usize) -> Self {
        Self::with_alpha(period, 1.0 / period.max(1) as f64)
    }

    fn with_alpha(period: usize, alpha: f64) -> Self {
        Self {
            period,
            alpha,
            seed_sum: 0.0,
            seed_count: 0,
            value: None,
        }
    }

    pub fn update(&mut self, x: f64) -> Option<f64> {
        if self.period == 0 {
            return None;
        }
        match self.value {
            Some(prev) => {
                self.value = Some(prev + self.alpha * (x - prev));
            }
            None => {
                self.seed_sum += x;
                self.seed_count += 1;
                if self.seed_count == self.period {
                    self.value = Some(self.seed_sum / self.period as f64);
                }
            }
        }
        self.value
    }
}

pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut kernel = RollingSma::new(period);
    values
        .iter()
        .map(|v| kernel.update(*v).and_then(finite))
        .collect()
}

pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut kernel = Ema::new(period);
    values
        .iter()
        .map(|v| kernel.update(*v).and_then(finite))
        .collect()
}

/// EMA over a series with missing positions; missing inputs yield missing outputs and leave
/// the state untouched, so a leading warm-up gap just delays the seed.
pub fn ema_of(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut kernel = Ema::new(period);
    values
        .iter()
        .map(|v| v.and_then(|x| kernel.update(x)).and_then(finite))
        .collect()
}

/// SMA counterpart of [`ema_of`].
pub fn sma_of(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut kernel = RollingSma::new(period);
    values
        .iter()
        .map(|v| v.and_then(|x| kernel.update(x)).and_then(finite))
        .collect()
}

pub fn rolling_max(values: &[f64], period: usize) -> Vec<Option<f64>> {
    rolling_fold(values, period, f64::max)
}

pub fn rolling_min(values: &[f64], period: usize) -> Vec<Option<f64>> {
    rolling_fold(values, period, f64::min)
}

pub fn rolling_sum(values: &[f64], period: usize) -> Vec<Option<f64>> {
    rolling_fold(values, period, |a, b| a + b)
}

fn rolling_fold(values: &[f64], period: usize, f: impl Fn(f64, f64) -> f64) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 {
        return out;
    }
    for t in (period - 1)..values.len() {
        let window = &values[t + 1 - period..=t];
        out[t] = window.iter().copied().reduce(&f).and_then(finite);
    }
    out
}

/// Element-wise combination of two aligned optional series.
pub fn zip_with(
    a: &[Option<f64>],
    b: &[Option<f64>],
    f: impl Fn(f64, f64) -> f64,
) -> Vec<Option<f64>> {
    a.iter()
        .zip(b)
        .map(|(x, y)| match (x, y) {
            (Some(x), Some(y)) => finite(f(*x, *y)),
            _ => None,
        })
        .collect()
}

/// Blanks the first `lookback` positions.
pub fn mask_lookback(mut values: Vec<Option<f64>>, lookback: usize) -> Vec<Option<f64>> {
    for v in values.iter_mut().take(lookback) {
        *v = None;
    }
    values
}

/// `num / den`, or 0 when the denominator is zero.
pub fn ratio_or_zero(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}
