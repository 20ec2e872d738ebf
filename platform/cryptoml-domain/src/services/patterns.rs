//! Candlestick pattern recognizers.
//!
//! Shape thresholds are relative: each [`CandleSetting`] compares a candle measure to the
//! average of the same measure over the preceding candles, scaled by a factor.

use crate::error::DatasetResult;
use crate::value_objects::frame::Frame;
use crate::value_objects::ohlcv::Ohlcv;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeType {
    RealBody,
    HighLow,
    Shadows,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandleSetting {
    pub range: RangeType,
    /// Candles averaged before the current one; 0 means the current candle itself.
    pub period: usize,
    pub factor: f64,
}

pub const BODY_LONG: CandleSetting = setting(RangeType::RealBody, 10, 1.0);
pub const BODY_SHORT: CandleSetting = setting(RangeType::RealBody, 10, 1.0);
pub const BODY_DOJI: CandleSetting = setting(RangeType::HighLow, 10, 0.1);
pub const SHADOW_LONG: CandleSetting = setting(RangeType::RealBody, 0, 1.0);
pub const SHADOW_VERY_LONG: CandleSetting = setting(RangeType::RealBody, 0, 2.0);
pub const SHADOW_SHORT: CandleSetting = setting(RangeType::Shadows, 10, 1.0);
pub const SHADOW_VERY_SHORT: CandleSetting = setting(RangeType::HighLow, 10, 0.1);
pub const NEAR: CandleSetting = setting(RangeType::HighLow, 5, 0.2);
pub const FAR: CandleSetting = setting(RangeType::HighLow, 5, 0.6);
pub const EQUAL: CandleSetting = setting(RangeType::HighLow, 5, 0.05);

const fn setting(range: RangeType, period: usize, factor: f64) -> CandleSetting {
    CandleSetting {
        range,
        period,
        factor,
    }
}

pub const BULLISH: i32 = 100;
pub const BEARISH: i32 = -100;

/// Borrowed OHLC view with candle geometry helpers.
pub struct Candles<'a> {
    open: &'a [f64],
    high: &'a [f64],
    low: &'a [f64],
    close: &'a [f64],
}

impl<'a> Candles<'a> {
    pub fn new(ohlcv: &'a Ohlcv) -> Self {
        Self {
            open: &ohlcv.open,
            high: &ohlcv.high,
            low: &ohlcv.low,
            close: &ohlcv.close,
        }
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    fn body(&self, i: usize) -> f64 {
        (self.close[i] - self.open[i]).abs()
    }

    fn top(&self, i: usize) -> f64 {
        self.open[i].max(self.close[i])
    }

    fn bottom(&self, i: usize) -> f64 {
        self.open[i].min(self.close[i])
    }

    fn upper(&self, i: usize) -> f64 {
        self.high[i] - self.top(i)
    }

    fn lower(&self, i: usize) -> f64 {
        self.bottom(i) - self.low[i]
    }

    fn span(&self, i: usize) -> f64 {
        self.high[i] - self.low[i]
    }

    /// `1` for a white (rising) candle, `-1` for a black one.
    fn color(&self, i: usize) -> i32 {
        if self.close[i] >= self.open[i] {
            1
        } else {
            -1
        }
    }

    fn measure(&self, range: RangeType, i: usize) -> f64 {
        match range {
            RangeType::RealBody => self.body(i),
            RangeType::HighLow => self.span(i),
            RangeType::Shadows => self.upper(i) + self.lower(i),
        }
    }

    /// Threshold for `setting` at candle `i`. Requires `i >= setting.period`.
    fn avg(&self, setting: CandleSetting, i: usize) -> f64 {
        let base = if setting.period == 0 {
            self.measure(setting.range, i)
        } else {
            (i - setting.period..i)
                .map(|j| self.measure(setting.range, j))
                .sum::<f64>()
                / setting.period as f64
        };
        let halve = if setting.range == RangeType::Shadows { 2.0 } else { 1.0 };
        setting.factor * base / halve
    }

    fn is_doji(&self, i: usize) -> bool {
        self.body(i) <= self.avg(BODY_DOJI, i)
    }

    fn has_small_body(&self, i: usize) -> bool {
        self.body(i) < self.avg(BODY_SHORT, i)
    }

    fn has_long_body(&self, i: usize) -> bool {
        self.body(i) > self.avg(BODY_LONG, i)
    }

    /// Both shadows of a long candle are very short.
    fn is_marubozu(&self, i: usize) -> bool {
        let very_short = self.avg(SHADOW_VERY_SHORT, i);
        self.has_long_body(i) && self.upper(i) < very_short && self.lower(i) < very_short
    }

    /// Real body of `b` entirely above the real body of `a`.
    fn body_gap_up(&self, a: usize, b: usize) -> bool {
        self.bottom(b) > self.top(a)
    }

    fn body_gap_down(&self, a: usize, b: usize) -> bool {
        self.top(b) < self.bottom(a)
    }

    /// Whole range of `b` above the range of `a`.
    fn gap_up(&self, a: usize, b: usize) -> bool {
        self.low[b] > self.high[a]
    }

    fn gap_down(&self, a: usize, b: usize) -> bool {
        self.high[b] < self.low[a]
    }

    /// `value` within `setting` of `target`, the tolerance taken at candle `at`.
    fn near(&self, value: f64, target: f64, setting: CandleSetting, at: usize) -> bool {
        let tolerance = self.avg(setting, at);
        value <= target + tolerance && value >= target - tolerance
    }

    fn inside_range(&self, i: usize, outer: usize) -> bool {
        self.top(i) < self.high[outer] && self.bottom(i) > self.low[outer]
    }
}

/// Signal of one pattern at candle `i`: [`BULLISH`], [`BEARISH`] or 0.
pub type PatternFn = fn(&Candles<'_>, usize) -> i32;

#[derive(Clone, Copy)]
pub struct PatternSpec {
    pub id: &'static str,
    /// Candles the pattern spans, current one included.
    pub lines: usize,
    pub settings: &'static [CandleSetting],
    pub detect: PatternFn,
}

impl PatternSpec {
    pub fn lookback(&self) -> usize {
        let averaged = self.settings.iter().map(|s| s.period).max().unwrap_or(0);
        averaged + self.lines - 1
    }

    /// Signal per candle; candles inside the lookback read 0.
    pub fn evaluate(&self, candles: &Candles<'_>) -> Vec<Option<f64>> {
        let lookback = self.lookback();
        (0..candles.len())
            .map(|i| {
                let value = if i >= lookback { (self.detect)(candles, i) } else { 0 };
                Some(f64::from(value))
            })
            .collect()
    }
}

fn signal(hit: bool, value: i32) -> i32 {
    if hit {
        value
    } else {
        0
    }
}

fn doji(c: &Candles<'_>, i: usize) -> i32 {
    signal(c.is_doji(i), BULLISH)
}

fn dragonfly_doji(c: &Candles<'_>, i: usize) -> i32 {
    let very_short = c.avg(SHADOW_VERY_SHORT, i);
    signal(
        c.is_doji(i) && c.upper(i) < very_short && c.lower(i) > very_short,
        BULLISH,
    )
}

fn gravestone_doji(c: &Candles<'_>, i: usize) -> i32 {
    let very_short = c.avg(SHADOW_VERY_SHORT, i);
    signal(
        c.is_doji(i) && c.lower(i) < very_short && c.upper(i) > very_short,
        BULLISH,
    )
}

fn long_legged_doji(c: &Candles<'_>, i: usize) -> i32 {
    let long = c.avg(SHADOW_LONG, i);
    signal(c.is_doji(i) && (c.lower(i) > long || c.upper(i) > long), BULLISH)
}

fn takuri(c: &Candles<'_>, i: usize) -> i32 {
    signal(
        c.is_doji(i)
            && c.upper(i) < c.avg(SHADOW_VERY_SHORT, i)
            && c.lower(i) > c.avg(SHADOW_VERY_LONG, i),
        BULLISH,
    )
}

fn rickshaw_man(c: &Candles<'_>, i: usize) -> i32 {
    let long = c.avg(SHADOW_LONG, i);
    let mid = c.low[i] + c.span(i) / 2.0;
    let near = c.avg(NEAR, i);
    signal(
        c.is_doji(i)
            && c.lower(i) > long
            && c.upper(i) > long
            && c.bottom(i) <= mid + near
            && c.top(i) >= mid - near,
        BULLISH,
    )
}

fn hammer_shape(c: &Candles<'_>, i: usize) -> bool {
    c.has_small_body(i)
        && c.lower(i) > c.avg(SHADOW_LONG, i)
        && c.upper(i) < c.avg(SHADOW_VERY_SHORT, i)
}

fn hammer(c: &Candles<'_>, i: usize) -> i32 {
    signal(
        hammer_shape(c, i) && c.bottom(i) <= c.low[i - 1] + c.avg(NEAR, i - 1),
        BULLISH,
    )
}

fn hanging_man(c: &Candles<'_>, i: usize) -> i32 {
    signal(
        hammer_shape(c, i) && c.bottom(i) >= c.high[i - 1] - c.avg(NEAR, i - 1),
        BEARISH,
    )
}

fn star_shape(c: &Candles<'_>, i: usize) -> bool {
    c.has_small_body(i)
        && c.upper(i) > c.avg(SHADOW_LONG, i)
        && c.lower(i) < c.avg(SHADOW_VERY_SHORT, i)
}

fn inverted_hammer(c: &Candles<'_>, i: usize) -> i32 {
    signal(star_shape(c, i) && c.top(i) < c.bottom(i - 1), BULLISH)
}

fn shooting_star(c: &Candles<'_>, i: usize) -> i32 {
    signal(star_shape(c, i) && c.bottom(i) > c.top(i - 1), BEARISH)
}

fn marubozu(c: &Candles<'_>, i: usize) -> i32 {
    signal(c.is_marubozu(i), c.color(i) * BULLISH)
}

fn closing_marubozu(c: &Candles<'_>, i: usize) -> i32 {
    let very_short = c.avg(SHADOW_VERY_SHORT, i);
    let closes_at_extreme = if c.color(i) == 1 {
        c.upper(i) < very_short
    } else {
        c.lower(i) < very_short
    };
    signal(c.has_long_body(i) && closes_at_extreme, c.color(i) * BULLISH)
}

fn belt_hold(c: &Candles<'_>, i: usize) -> i32 {
    let very_short = c.avg(SHADOW_VERY_SHORT, i);
    let opens_at_extreme = if c.color(i) == 1 {
        c.lower(i) < very_short
    } else {
        c.upper(i) < very_short
    };
    signal(c.has_long_body(i) && opens_at_extreme, c.color(i) * BULLISH)
}

fn long_line(c: &Candles<'_>, i: usize) -> i32 {
    let short = c.avg(SHADOW_SHORT, i);
    signal(
        c.has_long_body(i) && c.upper(i) < short && c.lower(i) < short,
        c.color(i) * BULLISH,
    )
}

fn short_line(c: &Candles<'_>, i: usize) -> i32 {
    let short = c.avg(SHADOW_SHORT, i);
    signal(
        c.has_small_body(i) && c.upper(i) < short && c.lower(i) < short,
        c.color(i) * BULLISH,
    )
}

fn spinning_top(c: &Candles<'_>, i: usize) -> i32 {
    let body = c.body(i);
    signal(
        c.has_small_body(i) && c.upper(i) > body && c.lower(i) > body,
        c.color(i) * BULLISH,
    )
}

fn high_wave(c: &Candles<'_>, i: usize) -> i32 {
    let very_long = c.avg(SHADOW_VERY_LONG, i);
    signal(
        c.has_small_body(i) && c.upper(i) > very_long && c.lower(i) > very_long,
        c.color(i) * BULLISH,
    )
}

fn engulfing(c: &Candles<'_>, i: usize) -> i32 {
    let p = i - 1;
    let bullish = c.color(i) == 1
        && c.color(p) == -1
        && c.close[i] > c.open[p]
        && c.open[i] < c.close[p];
    let bearish = c.color(i) == -1
        && c.color(p) == 1
        && c.open[i] > c.close[p]
        && c.close[i] < c.open[p];
    signal(bullish || bearish, c.color(i) * BULLISH)
}

fn inside_previous_body(c: &Candles<'_>, i: usize) -> bool {
    c.top(i) < c.top(i - 1) && c.bottom(i) > c.bottom(i - 1)
}

fn harami(c: &Candles<'_>, i: usize) -> i32 {
    signal(
        c.has_long_body(i - 1) && c.body(i) <= c.avg(BODY_SHORT, i) && inside_previous_body(c, i),
        -c.color(i - 1) * BULLISH,
    )
}

fn harami_cross(c: &Candles<'_>, i: usize) -> i32 {
    signal(
        c.has_long_body(i - 1) && c.is_doji(i) && inside_previous_body(c, i),
        -c.color(i - 1) * BULLISH,
    )
}

fn piercing(c: &Candles<'_>, i: usize) -> i32 {
    let p = i - 1;
    signal(
        c.color(p) == -1
            && c.has_long_body(p)
            && c.color(i) == 1
            && c.has_long_body(i)
            && c.open[i] < c.low[p]
            && c.close[i] < c.open[p]
            && c.close[i] > c.close[p] + c.body(p) * 0.5,
        BULLISH,
    )
}

fn dark_cloud_cover(c: &Candles<'_>, i: usize) -> i32 {
    let p = i - 1;
    signal(
        c.color(p) == 1
            && c.has_long_body(p)
            && c.color(i) == -1
            && c.open[i] > c.high[p]
            && c.close[i] > c.open[p]
            && c.close[i] < c.close[p] - c.body(p) * 0.5,
        BEARISH,
    )
}

const STAR_PENETRATION: f64 = 0.3;

fn morning_star(c: &Candles<'_>, i: usize) -> i32 {
    let (first, star) = (i - 2, i - 1);
    signal(
        c.color(first) == -1
            && c.has_long_body(first)
            && c.body(star) <= c.avg(BODY_SHORT, star)
            && c.top(star) < c.bottom(first)
            && c.color(i) == 1
            && c.body(i) > c.avg(BODY_SHORT, i)
            && c.close[i] > c.close[first] + c.body(first) * STAR_PENETRATION,
        BULLISH,
    )
}

fn evening_star(c: &Candles<'_>, i: usize) -> i32 {
    let (first, star) = (i - 2, i - 1);
    signal(
        c.color(first) == 1
            && c.has_long_body(first)
            && c.body(star) <= c.avg(BODY_SHORT, star)
            && c.bottom(star) > c.top(first)
            && c.color(i) == -1
            && c.body(i) > c.avg(BODY_SHORT, i)
            && c.close[i] < c.close[first] - c.body(first) * STAR_PENETRATION,
        BEARISH,
    )
}

fn three_black_crows(c: &Candles<'_>, i: usize) -> i32 {
    let crows = [i - 2, i - 1, i];
    let black_and_clean = crows
        .iter()
        .all(|&j| c.color(j) == -1 && c.lower(j) < c.avg(SHADOW_VERY_SHORT, j));
    let opens_within = crows
        .windows(2)
        .all(|w| c.open[w[1]] < c.open[w[0]] && c.open[w[1]] > c.close[w[0]]);
    let falling = crows.windows(2).all(|w| c.close[w[1]] < c.close[w[0]]);
    signal(
        c.color(i - 3) == 1
            && c.high[i - 3] > c.close[i - 2]
            && black_and_clean
            && opens_within
            && falling,
        BEARISH,
    )
}

fn three_white_soldiers(c: &Candles<'_>, i: usize) -> i32 {
    let soldiers = [i - 2, i - 1, i];
    let white_and_clean = soldiers
        .iter()
        .all(|&j| c.color(j) == 1 && c.upper(j) < c.avg(SHADOW_VERY_SHORT, j));
    let opens_within = soldiers
        .windows(2)
        .all(|w| c.open[w[1]] > c.open[w[0]] && c.open[w[1]] <= c.close[w[0]]);
    let rising = soldiers.windows(2).all(|w| c.close[w[1]] > c.close[w[0]]);
    signal(white_and_clean && opens_within && rising, BULLISH)
}

fn doji_star(c: &Candles<'_>, i: usize) -> i32 {
    let p = i - 1;
    let gapped = if c.color(p) == 1 {
        c.body_gap_up(p, i)
    } else {
        c.body_gap_down(p, i)
    };
    signal(c.has_long_body(p) && c.is_doji(i) && gapped, -c.color(p) * BULLISH)
}

fn morning_doji_star(c: &Candles<'_>, i: usize) -> i32 {
    let (first, star) = (i - 2, i - 1);
    signal(
        c.color(first) == -1
            && c.has_long_body(first)
            && c.is_doji(star)
            && c.body_gap_down(first, star)
            && c.color(i) == 1
            && c.body(i) > c.avg(BODY_SHORT, i)
            && c.close[i] > c.close[first] + c.body(first) * STAR_PENETRATION,
        BULLISH,
    )
}

fn evening_doji_star(c: &Candles<'_>, i: usize) -> i32 {
    let (first, star) = (i - 2, i - 1);
    signal(
        c.color(first) == 1
            && c.has_long_body(first)
            && c.is_doji(star)
            && c.body_gap_up(first, star)
            && c.color(i) == -1
            && c.body(i) > c.avg(BODY_SHORT, i)
            && c.close[i] < c.close[first] - c.body(first) * STAR_PENETRATION,
        BEARISH,
    )
}

fn abandoned_baby(c: &Candles<'_>, i: usize) -> i32 {
    let (first, baby) = (i - 2, i - 1);
    if !(c.has_long_body(first) && c.is_doji(baby) && c.body(i) > c.avg(BODY_SHORT, i)) {
        return 0;
    }
    let bearish = c.color(first) == 1
        && c.color(i) == -1
        && c.close[i] < c.close[first] - c.body(first) * STAR_PENETRATION
        && c.gap_up(first, baby)
        && c.gap_down(baby, i);
    let bullish = c.color(first) == -1
        && c.color(i) == 1
        && c.close[i] > c.close[first] + c.body(first) * STAR_PENETRATION
        && c.gap_down(first, baby)
        && c.gap_up(baby, i);
    signal(bearish || bullish, c.color(i) * BULLISH)
}

fn tristar(c: &Candles<'_>, i: usize) -> i32 {
    let (first, mid) = (i - 2, i - 1);
    let threshold = c.avg(BODY_DOJI, first);
    if !(c.body(first) <= threshold && c.body(mid) <= threshold && c.body(i) <= threshold) {
        return 0;
    }
    if c.body_gap_up(first, mid) && c.top(i) < c.top(mid) {
        BEARISH
    } else if c.body_gap_down(first, mid) && c.bottom(i) > c.bottom(mid) {
        BULLISH
    } else {
        0
    }
}

fn two_crows(c: &Candles<'_>, i: usize) -> i32 {
    let (first, second) = (i - 2, i - 1);
    signal(
        c.color(first) == 1
            && c.has_long_body(first)
            && c.color(second) == -1
            && c.body_gap_up(first, second)
            && c.color(i) == -1
            && c.open[i] < c.open[second]
            && c.open[i] > c.close[second]
            && c.close[i] > c.open[first]
            && c.close[i] < c.close[first],
        BEARISH,
    )
}

fn upside_gap_two_crows(c: &Candles<'_>, i: usize) -> i32 {
    let (first, second) = (i - 2, i - 1);
    signal(
        c.color(first) == 1
            && c.has_long_body(first)
            && c.color(second) == -1
            && c.body(second) <= c.avg(BODY_SHORT, second)
            && c.body_gap_up(first, second)
            && c.color(i) == -1
            && c.open[i] > c.open[second]
            && c.close[i] < c.close[second]
            && c.close[i] > c.close[first],
        BEARISH,
    )
}

fn identical_three_crows(c: &Candles<'_>, i: usize) -> i32 {
    let crows = [i - 2, i - 1, i];
    let black_and_clean = crows
        .iter()
        .all(|&j| c.color(j) == -1 && c.lower(j) < c.avg(SHADOW_VERY_SHORT, j));
    let falling = crows.windows(2).all(|w| c.close[w[1]] < c.close[w[0]]);
    let opens_at_prior_close = crows
        .windows(2)
        .all(|w| c.near(c.open[w[1]], c.close[w[0]], EQUAL, w[0]));
    signal(black_and_clean && falling && opens_at_prior_close, BEARISH)
}

fn three_inside(c: &Candles<'_>, i: usize) -> i32 {
    let (first, second) = (i - 2, i - 1);
    let harami = c.has_long_body(first)
        && c.body(second) <= c.avg(BODY_SHORT, second)
        && c.top(second) < c.top(first)
        && c.bottom(second) > c.bottom(first);
    let confirmed = (c.color(first) == 1 && c.color(i) == -1 && c.close[i] < c.open[first])
        || (c.color(first) == -1 && c.color(i) == 1 && c.close[i] > c.open[first]);
    signal(harami && confirmed, -c.color(first) * BULLISH)
}

fn three_outside(c: &Candles<'_>, i: usize) -> i32 {
    let (first, second) = (i - 2, i - 1);
    let white_engulfing = c.color(second) == 1
        && c.color(first) == -1
        && c.close[second] > c.open[first]
        && c.open[second] < c.close[first];
    let black_engulfing = c.color(second) == -1
        && c.color(first) == 1
        && c.open[second] > c.close[first]
        && c.close[second] < c.open[first];
    if white_engulfing && c.close[i] > c.close[second] {
        BULLISH
    } else if black_engulfing && c.close[i] < c.close[second] {
        BEARISH
    } else {
        0
    }
}

fn three_line_strike(c: &Candles<'_>, i: usize) -> i32 {
    let (a, b, d) = (i - 3, i - 2, i - 1);
    let color = c.color(a);
    if c.color(b) != color || c.color(d) != color || c.color(i) != -color {
        return 0;
    }
    let opens_within = |prev: usize, cur: usize| {
        let near = c.avg(NEAR, prev);
        c.open[cur] >= c.bottom(prev) - near && c.open[cur] <= c.top(prev) + near
    };
    let stepping = |x: usize, y: usize| f64::from(color) * (c.close[y] - c.close[x]) > 0.0;
    let strikes = if color == 1 {
        c.open[i] > c.close[d] && c.close[i] < c.open[a]
    } else {
        c.open[i] < c.close[d] && c.close[i] > c.open[a]
    };
    signal(
        opens_within(a, b) && opens_within(b, d) && stepping(a, b) && stepping(b, d) && strikes,
        color * BULLISH,
    )
}

fn three_stars_in_south(c: &Candles<'_>, i: usize) -> i32 {
    let (first, second) = (i - 2, i - 1);
    let all_black = [first, second, i].iter().all(|&j| c.color(j) == -1);
    let very_short = c.avg(SHADOW_VERY_SHORT, i);
    signal(
        all_black
            && c.has_long_body(first)
            && c.lower(first) > c.avg(SHADOW_LONG, first)
            && c.body(second) < c.body(first)
            && c.open[second] > c.close[first]
            && c.open[second] <= c.high[first]
            && c.low[second] > c.low[first]
            && c.lower(second) > c.avg(SHADOW_VERY_SHORT, second)
            && c.body(i) < c.avg(BODY_SHORT, i)
            && c.upper(i) < very_short
            && c.lower(i) < very_short
            && c.low[i] > c.low[second]
            && c.high[i] < c.high[second],
        BULLISH,
    )
}

fn advance_block(c: &Candles<'_>, i: usize) -> i32 {
    let (first, second) = (i - 2, i - 1);
    let all_white = [first, second, i].iter().all(|&j| c.color(j) == 1);
    let rising = c.close[i] > c.close[second] && c.close[second] > c.close[first];
    let opens_within = |prev: usize, cur: usize| {
        c.open[cur] > c.open[prev] && c.open[cur] <= c.close[prev] + c.avg(NEAR, prev)
    };
    let (b1, b2, b3) = (c.body(first), c.body(second), c.body(i));
    let short = |j: usize| c.avg(SHADOW_SHORT, j);
    let weakening = (b2 <= b1 - c.avg(FAR, first) && b3 < b2 + c.avg(NEAR, second))
        || b3 < b2 - c.avg(FAR, second)
        || (b3 < b2 && b2 < b1 && (c.upper(i) > short(i) || c.upper(second) > short(second)))
        || (b3 < b2 && c.upper(i) > c.avg(SHADOW_LONG, i));
    signal(
        all_white
            && rising
            && opens_within(first, second)
            && opens_within(second, i)
            && c.has_long_body(first)
            && c.upper(first) < short(first)
            && weakening,
        BEARISH,
    )
}

fn stalled_pattern(c: &Candles<'_>, i: usize) -> i32 {
    let (first, second) = (i - 2, i - 1);
    let all_white = [first, second, i].iter().all(|&j| c.color(j) == 1);
    signal(
        all_white
            && c.close[i] > c.close[second]
            && c.close[second] > c.close[first]
            && c.has_long_body(first)
            && c.has_long_body(second)
            && c.upper(second) < c.avg(SHADOW_VERY_SHORT, second)
            && c.open[second] > c.open[first]
            && c.open[second] <= c.close[first] + c.avg(NEAR, first)
            && c.body(i) < c.avg(BODY_SHORT, i)
            && c.open[i] >= c.close[second] - c.body(i) - c.avg(NEAR, second),
        BEARISH,
    )
}

fn breakaway(c: &Candles<'_>, i: usize) -> i32 {
    let (a, b, m, d) = (i - 4, i - 3, i - 2, i - 1);
    let color = c.color(a);
    if !(c.has_long_body(a) && c.color(b) == color && c.color(d) == color && c.color(i) == -color)
    {
        return 0;
    }
    let hit = if color == -1 {
        c.body_gap_down(a, b)
            && c.high[m] < c.high[b]
            && c.low[m] < c.low[b]
            && c.high[d] < c.high[m]
            && c.low[d] < c.low[m]
            && c.close[i] > c.open[b]
            && c.close[i] < c.close[a]
    } else {
        c.body_gap_up(a, b)
            && c.high[m] > c.high[b]
            && c.low[m] > c.low[b]
            && c.high[d] > c.high[m]
            && c.low[d] > c.low[m]
            && c.close[i] < c.open[b]
            && c.close[i] > c.close[a]
    };
    signal(hit, c.color(i) * BULLISH)
}

fn conceal_baby_swallow(c: &Candles<'_>, i: usize) -> i32 {
    let (a, b, d) = (i - 3, i - 2, i - 1);
    let all_black = [a, b, d, i].iter().all(|&j| c.color(j) == -1);
    let bald = |j: usize| {
        let very_short = c.avg(SHADOW_VERY_SHORT, j);
        c.upper(j) < very_short && c.lower(j) < very_short
    };
    signal(
        all_black
            && bald(a)
            && bald(b)
            && c.body_gap_down(b, d)
            && c.upper(d) > c.avg(SHADOW_VERY_SHORT, d)
            && c.high[d] > c.close[b]
            && c.high[i] > c.high[d]
            && c.low[i] < c.low[d],
        BULLISH,
    )
}

fn counterattack(c: &Candles<'_>, i: usize) -> i32 {
    let p = i - 1;
    signal(
        c.color(p) == -c.color(i)
            && c.has_long_body(p)
            && c.has_long_body(i)
            && c.near(c.close[i], c.close[p], EQUAL, p),
        c.color(i) * BULLISH,
    )
}

fn gap_side_side_white(c: &Candles<'_>, i: usize) -> i32 {
    let (first, second) = (i - 2, i - 1);
    let side_by_side = c.color(second) == 1
        && c.color(i) == 1
        && c.near(c.body(i), c.body(second), NEAR, second)
        && c.near(c.open[i], c.open[second], EQUAL, second);
    if !side_by_side {
        return 0;
    }
    if c.body_gap_up(first, second) && c.body_gap_up(first, i) {
        BULLISH
    } else if c.body_gap_down(first, second) && c.body_gap_down(first, i) {
        BEARISH
    } else {
        0
    }
}

/// Inside bar at `end - 1` followed by a breakout bar at `end`.
fn hikkake_setup(c: &Candles<'_>, end: usize) -> i32 {
    let (mother, inside) = (end - 2, end - 1);
    if !(c.high[inside] < c.high[mother] && c.low[inside] > c.low[mother]) {
        return 0;
    }
    if c.high[end] < c.high[inside] && c.low[end] < c.low[inside] {
        BULLISH
    } else if c.high[end] > c.high[inside] && c.low[end] > c.low[inside] {
        BEARISH
    } else {
        0
    }
}

/// Two nested inside bars, the first closing near its extreme, then a breakout bar.
fn hikkake_mod_setup(c: &Candles<'_>, end: usize) -> i32 {
    let (a, b, inside) = (end - 3, end - 2, end - 1);
    let nested = c.high[b] < c.high[a]
        && c.low[b] > c.low[a]
        && c.high[inside] < c.high[b]
        && c.low[inside] > c.low[b];
    if !nested {
        return 0;
    }
    let near = c.avg(NEAR, b);
    if c.high[end] < c.high[inside] && c.low[end] < c.low[inside] && c.close[b] <= c.low[b] + near
    {
        BULLISH
    } else if c.high[end] > c.high[inside]
        && c.low[end] > c.low[inside]
        && c.close[b] >= c.high[b] - near
    {
        BEARISH
    } else {
        0
    }
}

/// Setup signal on its own bar, doubled on the first close beyond the inside bar
/// within three bars of the most recent setup.
fn confirmed_breakout(
    c: &Candles<'_>,
    i: usize,
    setup: fn(&Candles<'_>, usize) -> i32,
) -> i32 {
    let now = setup(c, i);
    if now != 0 {
        return now;
    }
    for k in 1..=3 {
        let end = i - k;
        let direction = setup(c, end);
        if direction == 0 {
            continue;
        }
        let inside = end - 1;
        let crosses = |j: usize| {
            if direction > 0 {
                c.close[j] > c.high[inside]
            } else {
                c.close[j] < c.low[inside]
            }
        };
        let already = (end + 1..i).any(&crosses);
        return signal(!already && crosses(i), 2 * direction);
    }
    0
}

fn hikkake(c: &Candles<'_>, i: usize) -> i32 {
    confirmed_breakout(c, i, hikkake_setup)
}

fn hikkake_mod(c: &Candles<'_>, i: usize) -> i32 {
    confirmed_breakout(c, i, hikkake_mod_setup)
}

fn homing_pigeon(c: &Candles<'_>, i: usize) -> i32 {
    let p = i - 1;
    signal(
        c.color(p) == -1
            && c.color(i) == -1
            && c.has_long_body(p)
            && c.body(i) <= c.avg(BODY_SHORT, i)
            && c.open[i] < c.open[p]
            && c.close[i] > c.close[p],
        BULLISH,
    )
}

/// Long black candle followed by a white one opening below its low.
fn neckline_setup(c: &Candles<'_>, i: usize) -> bool {
    let p = i - 1;
    c.color(p) == -1 && c.has_long_body(p) && c.color(i) == 1 && c.open[i] < c.low[p]
}

fn in_neck(c: &Candles<'_>, i: usize) -> i32 {
    let p = i - 1;
    signal(
        neckline_setup(c, i)
            && c.close[i] <= c.close[p] + c.avg(EQUAL, p)
            && c.close[i] >= c.close[p],
        BEARISH,
    )
}

fn on_neck(c: &Candles<'_>, i: usize) -> i32 {
    let p = i - 1;
    signal(
        neckline_setup(c, i) && c.near(c.close[i], c.low[p], EQUAL, p),
        BEARISH,
    )
}

fn thrusting(c: &Candles<'_>, i: usize) -> i32 {
    let p = i - 1;
    signal(
        neckline_setup(c, i)
            && c.close[i] > c.close[p] + c.avg(EQUAL, p)
            && c.close[i] <= c.close[p] + c.body(p) * 0.5,
        BEARISH,
    )
}

fn kicking_gap(c: &Candles<'_>, i: usize) -> bool {
    let p = i - 1;
    let gapped = if c.color(p) == -1 {
        c.gap_up(p, i)
    } else {
        c.gap_down(p, i)
    };
    c.color(p) == -c.color(i) && c.is_marubozu(p) && c.is_marubozu(i) && gapped
}

fn kicking(c: &Candles<'_>, i: usize) -> i32 {
    signal(kicking_gap(c, i), c.color(i) * BULLISH)
}

fn kicking_by_length(c: &Candles<'_>, i: usize) -> i32 {
    let longer = if c.body(i) > c.body(i - 1) { i } else { i - 1 };
    signal(kicking_gap(c, i), c.color(longer) * BULLISH)
}

fn ladder_bottom(c: &Candles<'_>, i: usize) -> i32 {
    let (a, b, m, d) = (i - 4, i - 3, i - 2, i - 1);
    let falling = [a, b, m].windows(2).all(|w| {
        c.open[w[1]] < c.open[w[0]] && c.close[w[1]] < c.close[w[0]]
    });
    signal(
        [a, b, m, d].iter().all(|&j| c.color(j) == -1)
            && falling
            && c.upper(d) > c.avg(SHADOW_VERY_SHORT, d)
            && c.color(i) == 1
            && c.open[i] > c.open[d]
            && c.close[i] > c.high[d],
        BULLISH,
    )
}

fn matching_low(c: &Candles<'_>, i: usize) -> i32 {
    let p = i - 1;
    signal(
        c.color(p) == -1 && c.color(i) == -1 && c.near(c.close[i], c.close[p], EQUAL, p),
        BULLISH,
    )
}

const MAT_HOLD_PENETRATION: f64 = 0.5;

fn mat_hold(c: &Candles<'_>, i: usize) -> i32 {
    let (a, b, m, d) = (i - 4, i - 3, i - 2, i - 1);
    let reaction = [b, m, d];
    let small = reaction
        .iter()
        .all(|&j| c.body(j) < c.avg(BODY_SHORT, j));
    let holds = reaction
        .iter()
        .all(|&j| c.bottom(j) > c.close[a] - c.body(a) * MAT_HOLD_PENETRATION);
    let drifting = c.top(m) < c.open[b] && c.top(d) < c.top(m);
    let top = c.high[b].max(c.high[m]).max(c.high[d]);
    signal(
        c.color(a) == 1
            && c.has_long_body(a)
            && c.color(b) == -1
            && c.body_gap_up(a, b)
            && small
            && holds
            && drifting
            && c.color(i) == 1
            && c.open[i] > c.close[d]
            && c.close[i] > top,
        BULLISH,
    )
}

fn rise_fall_three_methods(c: &Candles<'_>, i: usize) -> i32 {
    let (a, b, m, d) = (i - 4, i - 3, i - 2, i - 1);
    let color = c.color(a);
    let sign = f64::from(color);
    let reaction = [b, m, d];
    let hit = c.has_long_body(a)
        && c.has_long_body(i)
        && c.color(i) == color
        && reaction
            .iter()
            .all(|&j| c.color(j) == -color && c.body(j) < c.avg(BODY_SHORT, j))
        && reaction.iter().all(|&j| c.inside_range(j, a))
        && sign * c.close[m] < sign * c.close[b]
        && sign * c.close[d] < sign * c.close[m]
        && sign * c.open[i] > sign * c.close[d]
        && sign * c.close[i] > sign * c.close[a];
    signal(hit, color * BULLISH)
}

fn separating_lines(c: &Candles<'_>, i: usize) -> i32 {
    let p = i - 1;
    let very_short = c.avg(SHADOW_VERY_SHORT, i);
    let belt = if c.color(i) == 1 {
        c.lower(i) < very_short
    } else {
        c.upper(i) < very_short
    };
    signal(
        c.color(p) == -c.color(i)
            && c.near(c.open[i], c.open[p], EQUAL, p)
            && c.has_long_body(i)
            && belt,
        c.color(i) * BULLISH,
    )
}

fn stick_sandwich(c: &Candles<'_>, i: usize) -> i32 {
    let (first, second) = (i - 2, i - 1);
    signal(
        c.color(first) == -1
            && c.color(second) == 1
            && c.color(i) == -1
            && c.low[second] > c.close[first]
            && c.near(c.close[i], c.close[first], EQUAL, first),
        BULLISH,
    )
}

fn tasuki_gap(c: &Candles<'_>, i: usize) -> i32 {
    let (first, second) = (i - 2, i - 1);
    let similar = (c.body(second) - c.body(i)).abs() < c.avg(NEAR, second);
    let upside = c.body_gap_up(first, second)
        && c.color(second) == 1
        && c.color(i) == -1
        && c.open[i] < c.close[second]
        && c.open[i] > c.open[second]
        && c.close[i] < c.open[second]
        && c.close[i] > c.top(first);
    let downside = c.body_gap_down(first, second)
        && c.color(second) == -1
        && c.color(i) == 1
        && c.open[i] < c.open[second]
        && c.open[i] > c.close[second]
        && c.close[i] > c.open[second]
        && c.close[i] < c.bottom(first);
    if similar && upside {
        BULLISH
    } else if similar && downside {
        BEARISH
    } else {
        0
    }
}

fn unique_three_river(c: &Candles<'_>, i: usize) -> i32 {
    let (first, second) = (i - 2, i - 1);
    signal(
        c.color(first) == -1
            && c.has_long_body(first)
            && c.color(second) == -1
            && c.close[second] > c.close[first]
            && c.open[second] <= c.open[first]
            && c.low[second] < c.low[first]
            && c.color(i) == 1
            && c.body(i) < c.avg(BODY_SHORT, i)
            && c.open[i] > c.low[second]
            && c.close[i] < c.close[second],
        BULLISH,
    )
}

fn xside_gap_three_methods(c: &Candles<'_>, i: usize) -> i32 {
    let (first, second) = (i - 2, i - 1);
    let color = c.color(first);
    let gapped = if color == 1 {
        c.body_gap_up(first, second)
    } else {
        c.body_gap_down(first, second)
    };
    signal(
        c.color(second) == color
            && c.color(i) == -color
            && gapped
            && c.open[i] < c.top(second)
            && c.open[i] > c.bottom(second)
            && c.close[i] < c.top(first)
            && c.close[i] > c.bottom(first),
        color * BULLISH,
    )
}

const fn pattern(
    id: &'static str,
    lines: usize,
    settings: &'static [CandleSetting],
    detect: PatternFn,
) -> PatternSpec {
    PatternSpec {
        id,
        lines,
        settings,
        detect,
    }
}

static PATTERNS: &[PatternSpec] = &[
    pattern("2crows", 3, &[BODY_LONG], two_crows),
    pattern("3blackcrows", 4, &[SHADOW_VERY_SHORT], three_black_crows),
    pattern("3inside", 3, &[BODY_LONG, BODY_SHORT], three_inside),
    pattern("3linestrike", 4, &[NEAR], three_line_strike),
    pattern("3outside", 3, &[], three_outside),
    pattern(
        "3starsinsouth",
        3,
        &[BODY_LONG, SHADOW_LONG, BODY_SHORT, SHADOW_VERY_SHORT],
        three_stars_in_south,
    ),
    pattern("3whitesoldiers", 3, &[SHADOW_VERY_SHORT], three_white_soldiers),
    pattern(
        "abandonedbaby",
        3,
        &[BODY_LONG, BODY_DOJI, BODY_SHORT],
        abandoned_baby,
    ),
    pattern(
        "advanceblock",
        3,
        &[SHADOW_SHORT, SHADOW_LONG, NEAR, FAR, BODY_LONG],
        advance_block,
    ),
    pattern("belthold", 1, &[BODY_LONG, SHADOW_VERY_SHORT], belt_hold),
    pattern("breakaway", 5, &[BODY_LONG], breakaway),
    pattern(
        "closingmarubozu",
        1,
        &[BODY_LONG, SHADOW_VERY_SHORT],
        closing_marubozu,
    ),
    pattern(
        "concealbabyswall",
        4,
        &[SHADOW_VERY_SHORT],
        conceal_baby_swallow,
    ),
    pattern("counterattack", 2, &[BODY_LONG, EQUAL], counterattack),
    pattern("darkcloudcover", 2, &[BODY_LONG], dark_cloud_cover),
    pattern("doji", 1, &[BODY_DOJI], doji),
    pattern("dojistar", 2, &[BODY_LONG, BODY_DOJI], doji_star),
    pattern("dragonflydoji", 1, &[BODY_DOJI, SHADOW_VERY_SHORT], dragonfly_doji),
    pattern("engulfing", 2, &[], engulfing),
    pattern(
        "eveningdojistar",
        3,
        &[BODY_LONG, BODY_DOJI, BODY_SHORT],
        evening_doji_star,
    ),
    pattern("eveningstar", 3, &[BODY_LONG, BODY_SHORT], evening_star),
    pattern("gapsidesidewhite", 3, &[NEAR, EQUAL], gap_side_side_white),
    pattern("gravestonedoji", 1, &[BODY_DOJI, SHADOW_VERY_SHORT], gravestone_doji),
    pattern(
        "hammer",
        2,
        &[BODY_SHORT, SHADOW_LONG, SHADOW_VERY_SHORT, NEAR],
        hammer,
    ),
    pattern(
        "hangingman",
        2,
        &[BODY_SHORT, SHADOW_LONG, SHADOW_VERY_SHORT, NEAR],
        hanging_man,
    ),
    pattern("harami", 2, &[BODY_LONG, BODY_SHORT], harami),
    pattern("haramicross", 2, &[BODY_LONG, BODY_DOJI], harami_cross),
    pattern("highwave", 1, &[BODY_SHORT, SHADOW_VERY_LONG], high_wave),
    pattern("hikkake", 6, &[], hikkake),
    pattern("hikkakemod", 7, &[NEAR], hikkake_mod),
    pattern("homingpigeon", 2, &[BODY_LONG, BODY_SHORT], homing_pigeon),
    pattern(
        "identical3crows",
        3,
        &[SHADOW_VERY_SHORT, EQUAL],
        identical_three_crows,
    ),
    pattern("inneck", 2, &[BODY_LONG, EQUAL], in_neck),
    pattern(
        "invertedhammer",
        2,
        &[BODY_SHORT, SHADOW_LONG, SHADOW_VERY_SHORT],
        inverted_hammer,
    ),
    pattern("kicking", 2, &[SHADOW_VERY_SHORT, BODY_LONG], kicking),
    pattern(
        "kickingbylength",
        2,
        &[SHADOW_VERY_SHORT, BODY_LONG],
        kicking_by_length,
    ),
    pattern("ladderbottom", 5, &[SHADOW_VERY_SHORT], ladder_bottom),
    pattern("longleggeddoji", 1, &[BODY_DOJI, SHADOW_LONG], long_legged_doji),
    pattern("longline", 1, &[BODY_LONG, SHADOW_SHORT], long_line),
    pattern("marubozu", 1, &[BODY_LONG, SHADOW_VERY_SHORT], marubozu),
    pattern("matchinglow", 2, &[EQUAL], matching_low),
    pattern("mathold", 5, &[BODY_SHORT, BODY_LONG], mat_hold),
    pattern(
        "morningdojistar",
        3,
        &[BODY_LONG, BODY_DOJI, BODY_SHORT],
        morning_doji_star,
    ),
    pattern("morningstar", 3, &[BODY_LONG, BODY_SHORT], morning_star),
    pattern("onneck", 2, &[BODY_LONG, EQUAL], on_neck),
    pattern("piercing", 2, &[BODY_LONG], piercing),
    pattern("rickshawman", 1, &[BODY_DOJI, SHADOW_LONG, NEAR], rickshaw_man),
    pattern(
        "risefall3methods",
        5,
        &[BODY_SHORT, BODY_LONG],
        rise_fall_three_methods,
    ),
    pattern(
        "separatinglines",
        2,
        &[SHADOW_VERY_SHORT, BODY_LONG, EQUAL],
        separating_lines,
    ),
    pattern(
        "shootingstar",
        2,
        &[BODY_SHORT, SHADOW_LONG, SHADOW_VERY_SHORT],
        shooting_star,
    ),
    pattern("shortline", 1, &[BODY_SHORT, SHADOW_SHORT], short_line),
    pattern("spinningtop", 1, &[BODY_SHORT], spinning_top),
    pattern(
        "stalledpattern",
        3,
        &[BODY_LONG, BODY_SHORT, SHADOW_VERY_SHORT, NEAR],
        stalled_pattern,
    ),
    pattern("sticksandwich", 3, &[EQUAL], stick_sandwich),
    pattern(
        "takuri",
        1,
        &[BODY_DOJI, SHADOW_VERY_SHORT, SHADOW_VERY_LONG],
        takuri,
    ),
    pattern("tasukigap", 3, &[NEAR], tasuki_gap),
    pattern("thrusting", 2, &[BODY_LONG, EQUAL], thrusting),
    pattern("tristar", 3, &[BODY_DOJI], tristar),
    pattern("unique3river", 3, &[BODY_LONG, BODY_SHORT], unique_three_river),
    pattern(
        "upsidegap2crows",
        3,
        &[BODY_LONG, BODY_SHORT],
        upside_gap_two_crows,
    ),
    pattern("xsidegap3methods", 3, &[], xside_gap_three_methods),
];

pub fn patterns() -> &'static [PatternSpec] {
    PATTERNS
}

/// One `cdl_<id>` column per pattern.
pub fn candlestick_signals(ohlcv: &Ohlcv) -> DatasetResult<Frame> {
    let candles = Candles::new(ohlcv);
    let mut frame = Frame::new(ohlcv.index().to_vec());
    for spec in patterns() {
        frame.push(format!("cdl_{}", spec.id), spec.evaluate(&candles))?;
    }
    Ok(frame)
}

/// Cross-sectional mean and sum of every pattern signal at each bar.
///
/// Every pattern counts on every bar, reading 0 while inside its lookback, so the mean is
/// always taken over the full registry.
pub fn make_ohlc_patterns(ohlcv: &Ohlcv) -> DatasetResult<Frame> {
    let signals = candlestick_signals(ohlcv)?;
    let width = signals.width();
    let mut mean = Vec::with_capacity(signals.height());
    let mut sum = Vec::with_capacity(signals.height());
    for row in 0..signals.height() {
        let total: f64 = (0..width)
            .map(|col| signals.value(row, col).unwrap_or(0.0))
            .sum();
        mean.push(Some(total / width as f64));
        sum.push(Some(total));
    }

    let mut frame = Frame::new(ohlcv.index().to_vec());
    frame.push("talib_patterns_mean", mean)?;
    frame.push("talib_patterns_sum", sum)?;
    Ok(frame)
}
