use super::discretization::{
    to_discrete_double, to_discrete_single, BinDiscretizer, DiscretizationStrategy, TargetClass,
};
use crate::error::{DatasetError, DatasetResult};
use crate::value_objects::frame::Frame;
use crate::value_objects::ohlcv::Ohlcv;
use crate::value_objects::series::Series;

pub const TARGET_COLUMNS: [&str; 6] = ["price", "pct", "class", "binary", "bin_class", "bin_binary"];

/// Labelling parameters, validated on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetConfig {
    horizon: usize,
    class_thresholds: (f64, f64),
    binary_threshold: f64,
    bin_strategy: DiscretizationStrategy,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            horizon: 1,
            class_thresholds: (-0.01, 0.01),
            binary_threshold: 0.0,
            bin_strategy: DiscretizationStrategy::Quantile,
        }
    }
}

impl TargetConfig {
    pub fn new(
        horizon: usize,
        class_thresholds: (f64, f64),
        binary_threshold: f64,
        bin_strategy: DiscretizationStrategy,
    ) -> DatasetResult<Self> {
        if horizon == 0 {
            return Err(DatasetError::Configuration(
                "target horizon must be >= 1".to_string(),
            ));
        }
        let (lo, hi) = class_thresholds;
        if !lo.is_finite() || !hi.is_finite() || lo >= hi {
            return Err(DatasetError::Configuration(format!(
                "class thresholds must be finite and ordered, got ({lo}, {hi})"
            )));
        }
        if !binary_threshold.is_finite() {
            return Err(DatasetError::Configuration(
                "binary threshold must be finite".to_string(),
            ));
        }
        Ok(Self {
            horizon,
            class_thresholds,
            binary_threshold,
            bin_strategy,
        })
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn class_thresholds(&self) -> (f64, f64) {
        self.class_thresholds
    }

    pub fn binary_threshold(&self) -> f64 {
        self.binary_threshold
    }

    pub fn bin_strategy(&self) -> DiscretizationStrategy {
        self.bin_strategy
    }
}

/// `close[t + horizon]`, forward-filled over the last rows.
pub fn target_price(close: &Series, horizon: usize) -> Series {
    close.shift(-(horizon as isize)).ffill()
}

/// `close[t + horizon] / close[t] - 1`, forward-filled over the last rows.
pub fn target_pct(close: &Series, horizon: usize) -> Series {
    close.pct_change(horizon).shift(-(horizon as isize)).ffill()
}

pub fn target_class(close: &Series, config: &TargetConfig) -> Vec<i32> {
    let (lo, hi) = config.class_thresholds;
    to_discrete_double(&target_pct(close, config.horizon).values, lo, hi)
}

pub fn target_binary(close: &Series, config: &TargetConfig) -> Vec<i32> {
    to_discrete_single(
        &target_pct(close, config.horizon).values,
        config.binary_threshold,
    )
}

/// Ordinal bin of the forward percent change. The bins are fitted over the whole history.
pub fn target_binned(
    close: &Series,
    horizon: usize,
    n_bins: usize,
    strategy: DiscretizationStrategy,
) -> DatasetResult<Vec<i32>> {
    let pct = target_pct(close, horizon);
    let binner = BinDiscretizer::fit(&pct.values, n_bins, strategy)?;
    Ok(binner.transform(&pct.values))
}

pub fn target_labels(classes: &[i32]) -> Vec<Option<&'static str>> {
    classes
        .iter()
        .map(|code| TargetClass::from_code(*code).map(TargetClass::label))
        .collect()
}

fn codes(values: Vec<i32>) -> Vec<Option<f64>> {
    values.into_iter().map(|c| Some(f64::from(c))).collect()
}

/// Target table on the OHLCV index. Class columns hold their integer codes.
pub fn make_target(ohlcv: &Ohlcv, config: &TargetConfig) -> DatasetResult<Frame> {
    let horizon = config.horizon;
    if ohlcv.len() <= horizon {
        return Err(DatasetError::insufficient(
            "targets",
            horizon + 1,
            ohlcv.len(),
        ));
    }
    let close = Series::from_dense("close", ohlcv.index(), &ohlcv.close);

    let mut frame = Frame::new(ohlcv.index().to_vec());
    frame.push("price", target_price(&close, horizon).values)?;
    frame.push("pct", target_pct(&close, horizon).values)?;
    frame.push("class", codes(target_class(&close, config)))?;
    frame.push("binary", codes(target_binary(&close, config)))?;
    frame.push(
        "bin_class",
        codes(target_binned(&close, horizon, 3, config.bin_strategy)?),
    )?;
    frame.push(
        "bin_binary",
        codes(target_binned(&close, horizon, 2, config.bin_strategy)?),
    )?;
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::bar::Bar;

    fn close(values: &[f64]) -> Series {
        let index: Vec<i64> = (0..values.len() as i64).collect();
        Series::from_dense("close", &index, values)
    }

    #[test]
    fn price_is_next_close_with_filled_tail() {
        let c = close(&[1.0, 2.0, 3.0, 4.0]);
        let price = target_price(&c, 1);
        assert_eq!(price.values, vec![Some(2.0), Some(3.0), Some(4.0), Some(4.0)]);
        let price = target_price(&c, 2);
        assert_eq!(price.values, vec![Some(3.0), Some(4.0), Some(4.0), Some(4.0)]);
    }

    #[test]
    fn class_boundaries_with_filled_tail() {
        let c = close(&[100.0, 98.0, 97.51, 97.51, 97.51 * 1.02]);
        let config = TargetConfig::default();
        let classes = target_class(&c, &config);
        assert_eq!(classes, vec![0, 1, 1, 2, 2]);
        assert_eq!(
            target_labels(&classes),
            vec![Some("SELL"), Some("HOLD"), Some("HOLD"), Some("BUY"), Some("BUY")]
        );
        assert_eq!(target_binary(&c, &config), vec![0, 0, 1, 1, 1]);
    }

    #[test]
    fn config_validation() {
        assert!(TargetConfig::new(0, (-0.01, 0.01), 0.0, DiscretizationStrategy::Quantile).is_err());
        assert!(TargetConfig::new(1, (0.01, -0.01), 0.0, DiscretizationStrategy::Quantile).is_err());
        assert!(TargetConfig::new(1, (-0.01, 0.01), f64::NAN, DiscretizationStrategy::Quantile).is_err());
        let config = TargetConfig::new(2, (-0.02, 0.03), 0.01, DiscretizationStrategy::KMeans).expect("config");
        assert_eq!(config.horizon(), 2);
    }

    #[test]
    fn target_frame_has_every_column() {
        let bars: Vec<Bar> = (0..12)
            .map(|i| {
                let c = 100.0 + ((i * 5) % 7) as f64;
                Bar {
                    timestamp: i * 86_400,
                    open: c,
                    high: c + 1.0,
                    low: c - 1.0,
                    close: c,
                    volume: 1.0,
                }
            })
            .collect();
        let ohlcv = Ohlcv::from_bars(&bars).expect("ohlcv");
        let frame = make_target(&ohlcv, &TargetConfig::default()).expect("targets");
        let names: Vec<&str> = frame.names().iter().map(String::as_str).collect();
        assert_eq!(names, TARGET_COLUMNS.to_vec());
        for (name, values) in frame.columns() {
            assert!(values.iter().all(Option::is_some), "{name}");
        }
        let bins = frame.column("bin_class").expect("bin_class");
        assert!(bins.iter().flatten().all(|b| (0.0..=2.0).contains(b)));

        let single = Ohlcv::from_bars(&bars[..1]).expect("ohlcv");
        assert!(matches!(
            make_target(&single, &TargetConfig::default()),
            Err(DatasetError::InsufficientHistory { .. })
        ));
    }
}
