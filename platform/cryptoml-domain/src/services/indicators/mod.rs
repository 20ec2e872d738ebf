//! Static technical-indicator catalog.
//!
//! Every entry names its parameters, how many leading rows it leaves missing (`lookback`), and
//! the minimum number of rows it needs to be computed at all (`min_history`). Entries whose
//! minimum exceeds the available history are skipped with a warning instead of failing the
//! build.

pub mod directional;
pub mod momentum;
pub mod volume;

use crate::error::DatasetResult;
use crate::value_objects::frame::Frame;
use crate::value_objects::ohlcv::Ohlcv;

pub type IndicatorOutput = Vec<Vec<Option<f64>>>;
pub type IndicatorFn = fn(&Ohlcv, &[usize]) -> IndicatorOutput;

#[derive(Clone, Copy)]
pub struct IndicatorSpec {
    pub id: &'static str,
    pub params: &'static [usize],
    pub lookback: usize,
    pub min_history: usize,
    /// Column names, one per output vector of `compute`.
    pub outputs: &'static [&'static str],
    pub compute: IndicatorFn,
}

impl IndicatorSpec {
    pub fn evaluate(&self, ohlcv: &Ohlcv) -> IndicatorOutput {
        (self.compute)(ohlcv, self.params)
    }
}

const fn spec(
    id: &'static str,
    params: &'static [usize],
    lookback: usize,
    outputs: &'static [&'static str],
    compute: IndicatorFn,
) -> IndicatorSpec {
    IndicatorSpec {
        id,
        params,
        lookback,
        min_history: lookback + 1,
        outputs,
        compute,
    }
}

static CATALOG: &[IndicatorSpec] = &[
    spec("adx", &[14], 27, &["adx"], |o, p| {
        vec![directional::adx(&o.high, &o.low, &o.close, p[0])]
    }),
    spec("adxr", &[14], 40, &["adxr"], |o, p| {
        vec![directional::adxr(&o.high, &o.low, &o.close, p[0])]
    }),
    spec("apo", &[12, 26], 25, &["apo"], |o, p| {
        vec![momentum::apo(&o.close, p[0], p[1])]
    }),
    spec("aroon", &[14], 14, &["aroon_down", "aroon_up"], |o, p| {
        let (down, up) = momentum::aroon(&o.high, &o.low, p[0]);
        vec![down, up]
    }),
    spec("aroonosc", &[14], 14, &["aroonosc"], |o, p| {
        vec![momentum::aroonosc(&o.high, &o.low, p[0])]
    }),
    spec("bop", &[], 0, &["bop"], |o, _| {
        vec![momentum::bop(&o.open, &o.high, &o.low, &o.close)]
    }),
    spec("cmo", &[14], 14, &["cmo"], |o, p| {
        vec![momentum::cmo(&o.close, p[0])]
    }),
    spec("cci", &[14], 13, &["cci"], |o, p| {
        vec![momentum::cci(&o.high, &o.low, &o.close, p[0])]
    }),
    spec("dx", &[14], 14, &["dx"], |o, p| {
        vec![directional::dx(&o.high, &o.low, &o.close, p[0])]
    }),
    spec(
        "macd",
        &[12, 26, 9],
        33,
        &["macd", "macdsignal", "macdhist"],
        |o, p| {
            let (line, signal, hist) = momentum::macd(&o.close, p[0], p[1], p[2]);
            vec![line, signal, hist]
        },
    ),
    spec("mfi", &[14], 14, &["mfi"], |o, p| {
        vec![volume::mfi(&o.high, &o.low, &o.close, &o.volume, p[0])]
    }),
    spec("minus_di", &[14], 14, &["minus_di"], |o, p| {
        vec![directional::minus_di(&o.high, &o.low, &o.close, p[0])]
    }),
    spec("minus_dm", &[14], 13, &["minus_dm"], |o, p| {
        vec![directional::minus_dm(&o.high, &o.low, p[0])]
    }),
    spec("mom", &[10], 10, &["mom"], |o, p| {
        vec![momentum::mom(&o.close, p[0])]
    }),
    spec("plus_di", &[14], 14, &["plus_di"], |o, p| {
        vec![directional::plus_di(&o.high, &o.low, &o.close, p[0])]
    }),
    spec("plus_dm", &[14], 13, &["plus_dm"], |o, p| {
        vec![directional::plus_dm(&o.high, &o.low, p[0])]
    }),
    spec("ppo", &[12, 26], 25, &["ppo"], |o, p| {
        vec![momentum::ppo(&o.close, p[0], p[1])]
    }),
    spec("roc", &[10], 10, &["roc"], |o, p| {
        vec![momentum::roc(&o.close, p[0])]
    }),
    spec("rocp", &[10], 10, &["rocp"], |o, p| {
        vec![momentum::rocp(&o.close, p[0])]
    }),
    spec("rocr", &[10], 10, &["rocr"], |o, p| {
        vec![momentum::rocr(&o.close, p[0])]
    }),
    spec("rocr100", &[10], 10, &["rocr100"], |o, p| {
        vec![momentum::rocr100(&o.close, p[0])]
    }),
    spec("rsi", &[14], 14, &["rsi"], |o, p| {
        vec![momentum::rsi(&o.close, p[0])]
    }),
    spec(
        "stoch",
        &[5, 3, 3],
        8,
        &["stoch_slowk", "stoch_slowd"],
        |o, p| {
            let (k, d) = momentum::stoch(&o.high, &o.low, &o.close, p[0], p[1], p[2]);
            vec![k, d]
        },
    ),
    spec(
        "stochf",
        &[5, 3],
        6,
        &["stochf_fastk", "stochf_fastd"],
        |o, p| {
            let (k, d) = momentum::stochf(&o.high, &o.low, &o.close, p[0], p[1]);
            vec![k, d]
        },
    ),
    spec(
        "stochrsi",
        &[14, 5, 3],
        20,
        &["stochrsi_fastk", "stochrsi_fastd"],
        |o, p| {
            let (k, d) = momentum::stochrsi(&o.close, p[0], p[1], p[2]);
            vec![k, d]
        },
    ),
    spec("trix", &[30], 88, &["trix"], |o, p| {
        vec![momentum::trix(&o.close, p[0])]
    }),
    spec("ultosc", &[7, 14, 28], 28, &["ultosc"], |o, p| {
        vec![momentum::ultosc(&o.high, &o.low, &o.close, p[0], p[1], p[2])]
    }),
    spec("willr", &[14], 13, &["willr"], |o, p| {
        vec![momentum::willr(&o.high, &o.low, &o.close, p[0])]
    }),
    spec("atr", &[14], 14, &["atr"], |o, p| {
        vec![directional::atr(&o.high, &o.low, &o.close, p[0])]
    }),
    spec("natr", &[14], 14, &["natr"], |o, p| {
        vec![directional::natr(&o.high, &o.low, &o.close, p[0])]
    }),
    spec("trange", &[], 1, &["trange"], |o, _| {
        vec![directional::true_range(&o.high, &o.low, &o.close)]
    }),
    spec("ad", &[], 0, &["ad"], |o, _| {
        vec![volume::ad(&o.high, &o.low, &o.close, &o.volume)]
    }),
    spec("adosc", &[3, 10], 9, &["adosc"], |o, p| {
        vec![volume::adosc(&o.high, &o.low, &o.close, &o.volume, p[0], p[1])]
    }),
    spec("obv", &[], 0, &["obv"], |o, _| {
        vec![volume::obv(&o.close, &o.volume)]
    }),
    spec("fi", &[], 1, &["fi"], |o, _| {
        vec![volume::force_index(&o.close, &o.volume)]
    }),
    IndicatorSpec {
        min_history: 40,
        ..spec("tsi", &[25, 13], 37, &["tsi"], |o, p| {
            vec![momentum::tsi(&o.close, p[0], p[1])]
        })
    },
    spec("pvo", &[12, 26], 25, &["pvo_12_26"], |o, p| {
        vec![volume::pvo(&o.volume, p[0], p[1])]
    }),
    spec("adi", &[], 0, &["adi"], |o, _| {
        vec![volume::adi(&o.high, &o.low, &o.close, &o.volume)]
    }),
    spec("rsma", &[3, 7], 6, &["rsma_3_7"], |o, p| {
        vec![momentum::relative_sma(&o.close, p[0], p[1])]
    }),
    spec("rema", &[3, 7], 6, &["rema_3_7"], |o, p| {
        vec![momentum::relative_ema(&o.close, p[0], p[1])]
    }),
    spec("rsma", &[12, 26], 25, &["rsma_12_26"], |o, p| {
        vec![momentum::relative_sma(&o.close, p[0], p[1])]
    }),
    spec("rema", &[12, 26], 25, &["rema_12_26"], |o, p| {
        vec![momentum::relative_ema(&o.close, p[0], p[1])]
    }),
    spec("rsma", &[24, 50], 49, &["rsma_24_50"], |o, p| {
        vec![momentum::relative_sma(&o.close, p[0], p[1])]
    }),
    spec("rema", &[24, 50], 49, &["rema_24_50"], |o, p| {
        vec![momentum::relative_ema(&o.close, p[0], p[1])]
    }),
    spec("bbands_pctb", &[20], 19, &["bbands_pctb_20"], |o, p| {
        vec![momentum::bbands_pctb(&o.close, p[0], 2.0)]
    }),
];

pub fn catalog() -> &'static [IndicatorSpec] {
    CATALOG
}

/// Evaluates the whole catalog into one frame keyed by the OHLCV index.
pub fn make_ohlcv_ta(ohlcv: &Ohlcv) -> DatasetResult<Frame> {
    let records = ohlcv.len();
    let mut frame = Frame::new(ohlcv.index().to_vec());
    for spec in CATALOG {
        if records < spec.min_history {
            tracing::warn!(
                indicator = spec.id,
                required = spec.min_history,
                records,
                "not enough records, skipping indicator"
            );
            continue;
        }
        for (name, values) in spec.outputs.iter().zip(spec.evaluate(ohlcv)) {
            frame.push(*name, values)?;
        }
    }
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::{catalog, make_ohlcv_ta};
    use crate::value_objects::bar::Bar;
    use crate::value_objects::ohlcv::Ohlcv;
    use std::collections::HashSet;

    fn wavy(n: usize) -> Ohlcv {
        let bars: Vec<Bar> = (0..n)
            .map(|i| {
                let x = i as f64;
                let close = 100.0 + 10.0 * (x * 0.37).sin() + 0.1 * x;
                let open = close - 1.5 * (x * 0.91).cos();
                Bar {
                    timestamp: i as i64 * 86_400,
                    open,
                    high: open.max(close) + 1.0 + 0.5 * (x * 1.3).sin().abs(),
                    low: open.min(close) - 1.0 - 0.5 * (x * 0.7).cos().abs(),
                    close,
                    volume: 1_000.0 + 200.0 * (x * 0.53).sin(),
                }
            })
            .collect();
        Ohlcv::from_bars(&bars).expect("ohlcv")
    }

    #[test]
    fn output_names_are_unique() {
        let mut seen = HashSet::new();
        for spec in catalog() {
            for name in spec.outputs {
                assert!(seen.insert(*name), "duplicate indicator output {name}");
            }
        }
    }

    #[test]
    fn every_output_starts_at_its_declared_lookback() {
        let ohlcv = wavy(160);
        for spec in catalog() {
            let outputs = spec.evaluate(&ohlcv);
            assert_eq!(outputs.len(), spec.outputs.len(), "{}", spec.id);
            for (name, values) in spec.outputs.iter().zip(&outputs) {
                assert_eq!(values.len(), ohlcv.len(), "{name}");
                let first = values.iter().position(Option::is_some);
                assert_eq!(first, Some(spec.lookback), "{name}");
            }
        }
    }

    #[test]
    fn short_history_skips_entries_instead_of_failing() {
        let frame = make_ohlcv_ta(&wavy(39)).expect("ta");
        assert!(frame.column("tsi").is_none());
        assert!(frame.column("trix").is_none());
        assert!(frame.column("rsi").is_some());

        let frame = make_ohlcv_ta(&wavy(120)).expect("ta");
        assert!(frame.column("tsi").is_some());
        assert!(frame.column("trix").is_some());
    }
}
