use cryptoml_domain::error::DatasetError;
use cryptoml_domain::services::dataset::{build, build_facets, BuildConfig};
use cryptoml_domain::services::discretization::{to_discrete_double, MISSING_CLASS};
use cryptoml_domain::services::metadata::feature_metadata;
use cryptoml_domain::services::ohlcv::{ohlcv_from_ticks, ohlcv_resample};
use cryptoml_domain::services::targets::{make_target, TargetConfig};
use cryptoml_domain::value_objects::bar::{Bar, Tick};
use cryptoml_domain::value_objects::frame::Frame;
use cryptoml_domain::value_objects::ohlcv::Ohlcv;
use cryptoml_domain::value_objects::series::Series;
use cryptoml_domain::value_objects::timeframe::Interval;

const DAY: i64 = 86_400;

/// Ten daily bars with distinct, easy to trace values.
fn ten_rows() -> Vec<Bar> {
    (0..10)
        .map(|i| {
            let close = 10.0 + i as f64;
            let open = close - 0.5;
            Bar {
                timestamp: 1_600_000_000 - 1_600_000_000 % DAY + i * DAY,
                open,
                high: close + 1.0 + (i % 3) as f64,
                low: open - 1.0 - (i % 2) as f64,
                close,
                volume: (i + 1) as f64,
            }
        })
        .collect()
}

fn market(n: usize) -> Ohlcv {
    let bars: Vec<Bar> = (0..n)
        .map(|i| {
            let x = i as f64;
            let close = 20_000.0 + 900.0 * (x * 0.29).sin() + 35.0 * x;
            let open = close - 120.0 * (x * 0.77).cos();
            Bar {
                timestamp: i as i64 * DAY,
                open,
                high: open.max(close) + 80.0 + 30.0 * (x * 1.1).sin().abs(),
                low: open.min(close) - 70.0 - 25.0 * (x * 0.6).cos().abs(),
                close,
                volume: 5_000.0 + 800.0 * (x * 0.41).cos(),
            }
        })
        .collect();
    Ohlcv::from_bars(&bars).expect("ohlcv")
}

fn metrics_for(ohlcv: &Ohlcv, name: &str) -> Frame {
    let values: Vec<f64> = (0..ohlcv.len()).map(|i| 1_000.0 + (i * 7 % 13) as f64).collect();
    Frame::from_series(
        ohlcv.index().to_vec(),
        vec![Series::from_dense(name, ohlcv.index(), &values)],
    )
    .expect("metrics")
}

#[test]
fn three_day_rollup_on_ten_rows() {
    let bars = ten_rows();
    let ohlcv = Ohlcv::from_bars(&bars).expect("ohlcv");
    let rollup = ohlcv_resample(&ohlcv, 3, DAY).expect("resample");

    // one row per day from the first complete window to the last input day
    let expected_index: Vec<i64> = bars[3..].iter().map(|b| b.timestamp).collect();
    assert_eq!(rollup.index(), expected_index.as_slice());

    for (row, day) in (3..10).enumerate() {
        let window = &bars[day - 3..day];
        let high = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let low = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
        let volume: f64 = window.iter().map(|b| b.volume).sum();
        assert_eq!(rollup.column("open").expect("open")[row], Some(window[0].open));
        assert_eq!(rollup.column("high").expect("high")[row], Some(high));
        assert_eq!(rollup.column("low").expect("low")[row], Some(low));
        assert_eq!(rollup.column("close").expect("close")[row], Some(window[2].close));
        assert_eq!(rollup.column("volume").expect("volume")[row], Some(volume));
    }
}

#[test]
fn repeated_builds_are_identical() {
    let ohlcv = market(90);
    let metrics = metrics_for(&ohlcv, "hash_rate");
    let config = BuildConfig::default();
    let first = build(&ohlcv, Some(&metrics), &config).expect("first build");
    let second = build(&ohlcv, Some(&metrics), &config).expect("second build");
    assert_eq!(first, second);
    assert_eq!(
        feature_metadata(&first).expect("metadata"),
        feature_metadata(&second).expect("metadata")
    );
}

#[test]
fn metric_shadowing_an_indicator_aborts_the_build() {
    let ohlcv = market(60);
    let metrics = metrics_for(&ohlcv, "rsi");
    let err = build(&ohlcv, Some(&metrics), &BuildConfig::default()).expect_err("duplicate");
    assert_eq!(
        err,
        DatasetError::IntegrityViolation {
            column: "rsi".to_string()
        }
    );
}

#[test]
fn assembled_width_matches_surviving_facet_columns() {
    let ohlcv = market(75);
    let metrics = metrics_for(&ohlcv, "active_addresses");
    let config = BuildConfig::default();
    let facets = build_facets(&ohlcv, Some(&metrics), &config).expect("facets");
    let features = build(&ohlcv, Some(&metrics), &config).expect("build");
    assert_eq!(
        features.width(),
        facets.iter().map(|f| f.frame.width()).sum::<usize>()
    );
    for (name, values) in features.columns() {
        assert!(
            values.iter().any(|v| v.map_or(false, f64::is_finite)),
            "{name} has no usable value"
        );
    }
}

#[test]
fn valid_range_of_a_built_dataset_is_inside_every_window() {
    let ohlcv = market(120);
    let features = build(&ohlcv, None, &BuildConfig::default()).expect("build");
    let report = feature_metadata(&features).expect("metadata");
    let range = report.valid_range;
    assert!(!range.is_empty());

    let latest_first = report.features.iter().map(|f| f.first).max().expect("first");
    let earliest_last = report.features.iter().map(|f| f.last).min().expect("last");
    assert_eq!((range.start, range.end), (latest_first, earliest_last));
    for feature in &report.features {
        assert!(feature.first <= range.start && feature.last >= range.end, "{}", feature.name);
    }
    // warm-up of the slowest indicator and lag chain
    assert!(range.start > ohlcv.index()[10]);
    assert_eq!(range.end, *ohlcv.index().last().expect("index"));
}

#[test]
fn discretization_boundaries() {
    let pct = [Some(-0.02), Some(-0.005), Some(0.0), Some(0.02), None];
    assert_eq!(to_discrete_double(&pct, -0.01, 0.01), vec![0, 1, 1, 2, MISSING_CLASS]);
}

#[test]
fn targets_share_the_feature_index() {
    let ohlcv = market(50);
    let targets = make_target(&ohlcv, &TargetConfig::default()).expect("targets");
    assert_eq!(targets.index(), ohlcv.index());
    let price = targets.column("price").expect("price");
    assert_eq!(price[49], price[48]);
    assert_eq!(price[0], Some(ohlcv.close[1]));
}

#[test]
fn ticks_become_gap_filled_daily_bars() {
    let ticks = vec![
        Tick { timestamp: 10, price: 100.0, volume: 1.0 },
        Tick { timestamp: 3_600, price: 104.0, volume: 2.0 },
        Tick { timestamp: 7_200, price: 99.0, volume: 0.5 },
        Tick { timestamp: 2 * DAY + 5, price: 101.0, volume: 3.0 },
    ];
    let ohlcv = ohlcv_from_ticks(&ticks, &Interval::daily()).expect("ohlcv");
    assert_eq!(ohlcv.index(), &[0, DAY, 2 * DAY]);
    assert_eq!(ohlcv.open[0], 100.0);
    assert_eq!(ohlcv.high[0], 104.0);
    assert_eq!(ohlcv.low[0], 99.0);
    assert_eq!(ohlcv.close[0], 99.0);
    assert_eq!(ohlcv.volume[0], 3.5);
    assert_eq!((ohlcv.open[1], ohlcv.close[1], ohlcv.volume[1]), (99.0, 99.0, 0.0));
    assert_eq!(ohlcv.close[2], 101.0);
}
