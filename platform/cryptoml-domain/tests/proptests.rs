use cryptoml_domain::services::discretization::{BinDiscretizer, DiscretizationStrategy};
use cryptoml_domain::services::lagging::{make_lagged, make_ohlcv_pct};
use cryptoml_domain::services::metadata::feature_metadata;
use cryptoml_domain::services::targets::{target_price, target_pct};
use cryptoml_domain::value_objects::bar::Bar;
use cryptoml_domain::value_objects::frame::Frame;
use cryptoml_domain::value_objects::ohlcv::Ohlcv;
use cryptoml_domain::value_objects::series::Series;
use proptest::prelude::*;

const DAY: i64 = 86_400;

fn index(n: usize) -> Vec<i64> {
    (0..n as i64).map(|i| i * DAY).collect()
}

fn ohlcv(closes: &[f64]) -> Ohlcv {
    let bars: Vec<Bar> = closes
        .iter()
        .copied()
        .enumerate()
        .map(|(i, close)| Bar {
            timestamp: i as i64 * DAY,
            open: close,
            high: close * 1.01,
            low: close * 0.99,
            close,
            volume: 10.0 + i as f64,
        })
        .collect();
    Ohlcv::from_bars(&bars).expect("ohlcv")
}

/// Columns of `n` rows with `lead` missing rows in front and `trail` missing rows at the end.
fn windowed(n: usize, windows: &[(usize, usize)]) -> Frame {
    let mut frame = Frame::new(index(n));
    for (col, (lead, trail)) in windows.iter().enumerate() {
        let values = (0..n)
            .map(|t| (t >= *lead && t + *trail < n).then_some(t as f64 + col as f64))
            .collect();
        frame.push(format!("f{col}"), values).expect("push");
    }
    frame
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn lagged_values_come_from_k_rows_earlier(
        values in prop::collection::vec(-1_000.0f64..1_000.0, 1..60),
        k in 1usize..12,
    ) {
        let frame = Frame::from_series(
            index(values.len()),
            vec![Series::from_dense("x", &index(values.len()), &values)],
        ).expect("frame");
        let lagged = make_lagged(&frame, k);
        let column = lagged.column(&format!("x_lag{k}")).expect("lagged column");
        prop_assert_eq!(lagged.index(), frame.index());
        for (t, value) in column.iter().enumerate() {
            if t < k {
                prop_assert!(value.is_none());
            } else {
                prop_assert_eq!(*value, Some(values[t - k]));
            }
        }
    }

    #[test]
    fn close_pct_is_the_one_period_return(closes in prop::collection::vec(0.01f64..100_000.0, 2..80)) {
        let pct = make_ohlcv_pct(&ohlcv(&closes)).expect("pct");
        let column = pct.column("close_pct").expect("close_pct");
        prop_assert!(column[0].is_none());
        for t in 1..closes.len() {
            let expected = closes[t] / closes[t - 1] - 1.0;
            let got = column[t].expect("pct value");
            prop_assert!((got - expected).abs() <= 1e-12 * expected.abs().max(1.0));
        }
    }

    #[test]
    fn valid_range_is_the_intersection_of_windows(
        n in 4usize..50,
        raw in prop::collection::vec((0usize..50, 0usize..50), 1..8),
    ) {
        // keep at least one value per column
        let windows: Vec<(usize, usize)> = raw
            .iter()
            .map(|(lead, trail)| {
                let lead = lead % n;
                (lead, trail % (n - lead))
            })
            .collect();
        let frame = windowed(n, &windows);
        let report = feature_metadata(&frame).expect("metadata");

        let start = windows.iter().map(|(lead, _)| *lead as i64 * DAY).max().expect("start");
        let end = windows.iter().map(|(_, trail)| (n - 1 - trail) as i64 * DAY).min().expect("end");
        prop_assert_eq!(report.valid_range.start, start);
        prop_assert_eq!(report.valid_range.end, end);
        for feature in &report.features {
            prop_assert!(feature.first <= report.valid_range.start);
            prop_assert!(feature.last >= report.valid_range.end);
            prop_assert_eq!(feature.count, n);
        }
    }

    #[test]
    fn target_price_is_the_next_close(closes in prop::collection::vec(0.01f64..100_000.0, 2..80)) {
        let n = closes.len();
        let close = Series::from_dense("close", &index(n), &closes);
        let price = target_price(&close, 1);
        for t in 0..n - 1 {
            prop_assert_eq!(price.values[t], Some(closes[t + 1]));
        }
        prop_assert_eq!(price.values[n - 1], price.values[n - 2]);

        let pct = target_pct(&close, 1);
        prop_assert!(pct.values.iter().all(Option::is_some));
    }

    #[test]
    fn quantile_bins_are_monotone(values in prop::collection::vec(-1.0f64..1.0, 3..120)) {
        let present: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
        let binner = BinDiscretizer::fit(&present, 3, DiscretizationStrategy::Quantile).expect("fit");
        let codes = binner.transform(&present);
        let mut pairs: Vec<(f64, i32)> = values.iter().copied().zip(codes).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        for w in pairs.windows(2) {
            prop_assert!(w[0].1 <= w[1].1);
        }
        prop_assert!(pairs.iter().all(|(_, code)| (0..binner.n_bins() as i32).contains(code)));
    }
}
