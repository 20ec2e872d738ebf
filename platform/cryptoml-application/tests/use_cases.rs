use cryptoml_application::building::build_dataset;
use cryptoml_application::config::{Config, DatasetConfig, PathsConfig, TargetsConfig};
use cryptoml_application::selection::{
    apply_feature_selection, dataset_training_window, training_window,
};
use cryptoml_application::validation::validate_inputs;
use cryptoml_application::ArtifactPaths;
use cryptoml_domain::repositories::artifacts::{ArtifactReader, ArtifactWriter};
use cryptoml_domain::repositories::market_data::{
    MarketDataRepository, MetricsRepository, OhlcvQuery,
};
use cryptoml_domain::services::metadata::FeatureMetadata;
use cryptoml_domain::services::ohlcv::{data_quality_from_bars, DataQualityReport};
use cryptoml_domain::value_objects::bar::{Bar, Tick};
use cryptoml_domain::value_objects::dataset_info::DatasetInfo;
use cryptoml_domain::value_objects::frame::Frame;
use cryptoml_domain::value_objects::series::Series;
use cryptoml_domain::value_objects::timeframe::parse_timestamp;
use cryptoml_infrastructure::artifacts::{FilesystemArtifactReader, FilesystemArtifactWriter};
use cryptoml_infrastructure::market_data::{CsvMarketDataRepository, CsvMetricsRepository};
use cryptoml_infrastructure::reporting::read_support_csv;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const DAY: i64 = 86_400;

fn bars(n: usize) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let x = i as f64;
            let close = 9_000.0 + 400.0 * (x * 0.23).sin() + 12.0 * x;
            let open = close - 45.0 * (x * 0.61).cos();
            Bar {
                timestamp: 1_577_836_800 + i as i64 * DAY,
                open,
                high: open.max(close) + 30.0 + 10.0 * (x * 0.9).sin().abs(),
                low: open.min(close) - 25.0 - 8.0 * (x * 0.5).cos().abs(),
                close,
                volume: 2_000.0 + 300.0 * (x * 0.37).cos(),
            }
        })
        .collect()
}

#[derive(Default)]
struct FakeMarketDataRepo {
    bars: Vec<Bar>,
    report: DataQualityReport,
    ticks: Vec<Tick>,
}

impl FakeMarketDataRepo {
    fn with_bars(bars: Vec<Bar>) -> Self {
        let report = data_quality_from_bars(&bars, Some(DAY));
        Self {
            bars,
            report,
            ticks: Vec::new(),
        }
    }
}

impl MarketDataRepository for FakeMarketDataRepo {
    fn load_ohlcv(&self, _query: &OhlcvQuery) -> Result<(Vec<Bar>, DataQualityReport), String> {
        Ok((self.bars.clone(), self.report.clone()))
    }

    fn load_ticks(&self, _query: &OhlcvQuery) -> Result<Vec<Tick>, String> {
        Ok(self.ticks.clone())
    }
}

#[derive(Default)]
struct FakeMetricsRepo {
    frame: Option<Frame>,
}

impl MetricsRepository for FakeMetricsRepo {
    fn load_metrics(&self, path: &Path) -> Result<Frame, String> {
        self.frame
            .clone()
            .ok_or_else(|| format!("no metrics at {}", path.display()))
    }
}

#[derive(Default)]
struct RecordingWriter {
    ensured_dirs: RefCell<Vec<PathBuf>>,
    frames: RefCell<BTreeMap<PathBuf, (String, Frame)>>,
    metadata: RefCell<Option<Vec<FeatureMetadata>>>,
    infos: RefCell<Vec<(PathBuf, DatasetInfo)>>,
    backups: RefCell<Vec<PathBuf>>,
}

impl ArtifactWriter for RecordingWriter {
    fn ensure_dir(&self, path: &Path) -> Result<(), String> {
        self.ensured_dirs.borrow_mut().push(path.to_path_buf());
        Ok(())
    }

    fn write_frame_csv(&self, path: &Path, frame: &Frame, index_label: &str) -> Result<(), String> {
        self.frames
            .borrow_mut()
            .insert(path.to_path_buf(), (index_label.to_string(), frame.clone()));
        Ok(())
    }

    fn write_metadata_csv(&self, _path: &Path, features: &[FeatureMetadata]) -> Result<(), String> {
        *self.metadata.borrow_mut() = Some(features.to_vec());
        Ok(())
    }

    fn write_info_json(&self, path: &Path, info: &DatasetInfo) -> Result<(), String> {
        self.infos
            .borrow_mut()
            .push((path.to_path_buf(), info.clone()));
        Ok(())
    }

    fn backup(&self, path: &Path) -> Result<PathBuf, String> {
        let backup = PathBuf::from(format!("{}.bak", path.display()));
        self.backups.borrow_mut().push(backup.clone());
        Ok(backup)
    }
}

struct FakeReader {
    info: DatasetInfo,
    index: Vec<i64>,
}

impl ArtifactReader for FakeReader {
    fn read_info_json(&self, _path: &Path) -> Result<DatasetInfo, String> {
        Ok(self.info.clone())
    }

    fn read_frame_index(&self, _path: &Path) -> Result<Vec<i64>, String> {
        Ok(self.index.clone())
    }

    fn exists(&self, _path: &Path) -> bool {
        true
    }
}

fn minimal_config() -> Config {
    Config {
        dataset: DatasetConfig {
            symbol: "btc".to_string(),
            currency: "usd".to_string(),
            interval: "1d".to_string(),
        },
        paths: PathsConfig {
            ticks_csv: None,
            ohlcv_csv: Some("data/btc.csv".to_string()),
            metrics_csv: None,
            out_dir: "out".to_string(),
        },
        features: None,
        targets: None,
        selection: None,
    }
}

fn unique_tmp_dir(prefix: &str) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let dir = std::env::temp_dir().join(format!("{prefix}_{}_{}", std::process::id(), now));
    fs::create_dir_all(&dir).expect("create tmp dir");
    dir
}

#[test]
fn build_dataset_writes_every_artifact() {
    let config = minimal_config();
    let market = FakeMarketDataRepo::with_bars(bars(120));
    let writer = RecordingWriter::default();

    let outcome =
        build_dataset(&config, &market, &FakeMetricsRepo::default(), &writer).expect("build");
    let paths = ArtifactPaths::new(Path::new("out"), "BTC", "USD");
    assert_eq!(outcome.paths, paths);
    assert_eq!(writer.ensured_dirs.borrow().as_slice(), &[PathBuf::from("out")]);

    let frames = writer.frames.borrow();
    let (label, features) = frames.get(&paths.features).expect("features written");
    assert_eq!(label, "timestamp");
    let (_, targets) = frames.get(&paths.targets).expect("targets written");
    assert_eq!(targets.index(), features.index());

    let metadata = writer.metadata.borrow();
    let metadata = metadata.as_ref().expect("metadata written");
    assert_eq!(metadata.len(), features.width());

    let infos = writer.infos.borrow();
    let (info_path, info) = infos.last().expect("info written");
    assert_eq!(info_path, &paths.info);
    assert_eq!(info, &outcome.info);
    assert_eq!((info.symbol.as_str(), info.currency.as_str()), ("BTC", "USD"));
    assert_eq!(info.records, 120);
    assert_eq!(info.features_count, features.width());
    assert_eq!(info.features.len(), features.width());
    assert!(info.features.values().all(|enabled| *enabled));
    assert_eq!(info.targets.len(), 6);
    assert_eq!(info.targets.get("class"), Some(&true));
    assert_eq!(info.targets.get("pct"), Some(&false));
    assert_eq!(info.config_sha256.len(), 12);
    assert_eq!(info.index_min, "2020-01-01T00:00:00Z");

    let valid_min = parse_timestamp(&info.valid_index_min).expect("valid min");
    let valid_max = parse_timestamp(&info.valid_index_max).expect("valid max");
    assert_eq!((valid_min, valid_max), (outcome.valid_range.start, outcome.valid_range.end));
    assert!(valid_min > features.index()[0]);
}

#[test]
fn build_dataset_joins_auxiliary_metrics() {
    let mut config = minimal_config();
    config.paths.metrics_csv = Some("data/metrics.csv".to_string());
    config.targets = Some(TargetsConfig {
        enabled: Some(vec!["class".to_string(), "bin_binary".to_string()]),
        ..TargetsConfig::default()
    });
    let history = bars(100);
    let index: Vec<i64> = history.iter().map(|b| b.timestamp).collect();
    let values: Vec<f64> = (0..index.len()).map(|i| 500.0 + (i % 9) as f64).collect();
    let metrics = FakeMetricsRepo {
        frame: Some(
            Frame::from_series(index.clone(), vec![Series::from_dense("hash_rate", &index, &values)])
                .expect("metrics"),
        ),
    };
    let writer = RecordingWriter::default();

    let outcome = build_dataset(
        &config,
        &FakeMarketDataRepo::with_bars(history),
        &metrics,
        &writer,
    )
    .expect("build");
    assert_eq!(outcome.info.features.get("hash_rate"), Some(&true));
    assert_eq!(outcome.info.features.get("hash_rate_pct"), Some(&true));
    assert_eq!(outcome.info.targets.get("bin_binary"), Some(&true));
}

#[test]
fn build_dataset_rejects_metrics_shadowing_a_feature() {
    let mut config = minimal_config();
    config.paths.metrics_csv = Some("data/metrics.csv".to_string());
    let history = bars(80);
    let index: Vec<i64> = history.iter().map(|b| b.timestamp).collect();
    let values = vec![1.0; index.len()];
    let metrics = FakeMetricsRepo {
        frame: Some(
            Frame::from_series(index.clone(), vec![Series::from_dense("volume", &index, &values)])
                .expect("metrics"),
        ),
    };
    let writer = RecordingWriter::default();

    let err = build_dataset(&config, &FakeMarketDataRepo::with_bars(history), &metrics, &writer)
        .expect_err("duplicate column");
    assert!(err.contains("volume"), "{err}");
    assert!(writer.infos.borrow().is_empty());
}

#[test]
fn build_dataset_aggregates_ticks() {
    let mut config = minimal_config();
    config.paths.ohlcv_csv = None;
    config.paths.ticks_csv = Some("data/ticks.csv".to_string());
    let ticks: Vec<Tick> = (0..120 * 4)
        .map(|i| {
            let x = i as f64;
            Tick {
                timestamp: 1_577_836_800 + i as i64 * DAY / 4,
                price: 7_000.0 + 150.0 * (x * 0.07).sin() + 2.0 * x,
                volume: 1.0 + (i % 5) as f64,
            }
        })
        .collect();
    let market = FakeMarketDataRepo {
        ticks,
        ..FakeMarketDataRepo::default()
    };
    let writer = RecordingWriter::default();

    let outcome =
        build_dataset(&config, &market, &FakeMetricsRepo::default(), &writer).expect("build");
    assert_eq!(outcome.info.records, 120);
    assert_eq!(outcome.quality.rows, 120);
    assert_eq!(outcome.quality.gaps, 0);
}

#[test]
fn build_dataset_requires_a_single_source() {
    let mut config = minimal_config();
    config.paths.ticks_csv = Some("data/ticks.csv".to_string());
    let err = build_dataset(
        &config,
        &FakeMarketDataRepo::with_bars(bars(60)),
        &FakeMetricsRepo::default(),
        &RecordingWriter::default(),
    )
    .expect_err("two sources");
    assert!(err.contains("only one"), "{err}");
}

#[test]
fn validate_reports_quality_and_fails_strict_on_duplicates() {
    let config = minimal_config();
    let mut history = bars(20);
    history.push(history[19]);
    let report = data_quality_from_bars(&history, Some(DAY));
    assert_eq!(report.duplicates, 1);
    let market = FakeMarketDataRepo {
        bars: history,
        report,
        ticks: Vec::new(),
    };

    let json = validate_inputs(&config, false, &market, &FakeMetricsRepo::default())
        .expect("lenient validation");
    assert_eq!(json["ohlcv"]["duplicates"], 1);
    assert_eq!(json["source"]["kind"], "ohlcv");
    assert_eq!(json["strict"], false);

    let err = validate_inputs(&config, true, &market, &FakeMetricsRepo::default())
        .expect_err("strict validation");
    assert!(err.contains("strict validation failed"), "{err}");
}

fn selection_info() -> DatasetInfo {
    DatasetInfo {
        symbol: "BTC".to_string(),
        currency: "USD".to_string(),
        interval: "1d".to_string(),
        records: 10,
        features_count: 3,
        index_min: "2020-01-01T00:00:00Z".to_string(),
        index_max: "2020-01-10T00:00:00Z".to_string(),
        valid_index_min: "2020-01-03T00:00:00Z".to_string(),
        valid_index_max: "2020-01-10T00:00:00Z".to_string(),
        config_sha256: "0123456789ab".to_string(),
        targets: BTreeMap::from([("class".to_string(), true)]),
        features: ["close", "rsi", "adx"]
            .iter()
            .map(|name| (name.to_string(), true))
            .collect(),
    }
}

#[test]
fn feature_selection_flips_flags_after_backup() {
    let reader = FakeReader {
        info: selection_info(),
        index: Vec::new(),
    };
    let writer = RecordingWriter::default();
    let support = BTreeMap::from([("rsi".to_string(), false), ("close".to_string(), true)]);
    let info_path = Path::new("out/dataset-BTCUSD.info.json");

    let outcome = apply_feature_selection(info_path, &support, &reader, &writer).expect("select");
    assert_eq!(outcome.backup_path, PathBuf::from("out/dataset-BTCUSD.info.json.bak"));
    assert_eq!((outcome.enabled, outcome.disabled, outcome.changed), (2, 1, 1));
    assert_eq!(writer.backups.borrow().len(), 1);

    let infos = writer.infos.borrow();
    let (_, written) = infos.last().expect("info written");
    assert_eq!(written.features.get("rsi"), Some(&false));
    assert_eq!(written.features.get("adx"), Some(&true));
    assert_eq!(written.targets, selection_info().targets);
}

#[test]
fn feature_selection_rejects_unknown_features() {
    let reader = FakeReader {
        info: selection_info(),
        index: Vec::new(),
    };
    let writer = RecordingWriter::default();
    let support = BTreeMap::from([("macd_signal".to_string(), true)]);

    let err = apply_feature_selection(Path::new("info.json"), &support, &reader, &writer)
        .expect_err("unknown feature");
    assert!(err.contains("macd_signal"), "{err}");
    assert!(writer.backups.borrow().is_empty());
    assert!(writer.infos.borrow().is_empty());
}

#[test]
fn training_window_uses_the_valid_rows() {
    let index: Vec<i64> = (0..10).map(|i| 1_577_836_800 + i * DAY).collect();
    let window = training_window(&selection_info(), &index, 0.5).expect("window");
    assert_eq!((window.first, window.last), (2, 9));
    assert_eq!(window.train_rows, 3);
    assert_eq!(window.train_start, index[2]);
    assert_eq!(window.train_end, index[4]);

    let reader = FakeReader {
        info: selection_info(),
        index,
    };
    let paths = ArtifactPaths::new(Path::new("out"), "BTC", "USD");
    assert_eq!(
        dataset_training_window(&paths, 0.5, &reader).expect("window"),
        window
    );
}

#[test]
fn filesystem_build_then_select_round_trip() {
    let dir = unique_tmp_dir("cryptoml_use_case");
    let ohlcv_path = dir.join("btc.csv");
    let mut csv_data = String::from("timestamp,open,high,low,close,volume\n");
    for bar in bars(120) {
        csv_data.push_str(&format!(
            "{},{},{},{},{},{}\n",
            bar.timestamp, bar.open, bar.high, bar.low, bar.close, bar.volume
        ));
    }
    fs::write(&ohlcv_path, csv_data).expect("write ohlcv");

    let mut config = minimal_config();
    config.paths.ohlcv_csv = Some(ohlcv_path.display().to_string());
    config.paths.out_dir = dir.join("out").display().to_string();

    let writer = FilesystemArtifactWriter::new();
    let reader = FilesystemArtifactReader::new();
    let outcome = build_dataset(
        &config,
        &CsvMarketDataRepository::new(),
        &CsvMetricsRepository::new(),
        &writer,
    )
    .expect("build");
    for path in [
        &outcome.paths.features,
        &outcome.paths.metadata,
        &outcome.paths.targets,
        &outcome.paths.info,
    ] {
        assert!(path.exists(), "{} missing", path.display());
    }
    let index = reader
        .read_frame_index(&outcome.paths.features)
        .expect("index");
    assert_eq!(index.len(), 120);

    let support_path = dir.join("support.csv");
    fs::write(&support_path, "feature,selected\nclose,false\nvolume,true\n").expect("support");
    let support = read_support_csv(&support_path).expect("read support");
    let selection = apply_feature_selection(&outcome.paths.info, &support, &reader, &writer)
        .expect("select");
    assert!(selection.backup_path.exists());
    let info = reader.read_info_json(&outcome.paths.info).expect("info");
    assert_eq!(info.features.get("close"), Some(&false));
    assert_eq!(selection.disabled, 1);

    let window = dataset_training_window(&outcome.paths, 0.7, &reader).expect("window");
    assert!(window.first < window.last);
    assert_eq!(window.train_start, outcome.valid_range.start);
    let _ = fs::remove_dir_all(&dir);
}
