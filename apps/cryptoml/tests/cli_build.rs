use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

const DAY: i64 = 86_400;

fn unique_tmp_dir(name: &str) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let dir = std::env::temp_dir().join(format!(
        "cryptoml_cli_{name}_{}_{}",
        std::process::id(),
        now
    ));
    fs::create_dir_all(&dir).expect("create tmp dir");
    dir
}

fn write_ohlcv_csv(dir: &Path, rows: usize) -> PathBuf {
    let mut csv_data = String::from("timestamp,open,high,low,close,volume\n");
    for i in 0..rows {
        let x = i as f64;
        let close = 9_000.0 + 400.0 * (x * 0.23).sin() + 12.0 * x;
        let open = close - 45.0 * (x * 0.61).cos();
        let high = open.max(close) + 30.0 + 10.0 * (x * 0.9).sin().abs();
        let low = open.min(close) - 25.0 - 8.0 * (x * 0.5).cos().abs();
        let volume = 2_000.0 + 300.0 * (x * 0.37).cos();
        csv_data.push_str(&format!(
            "{},{},{},{},{},{}\n",
            1_577_836_800 + i as i64 * DAY,
            open,
            high,
            low,
            close,
            volume
        ));
    }
    let path = dir.join("btc_usd_1d.csv");
    fs::write(&path, csv_data).expect("write ohlcv csv");
    path
}

fn write_config(dir: &Path, ohlcv_csv: &Path) -> PathBuf {
    let config = format!(
        r#"[dataset]
symbol = "BTC"
currency = "USD"
interval = "1d"

[paths]
ohlcv_csv = "{}"
out_dir = "{}"

[targets]
enabled = ["class", "binary"]
"#,
        ohlcv_csv.display(),
        dir.join("out").display()
    );
    let path = dir.join("config.toml");
    fs::write(&path, config).expect("write config");
    path
}

fn run_cli(args: &[&str]) {
    let status = Command::new(env!("CARGO_BIN_EXE_cryptoml"))
        .args(args)
        .env("CRYPTOML_LOG", "warn")
        .status()
        .expect("run cli");
    assert!(status.success(), "cryptoml {:?} failed: {}", args, status);
}

#[test]
fn build_writes_the_four_artifacts() {
    let dir = unique_tmp_dir("build");
    let ohlcv_csv = write_ohlcv_csv(&dir, 120);
    let config = write_config(&dir, &ohlcv_csv);
    let config_arg = config.display().to_string();

    run_cli(&["build", "--config", &config_arg]);

    let out = dir.join("out");
    for name in [
        "dataset-BTCUSD.csv",
        "dataset-BTCUSD.meta.csv",
        "dataset-BTCUSD.target.csv",
        "dataset-BTCUSD.info.json",
    ] {
        assert!(out.join(name).exists(), "{name} missing");
    }

    let info: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(out.join("dataset-BTCUSD.info.json")).expect("read info"),
    )
    .expect("parse info");
    assert_eq!(info["records"], 120);
    assert_eq!(info["symbol"], "BTC");
    assert_eq!(info["targets"]["binary"], true);
    assert_eq!(info["targets"]["price"], false);
    assert_eq!(info["features"]["talib_patterns_mean"], true);

    let features = fs::read_to_string(out.join("dataset-BTCUSD.csv")).expect("read features");
    assert!(features.starts_with("timestamp,"));
    assert_eq!(features.lines().count(), 121);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn validate_strict_writes_the_report() {
    let dir = unique_tmp_dir("validate");
    let ohlcv_csv = write_ohlcv_csv(&dir, 30);
    let config = write_config(&dir, &ohlcv_csv);
    let config_arg = config.display().to_string();
    let report_path = dir.join("report.json");
    let report_arg = report_path.display().to_string();

    run_cli(&["validate", "--config", &config_arg, "--strict", "--out", &report_arg]);

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).expect("read report"))
            .expect("parse report");
    assert_eq!(report["strict"], true);

    let _ = fs::remove_dir_all(&dir);
}
