use cryptoml_domain::value_objects::bar::Tick;
use cryptoml_domain::value_objects::timeframe::parse_timestamp;
use serde::Deserialize;
use std::fs::File;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct TickRecord {
    #[serde(alias = "timestamp_utc", alias = "time", alias = "date")]
    pub timestamp: String,
    pub price: f64,
    pub volume: f64,
}

/// Trades in file order. Non-finite prices or volumes are skipped.
pub fn load_csv(path: &Path) -> Result<Vec<Tick>, String> {
    let file = File::open(path)
        .map_err(|err| format!("failed to open ticks CSV {}: {}", path.display(), err))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut ticks = Vec::new();
    let mut skipped = 0usize;
    for result in reader.deserialize::<TickRecord>() {
        let record = result
            .map_err(|err| format!("failed to parse tick row in {}: {}", path.display(), err))?;
        let timestamp = parse_timestamp(&record.timestamp)?;
        if !record.price.is_finite() || !record.volume.is_finite() {
            skipped += 1;
            continue;
        }
        ticks.push(Tick {
            timestamp,
            price: record.price,
            volume: record.volume,
        });
    }

    if skipped > 0 {
        tracing::warn!(path = %path.display(), skipped, "skipped ticks with non-finite values");
    }
    metrics::counter!("cryptoml.infra.rows_read_total", "source" => "ticks")
        .increment(ticks.len() as u64);
    Ok(ticks)
}

#[cfg(test)]
mod tests {
    use super::load_csv;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_tmp_path(name: &str) -> PathBuf {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("cryptoml_{name}_{}_{}", std::process::id(), now))
    }

    #[test]
    fn loads_epoch_and_rfc3339_ticks() {
        let tmp_path = unique_tmp_path("ticks.csv");
        let csv_data = "time,price,volume\n\
1600000000,10500.5,0.25\n\
2020-09-13T12:30:00Z,10510,1.5\n\
1600000100,inf,1\n";
        fs::write(&tmp_path, csv_data).expect("write csv");

        let ticks = load_csv(&tmp_path).expect("load ticks");
        assert_eq!(ticks.len(), 2);
        assert_eq!(ticks[0].timestamp, 1_600_000_000);
        assert_eq!(ticks[1].timestamp, 1_600_000_200);
        assert!((ticks[1].volume - 1.5).abs() < 1e-12);
        let _ = fs::remove_file(&tmp_path);
    }
}
