use cryptoml_domain::value_objects::frame::Frame;
use cryptoml_domain::value_objects::timeframe::parse_timestamp;
use std::fs::File;
use std::path::Path;

/// Wide metrics table: a timestamp column followed by one numeric column per metric.
///
/// Empty or unparseable cells are missing values. Row order is kept so callers can reject
/// an unordered index.
pub fn load_csv(path: &Path) -> Result<Frame, String> {
    let file = File::open(path)
        .map_err(|err| format!("failed to open metrics CSV {}: {}", path.display(), err))?;
    let mut reader = csv::Reader::from_reader(file);
    let headers = reader
        .headers()
        .map_err(|err| format!("failed to read metrics header {}: {}", path.display(), err))?
        .clone();
    if headers.len() < 2 {
        return Err(format!(
            "metrics CSV {} needs a timestamp column and at least one metric",
            path.display()
        ));
    }
    let names: Vec<String> = headers.iter().skip(1).map(|h| h.trim().to_string()).collect();

    let mut index = Vec::new();
    let mut columns: Vec<Vec<Option<f64>>> = vec![Vec::new(); names.len()];
    let mut unparsed = 0usize;
    for result in reader.records() {
        let record = result
            .map_err(|err| format!("failed to parse metrics row in {}: {}", path.display(), err))?;
        let ts = record
            .get(0)
            .ok_or_else(|| format!("metrics row without timestamp in {}", path.display()))?;
        index.push(parse_timestamp(ts)?);
        for (col, values) in columns.iter_mut().enumerate() {
            let cell = record.get(col + 1).unwrap_or("").trim();
            let value = if cell.is_empty() {
                None
            } else {
                match cell.parse::<f64>() {
                    Ok(v) if v.is_finite() => Some(v),
                    _ => {
                        unparsed += 1;
                        None
                    }
                }
            };
            values.push(value);
        }
    }

    if unparsed > 0 {
        tracing::warn!(path = %path.display(), unparsed, "metrics cells treated as missing");
    }
    metrics::counter!("cryptoml.infra.rows_read_total", "source" => "metrics")
        .increment(index.len() as u64);

    let mut frame = Frame::new(index);
    for (name, values) in names.into_iter().zip(columns) {
        frame.push(name, values).map_err(|err| err.to_string())?;
    }
    Ok(frame)
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
    fn missing_cells_become_none() {
        let tmp_path = unique_tmp_path("onchain.csv");
        let csv_data = "date,hash_rate,active_addresses\n\
2020-01-01,100.5,\n\
2020-01-02,n/a,42\n";
        fs::write(&tmp_path, csv_data).expect("write csv");

        let frame = load_csv(&tmp_path).expect("load metrics");
        assert_eq!(frame.names(), &["hash_rate".to_string(), "active_addresses".to_string()]);
        assert_eq!(frame.index(), &[1_577_836_800, 1_577_923_200]);
        assert_eq!(frame.column("hash_rate").expect("hash_rate"), &[Some(100.5), None]);
        assert_eq!(
            frame.column("active_addresses").expect("active_addresses"),
            &[None, Some(42.0)]
        );
        let _ = fs::remove_file(&tmp_path);
    }

    #[test]
    fn header_without_metrics_is_rejected() {
        let tmp_path = unique_tmp_path("onchain_empty.csv");
        fs::write(&tmp_path, "date\n2020-01-01\n").expect("write csv");
        assert!(load_csv(&tmp_path).is_err());
        let _ = fs::remove_file(&tmp_path);
    }
}
