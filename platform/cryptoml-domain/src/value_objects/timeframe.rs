use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Sampling interval shared by every series that gets combined into one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub label: String,
    pub step_seconds: i64,
}

impl Interval {
    pub fn daily() -> Self {
        Self {
            label: "1d".to_string(),
            step_seconds: SECONDS_PER_DAY,
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        let normalized = value.trim().to_lowercase();
        let label = match normalized.as_str() {
            "1m" | "1min" => "1m",
            "5m" | "5min" => "5m",
            "15m" | "15min" => "15m",
            "30m" | "30min" => "30m",
            "1h" | "1hour" => "1h",
            "4h" | "4hour" => "4h",
            "12h" | "12hour" => "12h",
            "d" | "1d" | "1day" => "1d",
            "1w" | "1week" => "1w",
            _ => return Err(format!("unsupported interval: {value}")),
        };

        let step_seconds = parse_duration_like_seconds(label)?;
        Ok(Self {
            label: label.to_string(),
            step_seconds,
        })
    }

    /// Step of a multi-period bucket (`period` intervals wide).
    pub fn span(&self, period: usize) -> i64 {
        self.step_seconds * period as i64
    }
}

pub fn parse_duration_like_seconds(value: &str) -> Result<i64, String> {
    let trimmed = value.trim().to_lowercase();
    if trimmed.is_empty() {
        return Err("empty duration".to_string());
    }
    if let Ok(seconds) = trimmed.parse::<i64>() {
        return Ok(seconds);
    }

    let (number_part, unit) = if let Some(stripped) = trimmed.strip_suffix("min") {
        (stripped, "min")
    } else if let Some(stripped) = trimmed.strip_suffix("hour") {
        (stripped, "hour")
    } else if let Some(stripped) = trimmed.strip_suffix("day") {
        (stripped, "day")
    } else if let Some(stripped) = trimmed.strip_suffix("week") {
        (stripped, "week")
    } else {
        trimmed.split_at(trimmed.len().saturating_sub(1))
    };

    let multiplier = match unit {
        "s" => 1,
        "m" | "min" => 60,
        "h" | "hour" => 3600,
        "d" | "day" => SECONDS_PER_DAY,
        "w" | "week" => 7 * SECONDS_PER_DAY,
        _ => return Err(format!("unsupported duration unit: {unit}")),
    };

    let number: i64 = number_part
        .parse()
        .map_err(|_| format!("invalid duration: {value}"))?;
    Ok(number * multiplier)
}

/// Epoch seconds from RFC 3339, `%Y-%m-%d %H:%M:%S[%z]`, a bare date (midnight UTC) or an
/// integer.
pub fn parse_timestamp(value: &str) -> Result<i64, String> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%z") {
        return Ok(dt.timestamp());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&naive).timestamp());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN)).timestamp());
    }
    if let Ok(seconds) = value.parse::<i64>() {
        return Ok(seconds);
    }

    Err(format!("unsupported timestamp format: {}", value))
}

/// RFC 3339 in UTC with second precision; out-of-range values fall back to the raw number.
pub fn format_timestamp(ts: i64) -> String {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| ts.to_string())
}
