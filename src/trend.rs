//! JSON-lines trend input for the driver service.
//!
//! Each non-empty line holds one device scrape:
//! `{"timestamp": "2024-06-01T12:00:00Z", "device": "ahu-1", "points": {"OutdoorAirTemperature": 52.1}}`.
//! Point values may be numbers, booleans or null.

use serde::Deserialize;
use std::collections::HashMap;
use time::OffsetDateTime;

pub const DEFAULT_DEVICE: &str = "default";

#[derive(Debug, thiserror::Error)]
pub enum TrendError {
    #[error("Malformed trend record on line {line}: {source}")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum RawValue {
    Number(f64),
    Flag(bool),
}

impl RawValue {
    fn as_f64(self) -> f64 {
        match self {
            RawValue::Number(value) => value,
            RawValue::Flag(flag) => {
                if flag {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
    #[serde(default)]
    device: Option<String>,
    points: HashMap<String, Option<RawValue>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendRecord {
    pub timestamp: OffsetDateTime,
    pub device: String,
    pub points: HashMap<String, Option<f64>>,
}

/// Parse one line of a trend file; blank lines and `#` comments yield None.
pub fn parse_line(line: &str, line_number: usize) -> Result<Option<TrendRecord>, TrendError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let raw: RawRecord = serde_json::from_str(trimmed).map_err(|source| TrendError::Malformed {
        line: line_number,
        source,
    })?;

    Ok(Some(TrendRecord {
        timestamp: raw.timestamp,
        device: raw
            .device
            .filter(|device| !device.is_empty())
            .unwrap_or_else(|| DEFAULT_DEVICE.to_string()),
        points: raw
            .points
            .into_iter()
            .map(|(name, value)| (name, value.map(RawValue::as_f64)))
            .collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn parses_numbers_flags_and_nulls() {
        let line = r#"{"timestamp": "2024-06-01T12:00:00Z", "device": "ahu-1",
            "points": {"SupplyFanStatus": true, "OutdoorAirTemperature": 52.5, "MixedAirTemperature": null}}"#
            .replace('\n', " ");
        let record = parse_line(&line, 1).unwrap().unwrap();
        assert_eq!(record.timestamp, datetime!(2024-06-01 12:00 UTC));
        assert_eq!(record.device, "ahu-1");
        assert_eq!(record.points["SupplyFanStatus"], Some(1.0));
        assert_eq!(record.points["OutdoorAirTemperature"], Some(52.5));
        assert_eq!(record.points["MixedAirTemperature"], None);
    }

    #[test]
    fn device_defaults_when_absent() {
        let record = parse_line(r#"{"timestamp": "2024-06-01T12:00:00Z", "points": {}}"#, 3)
            .unwrap()
            .unwrap();
        assert_eq!(record.device, DEFAULT_DEVICE);
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        assert!(parse_line("   ", 1).unwrap().is_none());
        assert!(parse_line("# header", 2).unwrap().is_none());
    }

    #[test]
    fn reports_line_number_on_error() {
        let err = parse_line("{not json}", 7).unwrap_err();
        assert!(err.to_string().contains("line 7"));
    }
}
