use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::{PipelineError, Result};

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a `retrieved_at` value into a UTC instant.
///
/// Offset-carrying values are converted to UTC; naive values and bare dates
/// are taken to already be UTC.
pub fn parse_retrieved_at(raw: &str) -> Result<DateTime<Utc>> {
    let value = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Ok(dt.with_timezone(&Utc));
        }
    }
    if let Some(expanded) = expand_hour_offset(value) {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&expanded) {
            return Ok(dt.with_timezone(&Utc));
        }
        for format in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(&expanded, format) {
                return Ok(dt.with_timezone(&Utc));
            }
        }
    }

    let naive = value.strip_suffix('Z').unwrap_or(value);
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, format) {
            return Ok(dt.and_utc());
        }
    }
    if let Ok(day) = NaiveDate::parse_from_str(naive, "%Y-%m-%d") {
        if let Some(midnight) = day.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }

    Err(PipelineError::UnparseableTimestamp {
        value: raw.to_string(),
    })
}

/// `...12:00:00+02` -> `...12:00:00+02:00`; `None` unless the value has a
/// time part ending in an hour-only offset.
fn expand_hour_offset(value: &str) -> Option<String> {
    let split = value.len().checked_sub(3)?;
    let (head, offset) = (value.get(..split)?, value.get(split..)?);
    let mut chars = offset.chars();
    let sign_ok = matches!(chars.next(), Some('+' | '-'));
    if !sign_ok || !chars.all(|c| c.is_ascii_digit()) || !head.contains(':') {
        return None;
    }
    Some(format!("{value}:00"))
}
