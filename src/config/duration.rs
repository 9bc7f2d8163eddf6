//! Duration parsing for timeout settings
//!
//! Accepts bare numbers and numeric strings as seconds, and unit-suffixed
//! strings such as `300ms`, `1m30s` or `2d`.

use crate::{Error, Result};
use serde_json::Value;
use std::time::Duration;

/// Parse a configuration value as a duration, treating bare numbers as seconds
pub fn parse_duration_value(value: &Value) -> Result<Duration> {
    match value {
        Value::Number(n) => match n.as_u64() {
            Some(secs) => Ok(Duration::from_secs(secs)),
            None => seconds_f64(n.as_f64().unwrap_or(-1.0), &n.to_string()),
        },
        Value::String(s) => parse_duration_str(s),
        other => Err(Error::Validation(format!(
            "cannot parse {} as a duration",
            super::coerce::kind(other)
        ))),
    }
}

/// Parse a duration string
pub fn parse_duration_str(input: &str) -> Result<Duration> {
    let s = input.trim();
    if s.is_empty() {
        return Ok(Duration::ZERO);
    }
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    if let Ok(secs) = s.parse::<f64>() {
        return seconds_f64(secs, input);
    }
    humantime::parse_duration(s)
        .map_err(|e| Error::Validation(format!("invalid duration {:?}: {}", input, e)))
}

fn seconds_f64(secs: f64, input: &str) -> Result<Duration> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(Error::Validation(format!("invalid duration {:?}", input)));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|_| Error::Validation(format!("invalid duration {:?}", input)))
}
