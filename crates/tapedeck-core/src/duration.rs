//! Recorded response durations
//!
//! Cassettes written by other tooling store durations as compound unit strings
//! (`"1.234567ms"`, `"2m3.5s"`) or as integer nanoseconds. Both are accepted;
//! durations are always written back in humantime form.

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid duration {input:?}: {reason}")]
pub struct ParseDurationError {
    input: String,
    reason: String,
}

impl ParseDurationError {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Parse a duration string
pub fn parse(input: &str) -> Result<Duration, ParseDurationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseDurationError::new(input, "empty"));
    }
    if let Ok(d) = humantime::parse_duration(trimmed) {
        return Ok(d);
    }
    parse_fractional(trimmed).map_err(|reason| ParseDurationError::new(input, reason))
}

fn unit_nanos(unit: &str) -> Option<f64> {
    Some(match unit {
        "ns" => 1.0,
        "us" | "µs" | "μs" => 1e3,
        "ms" => 1e6,
        "s" => 1e9,
        "m" => 60e9,
        "h" => 3600e9,
        _ => return None,
    })
}

// Number+unit pairs with optional fractions, e.g. "1.5s" or "1h2m0.25s"
fn parse_fractional(s: &str) -> Result<Duration, String> {
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    let mut rest = s;
    let mut total = 0f64;
    while !rest.is_empty() {
        let num_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| "missing unit".to_string())?;
        if num_end == 0 {
            return Err("expected number".to_string());
        }
        let value: f64 = rest[..num_end]
            .parse()
            .map_err(|_| format!("bad number {:?}", &rest[..num_end]))?;
        rest = &rest[num_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        let scale = unit_nanos(unit).ok_or_else(|| format!("unknown unit {:?}", unit))?;
        total += value * scale;
        rest = &rest[unit_end..];
    }
    Ok(Duration::from_nanos(total.round() as u64))
}

/// Format a duration for a cassette
pub fn format(d: Duration) -> String {
    humantime::format_duration(d).to_string()
}

/// Serde adapter for `Option<Duration>` fields
pub mod option {
    use super::*;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Nanos(u64),
        Text(String),
    }

    pub fn serialize<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(d) => serializer.serialize_str(&format(*d)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Raw::Nanos(n)) => Ok(Some(Duration::from_nanos(n))),
            Some(Raw::Text(s)) => parse(&s).map(Some).map_err(serde::de::Error::custom),
        }
    }
}
