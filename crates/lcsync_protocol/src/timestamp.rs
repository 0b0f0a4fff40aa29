//! ISO-8601 timestamp parsing and formatting.
//!
//! The upstream datasets carry naive datetimes with a trailing `.000Z`
//! (UTC implied), while clients may send full RFC 3339 strings with an
//! offset. Parsing accepts both; formatting always emits the dataset
//! convention: millisecond precision, `Z` suffix.

use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

/// Error for unparseable timestamps.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("not a valid ISO date: {0:?}")]
pub struct TimestampError(pub String);

/// Parses an ISO-8601 timestamp into a UTC instant.
///
/// Accepts RFC 3339 (`2024-01-01T10:00:00+01:00`, `...Z`) and bare
/// datetimes without an offset (`2024-01-01T10:00:00.000`), which are
/// treated as UTC.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, TimestampError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(TimestampError(input.to_string()));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc());
        }
    }

    Err(TimestampError(input.to_string()))
}

/// Formats a UTC instant in the dataset convention: `2024-01-01T10:00:00.000Z`.
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
