//! ISO 8601 time handling.
//!
//! Time axes are stored as seconds since 1970-01-01T00:00:00Z (`f64`), the
//! same representation used in cache keys and in the capabilities update
//! sequence.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

use crate::WmsError;

/// Parse an ISO 8601 timestamp.
///
/// Accepts RFC 3339 (with `Z` or an offset, with or without fractional
/// seconds), a zone-less datetime (taken as UTC) and a bare date.
pub fn parse_iso8601(s: &str) -> Result<DateTime<Utc>, TimeParseError> {
    let s = s.trim();

    // Try full datetime with timezone
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Try without timezone (assume UTC)
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    // Try date only
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(ndt) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&ndt));
        }
    }

    Err(TimeParseError::InvalidFormat(s.to_string()))
}

/// Parse an ISO 8601 timestamp into seconds since the epoch.
pub fn parse_iso8601_seconds(s: &str) -> Result<f64, TimeParseError> {
    parse_iso8601(s).map(|dt| datetime_to_seconds(&dt))
}

/// Seconds since the epoch for a UTC datetime, keeping millisecond precision.
pub fn datetime_to_seconds(dt: &DateTime<Utc>) -> f64 {
    dt.timestamp_millis() as f64 / 1000.0
}

/// Convert seconds since the epoch into a UTC datetime.
///
/// Sub-millisecond precision is dropped.
pub fn seconds_to_datetime(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    Utc.timestamp_millis_opt((seconds * 1000.0).round() as i64).single()
}

/// Format seconds since the epoch as `YYYY-MM-DDTHH:MM:SS.sssZ`.
pub fn seconds_to_iso8601(seconds: f64) -> String {
    seconds_to_datetime(seconds)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

/// Format seconds since the epoch as `YYYY-MM-DDTHH:MM:SSZ`, rounded to the
/// nearest whole second.
pub fn seconds_to_iso8601_whole(seconds: f64) -> String {
    seconds_to_datetime(seconds.round())
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

#[derive(Debug, thiserror::Error)]
pub enum TimeParseError {
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),
}

impl From<TimeParseError> for WmsError {
    fn from(err: TimeParseError) -> Self {
        match err {
            TimeParseError::InvalidFormat(value) => WmsError::InvalidTimeValue(value),
        }
    }
}
