use chrono::{DateTime, Local, NaiveDateTime, Timelike};

use crate::error::CoreError;

/// Forecast bounds and registry rows are local wall-clock times at
/// whole-second precision.
pub type Timestamp = NaiveDateTime;

/// Human-readable layout used for every timestamp the system emits.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time, truncated to whole seconds.
pub fn now_local() -> Timestamp {
    truncate_to_seconds(Local::now().naive_local())
}

/// Drop sub-second precision so stored and compared values line up.
pub fn truncate_to_seconds(ts: Timestamp) -> Timestamp {
    ts.with_nanosecond(0).unwrap_or(ts)
}

/// Convert fractional epoch seconds into a local timestamp, rounding to the
/// nearest second. Returns `None` for non-finite or out-of-range input.
pub fn epoch_to_local(epoch_secs: f64) -> Option<Timestamp> {
    if !epoch_secs.is_finite() {
        return None;
    }
    let rounded = epoch_secs.round();
    if rounded < i64::MIN as f64 || rounded > i64::MAX as f64 {
        return None;
    }
    let utc = DateTime::from_timestamp(rounded as i64, 0)?;
    Some(utc.with_timezone(&Local).naive_local())
}

pub fn format_timestamp(ts: &Timestamp) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(value: &str) -> Result<Timestamp, CoreError> {
    NaiveDateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT)
        .map_err(|e| CoreError::Validation(format!("Invalid timestamp '{value}': {e}")))
}

/// Serde adapter that writes [`Timestamp`] values as [`TIMESTAMP_FORMAT`].
pub mod timestamp_format {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{Timestamp, TIMESTAMP_FORMAT};

    pub fn serialize<S: Serializer>(ts: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&ts.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}
