//! Arrival forecasts expressed as wall-clock timestamps.

use serde::{Deserialize, Serialize};

use crate::model::{ModelError, PointForecast};
use crate::types::{epoch_to_local, format_timestamp, timestamp_format, Timestamp};

/// Expected arrival window of a source's next event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastResult {
    #[serde(with = "timestamp_format")]
    pub lower_bound: Timestamp,
    #[serde(with = "timestamp_format")]
    pub predicted: Timestamp,
    #[serde(with = "timestamp_format")]
    pub upper_bound: Timestamp,
}

impl ForecastResult {
    /// Anchor a delay forecast at its reference event and convert the three
    /// bounds to local time.
    pub fn from_point(point: &PointForecast) -> Result<Self, ModelError> {
        let to_local = |offset: f64| {
            let epoch = point.reference_epoch + offset;
            epoch_to_local(epoch)
                .ok_or_else(|| ModelError::OutOfRange(format!("epoch {epoch} is not representable")))
        };

        Ok(Self {
            lower_bound: to_local(point.yhat_lower)?,
            predicted: to_local(point.yhat)?,
            upper_bound: to_local(point.yhat_upper)?,
        })
    }

    /// A forecast whose predicted arrival is at or before `now` is overdue.
    pub fn is_overdue(&self, now: Timestamp) -> bool {
        self.predicted <= now
    }
}

impl std::fmt::Display for ForecastResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "between {} and {}, predicted at {}",
            format_timestamp(&self.lower_bound),
            format_timestamp(&self.upper_bound),
            format_timestamp(&self.predicted)
        )
    }
}
