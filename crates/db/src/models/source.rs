//! Latest arrival forecast per source.

use serde::{Deserialize, Serialize};
use sources_core::forecast::ForecastResult;
use sources_core::types::{timestamp_format, truncate_to_seconds, Timestamp};
use sqlx::FromRow;

/// A row from the `Sources` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SourcePrediction {
    pub name: String,
    #[serde(with = "timestamp_format")]
    pub lower_bound: Timestamp,
    #[serde(with = "timestamp_format")]
    pub predicted: Timestamp,
    #[serde(with = "timestamp_format")]
    pub upper_bound: Timestamp,
}

/// DTO for replacing a source's forecast.
#[derive(Debug, Clone)]
pub struct UpsertSourcePrediction {
    pub name: String,
    pub lower_bound: Timestamp,
    pub predicted: Timestamp,
    pub upper_bound: Timestamp,
}

impl UpsertSourcePrediction {
    pub fn from_forecast(name: impl Into<String>, forecast: &ForecastResult) -> Self {
        Self {
            name: name.into(),
            lower_bound: truncate_to_seconds(forecast.lower_bound),
            predicted: truncate_to_seconds(forecast.predicted),
            upper_bound: truncate_to_seconds(forecast.upper_bound),
        }
    }
}
