//! Classification of a batch's outcomes into healthy forecasts and
//! diagnostics.

use std::collections::BTreeMap;
use std::fmt;

use sources_core::forecast::ForecastResult;
use sources_core::types::{format_timestamp, Timestamp};

use crate::group::GroupOutcome;

/// A problem with one source found while aggregating.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// The pipeline produced no forecast for this source.
    MissingPrediction {
        source: String,
        reason: Option<String>,
    },
    /// The forecast arrival is at or before the reference time.
    StalePrediction { source: String, predicted: Timestamp },
}

impl Diagnostic {
    pub fn source(&self) -> &str {
        match self {
            Self::MissingPrediction { source, .. } | Self::StalePrediction { source, .. } => source,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPrediction {
                source,
                reason: Some(reason),
            } => write!(f, "Missing prediction for {source}: {reason}"),
            Self::MissingPrediction {
                source,
                reason: None,
            } => write!(f, "Missing prediction for {source}"),
            Self::StalePrediction { source, predicted } => write!(
                f,
                "Past prediction for {source}, predicted at {}",
                format_timestamp(predicted)
            ),
        }
    }
}

/// Summary of one batch, ordered by source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub healthy: BTreeMap<String, ForecastResult>,
    pub diagnostics: Vec<Diagnostic>,
    /// Cross-validation metric per source, where one was computed.
    pub validation: BTreeMap<String, f64>,
}

impl BatchReport {
    /// Number of outcomes that went into the report.
    pub fn total(&self) -> usize {
        self.healthy.len() + self.diagnostics.len()
    }
}

/// Classify every outcome against `now`.
///
/// Pure: arrival order of `outcomes` does not matter and each outcome is
/// counted exactly once.
pub fn aggregate<F>(outcomes: &[GroupOutcome<F>], now: Timestamp) -> BatchReport {
    let mut report = BatchReport::default();

    for outcome in outcomes {
        if let Some(metric) = outcome.validation {
            report.validation.insert(outcome.source.clone(), metric);
        }

        match outcome.forecast {
            None => report.diagnostics.push(Diagnostic::MissingPrediction {
                source: outcome.source.clone(),
                reason: outcome.failure.clone(),
            }),
            Some(forecast) if forecast.is_overdue(now) => {
                report.diagnostics.push(Diagnostic::StalePrediction {
                    source: outcome.source.clone(),
                    predicted: forecast.predicted,
                })
            }
            Some(forecast) => {
                report.healthy.insert(outcome.source.clone(), forecast);
            }
        }
    }

    report
        .diagnostics
        .sort_by(|a, b| a.source().cmp(b.source()));
    report
}
