//! The forecasting capability consumed by the per-group pipeline.
//!
//! [`ForecastModel`] is the seam between orchestration and statistics: the
//! pipeline, artifact store and service only ever see the trait, and a
//! model's fitted state is opaque to them apart from being serializable.

pub mod linalg;
pub mod trend;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::series::DerivedSeries;

pub use trend::{SeasonalTrendModel, TrendConfig, TrendFit};

/// Errors raised by a forecasting model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Degenerate series: {0}")]
    Degenerate(String),

    #[error("Numerical failure: {0}")]
    Numerical(String),

    #[error("Forecast out of range: {0}")]
    OutOfRange(String),
}

/// Next-step estimate of the inter-arrival delay, in seconds, with its
/// uncertainty interval, anchored at `reference_epoch`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointForecast {
    pub reference_epoch: f64,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
}

/// A model that can be fitted to an inter-arrival series.
///
/// Implementations are expected to be CPU-bound and may be slow; callers run
/// them on blocking threads.
pub trait ForecastModel: Send + Sync + 'static {
    /// Self-contained fitted state, persisted as the model artifact.
    type Fitted: Clone + Send + Sync + Serialize + DeserializeOwned + 'static;

    fn name(&self) -> &str;

    /// Fit to `series`. A `seed` from an earlier fit may be used as the
    /// starting point of the optimisation.
    fn fit(
        &self,
        series: &DerivedSeries,
        seed: Option<&Self::Fitted>,
    ) -> Result<Self::Fitted, ModelError>;

    /// Forecast the delay following the last observed event.
    fn forecast(&self, fitted: &Self::Fitted) -> Result<PointForecast, ModelError>;

    /// The series the model was fitted on.
    fn history<'a>(&self, fitted: &'a Self::Fitted) -> &'a DerivedSeries;

    /// Rolling-origin cross-validation over `series` with a hold-out of
    /// `horizon` points; returns the MAPE at the furthest horizon step.
    fn cross_validate(
        &self,
        fitted: &Self::Fitted,
        series: &DerivedSeries,
        horizon: usize,
    ) -> Result<f64, ModelError>;
}
