//! Per-group forecasting pipeline.
//!
//! One call turns a single source's records into an outcome. Failures are
//! captured in the outcome so that a bad group never aborts its siblings.

use sources_core::events::EventRecord;
use sources_core::forecast::ForecastResult;
use sources_core::metrics::cv_horizon;
use sources_core::model::{ForecastModel, ModelError};
use sources_core::quiet;
use sources_core::series::{DerivedSeries, SeriesError};

/// Share of a group's points held out per cross-validation fold.
pub const DEFAULT_CV_HORIZON_FRACTION: f64 = 0.01;

/// Knobs for [`run_group`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineOptions {
    /// Run rolling-origin cross-validation after fitting.
    pub cross_validate: bool,
    /// Hold-out size as a fraction of the series length (at least one point).
    pub cv_horizon_fraction: f64,
    /// Let model diagnostics through and log each forecast.
    pub debug: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            cross_validate: false,
            cv_horizon_fraction: DEFAULT_CV_HORIZON_FRACTION,
            debug: false,
        }
    }
}

/// Result of running the pipeline on one group.
///
/// `forecast` is `None` exactly when the group failed, in which case
/// `failure` carries the reason.
#[derive(Debug, Clone)]
pub struct GroupOutcome<F> {
    pub source: String,
    pub forecast: Option<ForecastResult>,
    pub validation: Option<f64>,
    pub fitted: Option<F>,
    pub failure: Option<String>,
}

impl<F> GroupOutcome<F> {
    /// An absent outcome for `source`.
    pub fn failed(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            forecast: None,
            validation: None,
            fitted: None,
            failure: Some(reason.into()),
        }
    }

    pub fn is_absent(&self) -> bool {
        self.forecast.is_none()
    }
}

#[derive(Debug, thiserror::Error)]
enum GroupError {
    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Run derive → fit → forecast (→ cross-validate) for one group.
///
/// Never returns an error: any failure yields an absent outcome whose
/// `failure` describes it. Model calls run with tracing output suppressed
/// on this thread unless `options.debug` is set.
pub fn run_group<M: ForecastModel>(
    model: &M,
    source: &str,
    records: &[EventRecord],
    options: &PipelineOptions,
) -> GroupOutcome<M::Fitted> {
    match quiet::silenced_if(!options.debug, || forecast_group(model, records, options)) {
        Ok((forecast, validation, fitted)) => {
            if options.debug {
                tracing::info!(source, "{source} will arrive {forecast}");
            }
            GroupOutcome {
                source: source.to_string(),
                forecast: Some(forecast),
                validation,
                fitted: Some(fitted),
                failure: None,
            }
        }
        Err(e) => {
            tracing::debug!(source, error = %e, "Group produced no forecast");
            GroupOutcome::failed(source, e.to_string())
        }
    }
}

fn forecast_group<M: ForecastModel>(
    model: &M,
    records: &[EventRecord],
    options: &PipelineOptions,
) -> Result<(ForecastResult, Option<f64>, M::Fitted), GroupError> {
    let series = DerivedSeries::from_events(records)?;
    let fitted = model.fit(&series, None)?;
    let point = model.forecast(&fitted)?;
    let forecast = ForecastResult::from_point(&point)?;

    let validation = if options.cross_validate {
        let horizon = cv_horizon(series.len(), options.cv_horizon_fraction);
        let score = model.cross_validate(&fitted, &series, horizon)?;
        // MAPE is undefined when every held-out actual is zero.
        score.is_finite().then_some(score)
    } else {
        None
    };

    Ok((forecast, validation, fitted))
}
