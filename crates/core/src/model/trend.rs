//! Additive trend + weekly seasonality model for inter-arrival delays.
//!
//! The delay following an event at time `t` is modeled as
//!
//! ```text
//! y(t) = b0 + b1 * u(t) + sum_k (s_k * sin(2 pi k w(t)) + c_k * cos(2 pi k w(t)))
//! ```
//!
//! where `u` is time rescaled to roughly `[-1, 1]` over the training span and
//! `w` is the position within the week. Coefficients are estimated by
//! Huber-weighted iteratively reweighted least squares with a small ridge
//! penalty on every term but the intercept, which keeps collinear seasonal
//! columns (sources that always arrive on the same weekday) solvable.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use super::linalg::weighted_ridge;
use super::{ForecastModel, ModelError, PointForecast};
use crate::metrics::{absolute_percentage_error, rolling_origin_cutoffs};
use crate::series::DerivedSeries;

const SECONDS_PER_WEEK: f64 = 7.0 * 86_400.0;

/// Fewest points a fit accepts.
pub const MIN_POINTS: usize = 3;

/// Scales a median absolute deviation to a normal standard deviation.
const MAD_TO_SIGMA: f64 = 1.4826;

/// Tunables for [`SeasonalTrendModel`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendConfig {
    /// Number of weekly Fourier harmonics.
    pub weekly_harmonics: usize,
    /// Probability mass covered by the uncertainty interval.
    pub interval_width: f64,
    /// Ridge penalty per observation on non-intercept coefficients.
    pub ridge: f64,
    /// Huber threshold in units of the robust residual scale.
    pub huber_k: f64,
    pub max_iterations: usize,
    /// Relative coefficient change at which IRLS stops.
    pub tolerance: f64,
    /// Upper bound on cross-validation folds.
    pub max_folds: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            weekly_harmonics: 3,
            interval_width: 0.8,
            ridge: 1e-4,
            huber_k: 1.345,
            max_iterations: 50,
            tolerance: 1e-8,
            max_folds: 10,
        }
    }
}

/// Fitted state of a [`SeasonalTrendModel`]; self-contained, including the
/// training series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendFit {
    pub config: TrendConfig,
    pub t_center: f64,
    pub t_scale: f64,
    pub coefficients: Vec<f64>,
    /// Residual standard deviation in seconds.
    pub sigma: f64,
    pub iterations: usize,
    pub history: DerivedSeries,
}

impl TrendFit {
    /// Modeled delay following an event at `ds`.
    pub fn predict_at(&self, ds: f64) -> f64 {
        features(ds, self.t_center, self.t_scale, self.config.weekly_harmonics)
            .iter()
            .zip(&self.coefficients)
            .map(|(x, b)| x * b)
            .sum()
    }
}

/// Robust trend + weekly seasonality forecaster.
#[derive(Debug, Clone, Default)]
pub struct SeasonalTrendModel {
    config: TrendConfig,
}

impl SeasonalTrendModel {
    pub fn new(config: TrendConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrendConfig {
        &self.config
    }

    fn validate(&self, series: &DerivedSeries) -> Result<(), ModelError> {
        let points = series.points();
        if points.len() < MIN_POINTS {
            return Err(ModelError::InsufficientData {
                required: MIN_POINTS,
                actual: points.len(),
            });
        }
        if points.iter().any(|p| !p.ds.is_finite() || !p.y.is_finite()) {
            return Err(ModelError::Degenerate(
                "series contains non-finite values".to_string(),
            ));
        }
        let (first, last) = (points[0].ds, points[points.len() - 1].ds);
        if last - first <= 0.0 {
            return Err(ModelError::Degenerate(
                "all observations share one timestamp".to_string(),
            ));
        }
        Ok(())
    }

    fn penalty(&self, width: usize, n: usize) -> Vec<f64> {
        let mut penalty = vec![self.config.ridge * n as f64; width];
        penalty[0] = 0.0;
        penalty
    }
}

impl ForecastModel for SeasonalTrendModel {
    type Fitted = TrendFit;

    fn name(&self) -> &str {
        "seasonal-trend"
    }

    fn fit(&self, series: &DerivedSeries, seed: Option<&TrendFit>) -> Result<TrendFit, ModelError> {
        self.validate(series)?;

        let points = series.points();
        let n = points.len();
        let harmonics = self.config.weekly_harmonics;
        let width = 2 + 2 * harmonics;
        let seed = seed.filter(|s| {
            s.config.weekly_harmonics == harmonics && s.coefficients.len() == width
        });

        // A seeded fit keeps the seed's time axis so its coefficients remain
        // a meaningful starting point.
        let (t_center, t_scale) = match seed {
            Some(s) => (s.t_center, s.t_scale),
            None => {
                let (first, last) = (points[0].ds, points[n - 1].ds);
                ((first + last) / 2.0, ((last - first) / 2.0).max(1.0))
            }
        };

        let design: Vec<Vec<f64>> = points
            .iter()
            .map(|p| features(p.ds, t_center, t_scale, harmonics))
            .collect();
        let targets: Vec<f64> = points.iter().map(|p| p.y).collect();
        let penalty = self.penalty(width, n);
        let unit_weights = vec![1.0; n];
        let y_magnitude = targets.iter().fold(0.0_f64, |m, y| m.max(y.abs()));

        let mut solved = seed.is_none();
        let mut beta = match seed {
            Some(s) => s.coefficients.clone(),
            None => weighted_ridge(&design, &targets, &unit_weights, &penalty)?,
        };
        let mut iterations = 0;

        for iteration in 1..=self.config.max_iterations {
            let residuals = residuals(&design, &targets, &beta);
            let scale = MAD_TO_SIGMA * median_absolute_deviation(&residuals);
            if scale <= 1e-9 * (1.0 + y_magnitude) {
                if !solved {
                    beta = weighted_ridge(&design, &targets, &unit_weights, &penalty)?;
                    iterations = iteration;
                }
                tracing::debug!(iteration, "Residual scale vanished, stopping");
                break;
            }

            let cutoff = self.config.huber_k * scale;
            let weights: Vec<f64> = residuals
                .iter()
                .map(|r| if r.abs() <= cutoff { 1.0 } else { cutoff / r.abs() })
                .collect();
            let next = weighted_ridge(&design, &targets, &weights, &penalty)?;
            let magnitude = beta.iter().fold(0.0_f64, |m, b| m.max(b.abs()));
            let change = next
                .iter()
                .zip(&beta)
                .fold(0.0_f64, |m, (a, b)| m.max((a - b).abs()))
                / (1.0 + magnitude);

            beta = next;
            solved = true;
            iterations = iteration;
            tracing::debug!(iteration, change, scale, "IRLS step");
            if change < self.config.tolerance {
                break;
            }
        }

        let final_residuals = residuals(&design, &targets, &beta);
        let dof = n.saturating_sub(width).max(1) as f64;
        let sigma = (final_residuals.iter().map(|r| r * r).sum::<f64>() / dof).sqrt();
        if !sigma.is_finite() {
            return Err(ModelError::Numerical("non-finite residual scale".to_string()));
        }

        tracing::debug!(points = n, iterations, sigma, "Fitted seasonal trend model");

        Ok(TrendFit {
            config: self.config,
            t_center,
            t_scale,
            coefficients: beta,
            sigma,
            iterations,
            history: series.clone(),
        })
    }

    fn forecast(&self, fitted: &TrendFit) -> Result<PointForecast, ModelError> {
        let reference_epoch = fitted.history.reference_epoch();
        let yhat = fitted.predict_at(reference_epoch);
        if !yhat.is_finite() {
            return Err(ModelError::OutOfRange(format!(
                "non-finite estimate at {reference_epoch}"
            )));
        }
        let half_width = interval_z(fitted.config.interval_width)? * fitted.sigma;

        Ok(PointForecast {
            reference_epoch,
            yhat,
            yhat_lower: yhat - half_width,
            yhat_upper: yhat + half_width,
        })
    }

    fn history<'a>(&self, fitted: &'a TrendFit) -> &'a DerivedSeries {
        &fitted.history
    }

    fn cross_validate(
        &self,
        fitted: &TrendFit,
        series: &DerivedSeries,
        horizon: usize,
    ) -> Result<f64, ModelError> {
        let fold_model = SeasonalTrendModel::new(fitted.config);
        let n = series.len();
        let horizon = horizon.max(1);
        let initial = horizon.saturating_mul(3).max(MIN_POINTS);
        let period = (horizon / 2).max(1);

        let cutoffs = rolling_origin_cutoffs(n, initial, horizon, period, fitted.config.max_folds);
        if cutoffs.is_empty() {
            return Err(ModelError::InsufficientData {
                required: initial.saturating_add(horizon),
                actual: n,
            });
        }

        let mut per_step: Vec<Vec<f64>> = vec![Vec::new(); horizon];
        for cutoff in cutoffs {
            let fold = match fold_model.fit(&series.head(cutoff), None) {
                Ok(fold) => fold,
                Err(e) => {
                    tracing::debug!(cutoff, error = %e, "Skipping cross-validation fold");
                    continue;
                }
            };
            for (step, point) in series.points()[cutoff..cutoff + horizon].iter().enumerate() {
                if let Some(err) = absolute_percentage_error(point.y, fold.predict_at(point.ds)) {
                    per_step[step].push(err);
                }
            }
            tracing::debug!(cutoff, "Evaluated cross-validation fold");
        }

        per_step
            .iter()
            .rev()
            .find(|errors| !errors.is_empty())
            .map(|errors| errors.iter().sum::<f64>() / errors.len() as f64)
            .ok_or_else(|| {
                ModelError::Numerical("no fold produced a usable error".to_string())
            })
    }
}

fn features(ds: f64, t_center: f64, t_scale: f64, harmonics: usize) -> Vec<f64> {
    let mut row = Vec::with_capacity(2 + 2 * harmonics);
    row.push(1.0);
    row.push((ds - t_center) / t_scale);
    let phase = ds.rem_euclid(SECONDS_PER_WEEK) / SECONDS_PER_WEEK;
    for k in 1..=harmonics {
        let angle = TAU * k as f64 * phase;
        row.push(angle.sin());
        row.push(angle.cos());
    }
    row
}

fn residuals(design: &[Vec<f64>], targets: &[f64], beta: &[f64]) -> Vec<f64> {
    design
        .iter()
        .zip(targets)
        .map(|(row, y)| y - row.iter().zip(beta).map(|(x, b)| x * b).sum::<f64>())
        .collect()
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

fn median_absolute_deviation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    let center = median(&mut sorted);
    let mut deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median(&mut deviations)
}

fn interval_z(width: f64) -> Result<f64, ModelError> {
    if !(width > 0.0 && width < 1.0) {
        return Err(ModelError::Numerical(format!(
            "interval width {width} must lie in (0, 1)"
        )));
    }
    let normal = Normal::new(0.0, 1.0).map_err(|e| ModelError::Numerical(e.to_string()))?;
    Ok(normal.inverse_cdf(0.5 + width / 2.0))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const WEEK: f64 = SECONDS_PER_WEEK;
    const START: f64 = 1_600_000_000.0;

    fn weekly_series(events: usize) -> DerivedSeries {
        DerivedSeries::from_epochs((0..events).map(|i| START + i as f64 * WEEK)).unwrap()
    }

    /// Hourly arrivals with deterministic jitter.
    fn jittered_series(events: usize) -> DerivedSeries {
        let mut t = START;
        let mut epochs = Vec::with_capacity(events);
        for i in 0..events {
            epochs.push(t);
            t += 3600.0 + 60.0 * (i as f64 * 0.7).sin();
        }
        DerivedSeries::from_epochs(epochs).unwrap()
    }

    #[test]
    fn regular_weekly_arrivals_forecast_one_week() {
        let model = SeasonalTrendModel::default();
        let fit = model.fit(&weekly_series(200), None).unwrap();
        let forecast = model.forecast(&fit).unwrap();

        assert!((forecast.yhat - WEEK).abs() < 1e-3);
        assert!(forecast.yhat_upper - forecast.yhat_lower < 1e-3);
        assert_eq!(forecast.reference_epoch, START + 199.0 * WEEK);
    }

    #[test]
    fn interval_brackets_point_estimate() {
        let model = SeasonalTrendModel::default();
        let fit = model.fit(&jittered_series(500), None).unwrap();
        let forecast = model.forecast(&fit).unwrap();

        assert!(forecast.yhat_lower < forecast.yhat);
        assert!(forecast.yhat < forecast.yhat_upper);
        assert!((forecast.yhat - 3600.0).abs() < 120.0);
    }

    #[test]
    fn outliers_are_downweighted() {
        let mut t = START;
        let mut epochs = Vec::new();
        for i in 0..500 {
            epochs.push(t);
            let gap = if i % 100 == 50 { 1_000_000.0 } else { 3600.0 + 60.0 * (i as f64).sin() };
            t += gap;
        }
        let series = DerivedSeries::from_epochs(epochs).unwrap();
        let model = SeasonalTrendModel::default();
        let fit = model.fit(&series, None).unwrap();
        let forecast = model.forecast(&fit).unwrap();

        assert!((forecast.yhat - 3600.0).abs() < 3600.0 * 0.05);
    }

    #[test]
    fn identical_timestamps_are_degenerate() {
        let series = DerivedSeries::from_epochs(vec![START; 50]).unwrap();
        let err = SeasonalTrendModel::default().fit(&series, None).unwrap_err();
        assert_matches!(err, ModelError::Degenerate(_));
    }

    #[test]
    fn too_few_points_are_rejected() {
        let series = DerivedSeries::from_epochs([START, START + 10.0, START + 20.0]).unwrap();
        let err = SeasonalTrendModel::default().fit(&series, None).unwrap_err();
        assert_eq!(
            err,
            ModelError::InsufficientData {
                required: MIN_POINTS,
                actual: 2
            }
        );
    }

    #[test]
    fn warm_start_converges_to_cold_fit() {
        let model = SeasonalTrendModel::default();
        let full = jittered_series(800);
        let seed = model.fit(&full.head(400), None).unwrap();

        let warm = model.fit(&full, Some(&seed)).unwrap();
        let cold = model.fit(&full, None).unwrap();

        let warm_yhat = model.forecast(&warm).unwrap().yhat;
        let cold_yhat = model.forecast(&cold).unwrap().yhat;
        assert!((warm_yhat - cold_yhat).abs() < 5.0);
        assert_eq!(warm.t_center, seed.t_center);
    }

    #[test]
    fn fitted_state_survives_serialization() {
        let model = SeasonalTrendModel::default();
        let fit = model.fit(&jittered_series(300), None).unwrap();
        let json = serde_json::to_string(&fit).unwrap();
        let restored: TrendFit = serde_json::from_str(&json).unwrap();

        let a = model.forecast(&fit).unwrap();
        let b = model.forecast(&restored).unwrap();
        assert!((a.yhat - b.yhat).abs() < 1e-6);
        assert!((a.yhat_lower - b.yhat_lower).abs() < 1e-6);
        assert!((a.yhat_upper - b.yhat_upper).abs() < 1e-6);
    }

    #[test]
    fn cross_validation_of_regular_series_is_near_zero() {
        let model = SeasonalTrendModel::default();
        let series = weekly_series(400);
        let fit = model.fit(&series, None).unwrap();
        let mape = model.cross_validate(&fit, &series, 4).unwrap();
        assert!(mape < 1e-6, "mape = {mape}");
    }

    #[test]
    fn cross_validation_needs_enough_points() {
        let model = SeasonalTrendModel::default();
        let series = weekly_series(10);
        let fit = model.fit(&series, None).unwrap();
        let err = model.cross_validate(&fit, &series, 5).unwrap_err();
        assert_matches!(err, ModelError::InsufficientData { .. });
    }

    #[test]
    fn oversized_horizon_is_insufficient_data() {
        let model = SeasonalTrendModel::default();
        let series = weekly_series(10);
        let fit = model.fit(&series, None).unwrap();
        let err = model.cross_validate(&fit, &series, usize::MAX).unwrap_err();
        assert_matches!(err, ModelError::InsufficientData { required: usize::MAX, actual: 9 });
    }

    #[test]
    fn interval_width_must_be_a_probability() {
        assert!(interval_z(0.0).is_err());
        assert!(interval_z(1.0).is_err());
        assert!((interval_z(0.8).unwrap() - 1.2816).abs() < 1e-3);
    }
}
