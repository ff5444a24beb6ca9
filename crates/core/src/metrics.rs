//! Error metrics and rolling-origin splits for cross-validation.
//!
//! Splits respect temporal order: every fold trains on a prefix of the
//! series and evaluates on the `horizon` points that follow it.

/// Absolute values at or below this are treated as zero and skipped by the
/// percentage metrics.
const ZERO_EPSILON: f64 = 1e-10;

/// Absolute percentage error of one prediction, or `None` when the actual
/// value is (numerically) zero.
pub fn absolute_percentage_error(actual: f64, predicted: f64) -> Option<f64> {
    if actual.abs() <= ZERO_EPSILON {
        return None;
    }
    Some(((actual - predicted) / actual).abs())
}

/// Mean Absolute Percentage Error as a fraction (0.1 == 10%).
///
/// Pairs whose actual value is zero are skipped. Returns `NaN` when the
/// inputs differ in length or no pair is usable.
pub fn mape(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.len() != predicted.len() {
        return f64::NAN;
    }
    let errors: Vec<f64> = actual
        .iter()
        .zip(predicted)
        .filter_map(|(a, p)| absolute_percentage_error(*a, *p))
        .collect();
    if errors.is_empty() {
        return f64::NAN;
    }
    errors.iter().sum::<f64>() / errors.len() as f64
}

/// Rolling-origin cutoffs, oldest first.
///
/// The last fold ends exactly at the end of the series; earlier folds step
/// back by `period` until the training prefix would be shorter than
/// `initial`, keeping at most `max_folds` folds.
pub fn rolling_origin_cutoffs(
    data_len: usize,
    initial: usize,
    horizon: usize,
    period: usize,
    max_folds: usize,
) -> Vec<usize> {
    let horizon = horizon.max(1);
    let period = period.max(1);
    let mut cutoffs = Vec::new();

    if data_len < initial.saturating_add(horizon) {
        return cutoffs;
    }

    let mut cutoff = data_len - horizon;
    while cutoff >= initial && cutoffs.len() < max_folds {
        cutoffs.push(cutoff);
        if cutoff < period {
            break;
        }
        cutoff -= period;
    }

    cutoffs.reverse();
    cutoffs
}

/// Hold-out horizon for a series of `points` observations: a fixed fraction
/// of its length, never less than one and never more than the series.
pub fn cv_horizon(points: usize, fraction: f64) -> usize {
    ((points as f64 * fraction.clamp(0.0, 1.0)).floor() as usize).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mape_perfect_prediction_is_zero() {
        assert_eq!(mape(&[1.0, 2.0, 4.0], &[1.0, 2.0, 4.0]), 0.0);
    }

    #[test]
    fn mape_skips_zero_actuals() {
        let m = mape(&[0.0, 10.0], &[5.0, 12.0]);
        assert!((m - 0.2).abs() < 1e-12);
    }

    #[test]
    fn mape_of_all_zero_actuals_is_nan() {
        assert!(mape(&[0.0, 0.0], &[1.0, 1.0]).is_nan());
    }

    #[test]
    fn mape_length_mismatch_is_nan() {
        assert!(mape(&[1.0], &[1.0, 2.0]).is_nan());
    }

    #[test]
    fn cutoffs_end_at_series_end_and_step_back() {
        let cutoffs = rolling_origin_cutoffs(100, 30, 10, 5, 100);
        assert_eq!(cutoffs.last(), Some(&90));
        assert_eq!(cutoffs.first(), Some(&30));
        assert!(cutoffs.windows(2).all(|w| w[1] - w[0] == 5));
    }

    #[test]
    fn cutoffs_respect_max_folds() {
        let cutoffs = rolling_origin_cutoffs(100, 30, 10, 5, 3);
        assert_eq!(cutoffs, vec![80, 85, 90]);
    }

    #[test]
    fn cutoffs_empty_when_series_too_short() {
        assert!(rolling_origin_cutoffs(20, 15, 10, 5, 10).is_empty());
    }

    #[test]
    fn horizon_is_monotonic_and_at_least_one() {
        assert_eq!(cv_horizon(0, 0.01), 1);
        assert_eq!(cv_horizon(99, 0.01), 1);
        assert_eq!(cv_horizon(5000, 0.01), 50);
        let mut last = 0;
        for n in (0..20_000).step_by(137) {
            let h = cv_horizon(n, 0.01);
            assert!(h >= last);
            last = h;
        }
    }

    #[test]
    fn oversized_fraction_is_capped_at_series_length() {
        assert_eq!(cv_horizon(40, 1e300), 40);
        assert_eq!(cv_horizon(40, f64::INFINITY), 40);
        assert_eq!(cv_horizon(40, -3.0), 1);
    }

    #[test]
    fn cutoffs_with_huge_horizon_are_empty() {
        assert!(rolling_origin_cutoffs(100, usize::MAX, usize::MAX, 1, 10).is_empty());
    }
}
