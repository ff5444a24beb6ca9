//! Dense weighted least squares for the small systems the models solve.

use super::ModelError;

/// Solve `a * x = b` in place by Gaussian elimination with partial pivoting.
///
/// `a` is row-major `n x n`.
pub fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>, ModelError> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return Err(ModelError::Numerical("dimension mismatch".to_string()));
    }

    let scale = a
        .iter()
        .enumerate()
        .map(|(i, row)| row[i].abs())
        .fold(0.0_f64, f64::max)
        .max(1.0);

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot_row][col].abs() <= 1e-12 * scale {
            return Err(ModelError::Numerical("singular normal matrix".to_string()));
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }

    if x.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::Numerical("non-finite solution".to_string()));
    }
    Ok(x)
}

/// Weighted ridge regression: minimise `sum w_i (y_i - x_i . beta)^2 +
/// sum_j penalty_j * beta_j^2`.
pub fn weighted_ridge(
    design: &[Vec<f64>],
    targets: &[f64],
    weights: &[f64],
    penalty: &[f64],
) -> Result<Vec<f64>, ModelError> {
    let p = penalty.len();
    let mut xtx = vec![vec![0.0; p]; p];
    let mut xty = vec![0.0; p];

    for ((row, &y), &w) in design.iter().zip(targets).zip(weights) {
        for i in 0..p {
            let wi = w * row[i];
            xty[i] += wi * y;
            for j in i..p {
                xtx[i][j] += wi * row[j];
            }
        }
    }
    for i in 0..p {
        for j in 0..i {
            xtx[i][j] = xtx[j][i];
        }
        xtx[i][i] += penalty[i];
    }

    solve(xtx, xty)
}
