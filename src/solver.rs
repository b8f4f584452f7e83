use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};

use crate::error::{AalenError, Result};

// pivots below this are treated as a singular system
const SINGULAR_PIVOT: f64 = 1e-12;

/// one penalized least squares step
///
/// `coef` solves min ||X b - y||^2 + c1 ||b||^2 + c2 ||b - offset||^2 and
/// `hat` is (X^T X + (c1 + c2) I)^-1 X^T, whose columns carry the per-subject
/// leverage used for the variance of the step.
#[derive(Debug, Clone)]
pub(crate) struct RidgeStep {
    pub coef: Array1<f64>,
    pub hat: Array2<f64>,
}

/// ridge regression around a moving offset
///
/// c1 shrinks the coefficient magnitude, c2 shrinks the change relative to
/// `offset` (the previous step's estimate). With both at zero this is plain
/// least squares and fails on a singular normal system; any positive penalty
/// keeps the system well-defined.
pub(crate) fn ridge_regression(
    x: ArrayView2<f64>,
    y: ArrayView1<f64>,
    c1: f64,
    c2: f64,
    offset: ArrayView1<f64>,
) -> Result<RidgeStep> {
    let (n, d) = x.dim();
    let xt = x.t();

    let mut gram = xt.dot(&x);
    for j in 0..d {
        gram[[j, j]] += c1 + c2;
    }

    // solve against all right-hand sides at once: the n columns of X^T give
    // the hat matrix, the extra column gives the coefficient estimate
    let mut rhs = Array2::zeros((d, n + 1));
    rhs.slice_mut(s![.., ..n]).assign(&xt);
    let target = xt.dot(&y) + offset.mapv(|o| c2 * o);
    rhs.column_mut(n).assign(&target);

    solve_in_place(&mut gram, &mut rhs)?;

    Ok(RidgeStep {
        coef: rhs.column(n).to_owned(),
        hat: rhs.slice(s![.., ..n]).to_owned(),
    })
}

/// Gaussian elimination with partial pivoting, solving A X = B in place
/// (the solution lands in `b`)
fn solve_in_place(a: &mut Array2<f64>, b: &mut Array2<f64>) -> Result<()> {
    let d = a.nrows();
    let m = b.ncols();

    for i in 0..d {
        // find pivot
        let mut max_row = i;
        for k in i + 1..d {
            if a[[k, i]].abs() > a[[max_row, i]].abs() {
                max_row = k;
            }
        }

        if a[[max_row, i]].abs() < SINGULAR_PIVOT {
            return Err(AalenError::linear_algebra("normal system is singular"));
        }

        if max_row != i {
            for j in 0..d {
                a.swap([i, j], [max_row, j]);
            }
            for j in 0..m {
                b.swap([i, j], [max_row, j]);
            }
        }

        // eliminate below the pivot
        for k in i + 1..d {
            let factor = a[[k, i]] / a[[i, i]];
            for j in i..d {
                a[[k, j]] -= factor * a[[i, j]];
            }
            for j in 0..m {
                b[[k, j]] -= factor * b[[i, j]];
            }
        }
    }

    // back substitution, one right-hand side at a time
    for col in 0..m {
        for i in (0..d).rev() {
            let mut value = b[[i, col]];
            for j in i + 1..d {
                value -= a[[i, j]] * b[[j, col]];
            }
            b[[i, col]] = value / a[[i, i]];
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_unpenalized_recovers_exact_solution() {
        // X is square and well-conditioned, so b = X^-1 y
        let x = array![[2.0, 0.0], [0.0, 4.0]];
        let y = array![2.0, 8.0];
        let offset = Array1::zeros(2);

        let step = ridge_regression(x.view(), y.view(), 0.0, 0.0, offset.view()).unwrap();
        assert_relative_eq!(step.coef[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(step.coef[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_hat_matrix_shape_and_content() {
        let x = array![[1.0, 0.0], [0.0, 1.0], [0.0, 0.0]];
        let y = array![1.0, 1.0, 0.0];
        let offset = Array1::zeros(2);

        let step = ridge_regression(x.view(), y.view(), 0.0, 0.0, offset.view()).unwrap();
        assert_eq!(step.hat.dim(), (2, 3));
        // with X^T X = I the hat matrix is just X^T
        assert_relative_eq!(step.hat[[0, 0]], 1.0, epsilon = 1e-12);
        assert_relative_eq!(step.hat[[1, 1]], 1.0, epsilon = 1e-12);
        assert_relative_eq!(step.hat[[0, 2]], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_coef_penalty_shrinks_towards_zero() {
        let x = array![[1.0], [1.0]];
        let y = array![1.0, 1.0];
        let offset = Array1::zeros(1);

        let free = ridge_regression(x.view(), y.view(), 0.0, 0.0, offset.view()).unwrap();
        let shrunk = ridge_regression(x.view(), y.view(), 10.0, 0.0, offset.view()).unwrap();
        assert_relative_eq!(free.coef[0], 1.0, epsilon = 1e-12);
        assert!(shrunk.coef[0].abs() < free.coef[0].abs());
        // (x^T x + c1) b = x^T y  =>  b = 2 / 12
        assert_relative_eq!(shrunk.coef[0], 2.0 / 12.0, epsilon = 1e-12);
    }

    #[test]
    fn test_smoothing_penalty_pulls_towards_offset() {
        // all rows zeroed out (everyone has exited): the estimate is driven
        // entirely by the offset term, b = c2 / (c1 + c2) * offset
        let x = Array2::zeros((3, 2));
        let y = Array1::zeros(3);
        let offset = array![1.0, -2.0];

        let step = ridge_regression(x.view(), y.view(), 0.0, 1.0, offset.view()).unwrap();
        assert_relative_eq!(step.coef[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(step.coef[1], -2.0, epsilon = 1e-12);
        // no active subjects means no variance contribution
        assert!(step.hat.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_singular_system_fails_without_penalty() {
        // duplicated column makes X^T X rank deficient
        let x = array![[1.0, 1.0], [2.0, 2.0]];
        let y = array![1.0, 0.0];
        let offset = Array1::zeros(2);

        let result = ridge_regression(x.view(), y.view(), 0.0, 0.0, offset.view());
        assert!(matches!(result, Err(AalenError::LinearAlgebra { .. })));

        // any positive penalty regularizes it
        assert!(ridge_regression(x.view(), y.view(), 0.1, 0.0, offset.view()).is_ok());
        assert!(ridge_regression(x.view(), y.view(), 0.0, 0.1, offset.view()).is_ok());
    }
}
