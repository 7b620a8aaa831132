//! Damped Newton iteration with backtracking line search.

use crate::error::{SolverError, SolverResult};
use crate::jacobian::finite_difference_jacobian;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Fraction of the residual norm a line-search step must shed, per unit
/// step length. Keeps roundoff-level "improvements" from counting as
/// progress when the step direction is degenerate.
const SUFFICIENT_DECREASE: f64 = 1e-4;

/// Relative singular-value cutoff for the least-squares fallback step.
const RANK_CUTOFF: f64 = 1e-12;

/// Newton iteration configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewtonConfig {
    /// Maximum iterations per attempt
    pub max_iterations: usize,
    /// Absolute tolerance for residual norm
    pub abs_tol: f64,
    /// Relative tolerance for residual norm
    pub rel_tol: f64,
    /// Largest allowed step component; bigger steps are scaled down.
    /// Unknowns live in log space, so this bounds amount ratios per step.
    pub step_clamp: f64,
    /// Line search backtracking factor
    pub line_search_beta: f64,
    /// Maximum line search iterations
    pub max_line_search_iters: usize,
    /// Forward-difference perturbation scale
    pub fd_epsilon: f64,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 250,
            abs_tol: 1e-8,
            rel_tol: 1e-13,
            step_clamp: 10.0,
            line_search_beta: 0.5,
            max_line_search_iters: 40,
            fd_epsilon: 1e-7,
        }
    }
}

/// Newton iteration result.
pub struct NewtonResult {
    /// Last iterate
    pub x: DVector<f64>,
    /// Final residual norm
    pub residual_norm: f64,
    /// Number of iterations
    pub iterations: usize,
    /// Converged flag
    pub converged: bool,
    /// Diagnostic for unconverged runs
    pub message: Option<String>,
}

/// Damped Newton on a square residual system.
///
/// Non-convergence (iteration budget, stalled line search) is reported
/// through the `converged` flag, not as an error; errors are reserved for
/// numerical breakdown at the current iterate (non-finite residual at an
/// accepted point). A singular or near-singular Jacobian does not abort:
/// the step falls back to the minimum-norm least-squares direction, which
/// lets the iteration walk out of transient rank deficiency, e.g. rows
/// whose sensitivities are still proportional to a trace amount. Residual
/// failures at *trial* points during the line search just trigger further
/// backtracking, since an overlong step can leave the model's admissible
/// region.
pub fn newton_solve<F>(
    x0: DVector<f64>,
    residual_fn: F,
    config: &NewtonConfig,
) -> SolverResult<NewtonResult>
where
    F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    let mut x = x0;
    let mut r = residual_fn(&x)?;
    let mut r_norm = r.norm();
    let r0_norm = r_norm;

    for iter in 0..=config.max_iterations {
        if !r_norm.is_finite() {
            return Err(SolverError::numerical(format!(
                "non-finite residual norm at iteration {iter}"
            )));
        }
        if r_norm < config.abs_tol || r_norm < config.rel_tol * r0_norm {
            return Ok(NewtonResult {
                x,
                residual_norm: r_norm,
                iterations: iter,
                converged: true,
                message: None,
            });
        }
        if iter == config.max_iterations {
            break;
        }

        let jac = finite_difference_jacobian(&x, &r, &residual_fn, config.fd_epsilon)?;
        let neg_r = -&r;
        let lu_step = jac.clone().lu().solve(&neg_r);
        let mut fallback_used = lu_step.is_none();
        let mut dx = match lu_step {
            Some(dx) => dx,
            None => least_squares_step(&jac, &neg_r)?,
        };

        let accepted = loop {
            clamp_step(&mut dx, config.step_clamp);
            if let Some(hit) = backtrack(&x, &dx, r_norm, &residual_fn, config) {
                break Some(hit);
            }
            if fallback_used {
                break None;
            }
            // An ill-conditioned factorization can produce a direction the
            // line search cannot use; retry once with the least-squares
            // step before giving up.
            fallback_used = true;
            dx = least_squares_step(&jac, &neg_r)?;
        };

        let Some((x_new, r_new, r_new_norm)) = accepted else {
            return Ok(NewtonResult {
                x,
                residual_norm: r_norm,
                iterations: iter,
                converged: false,
                message: Some(format!(
                    "line search stalled at iteration {iter}, residual = {r_norm:.3e}"
                )),
            });
        };

        x = x_new;
        r = r_new;
        r_norm = r_new_norm;
    }

    Ok(NewtonResult {
        x,
        residual_norm: r_norm,
        iterations: config.max_iterations,
        converged: false,
        message: Some(format!(
            "iteration budget {} exhausted, residual = {r_norm:.3e}",
            config.max_iterations
        )),
    })
}

/// Scale the whole step so no component exceeds the clamp.
fn clamp_step(dx: &mut DVector<f64>, limit: f64) {
    let max_component = dx.amax();
    if max_component > limit {
        *dx *= limit / max_component;
    }
}

/// Minimum-norm least-squares step through a rank-revealing SVD. Singular
/// values below the relative cutoff are truncated, so exactly dependent
/// rows and columns contribute nothing instead of blowing up.
fn least_squares_step(jac: &DMatrix<f64>, neg_r: &DVector<f64>) -> SolverResult<DVector<f64>> {
    let svd = jac.clone().svd(true, true);
    let cutoff = svd.singular_values.max() * RANK_CUTOFF;
    svd.solve(neg_r, cutoff)
        .map_err(|e| SolverError::numerical(format!("least-squares step: {e}")))
}

/// Backtracking line search: accept the first step that evaluates cleanly
/// and sheds a sufficient fraction of the residual norm.
fn backtrack<F>(
    x: &DVector<f64>,
    dx: &DVector<f64>,
    r_norm: f64,
    residual_fn: &F,
    config: &NewtonConfig,
) -> Option<(DVector<f64>, DVector<f64>, f64)>
where
    F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    let mut alpha = 1.0_f64;
    for _ in 0..config.max_line_search_iters {
        let x_trial = x + alpha * dx;
        if let Ok(r_trial) = residual_fn(&x_trial) {
            let r_trial_norm = r_trial.norm();
            if r_trial_norm.is_finite()
                && r_trial_norm < r_norm * (1.0 - SUFFICIENT_DECREASE * alpha)
            {
                return Some((x_trial, r_trial, r_trial_norm));
            }
        }
        alpha *= config.line_search_beta;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_quadratic() {
        // Solve x^2 - 4 = 0 from x = 3
        let residual = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_element(1, x[0] * x[0] - 4.0))
        };

        let x0 = DVector::from_element(1, 3.0);
        let result = newton_solve(x0, residual, &NewtonConfig::default()).unwrap();
        assert!(result.converged);
        assert!((result.x[0] - 2.0).abs() < 1e-7);
    }

    #[test]
    fn coupled_exponential_system() {
        // r = [exp(x0) - 2, x0 + x1 - 1]
        let residual = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_vec(vec![x[0].exp() - 2.0, x[0] + x[1] - 1.0]))
        };

        let x0 = DVector::zeros(2);
        let result = newton_solve(x0, residual, &NewtonConfig::default()).unwrap();
        assert!(result.converged);
        assert!((result.x[0] - (2.0_f64).ln()).abs() < 1e-7);
        assert!((result.x[1] - (1.0 - (2.0_f64).ln())).abs() < 1e-7);
    }

    #[test]
    fn warm_start_converges_without_iterating() {
        let residual = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_element(1, x[0] * x[0] - 4.0))
        };

        let x0 = DVector::from_element(1, 2.0);
        let result = newton_solve(x0, residual, &NewtonConfig::default()).unwrap();
        assert!(result.converged);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn budget_exhaustion_is_not_an_error() {
        let residual = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_element(1, x[0] * x[0] - 4.0))
        };

        let config = NewtonConfig {
            max_iterations: 0,
            ..NewtonConfig::default()
        };
        let result = newton_solve(DVector::from_element(1, 3.0), residual, &config).unwrap();
        assert!(!result.converged);
        assert!(result.message.is_some());
    }

    #[test]
    fn rank_deficient_jacobian_takes_a_least_squares_step() {
        // Both rows read only x0, so the x1 column is identically zero and
        // the LU factorization fails. The minimum-norm step still solves
        // the consistent part and leaves x1 alone.
        let residual = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_vec(vec![x[0] - 1.0, x[0] - 1.0]))
        };

        let x0 = DVector::from_vec(vec![3.0, 7.0]);
        let result = newton_solve(x0, residual, &NewtonConfig::default()).unwrap();
        assert!(result.converged);
        assert!((result.x[0] - 1.0).abs() < 1e-7);
        assert!((result.x[1] - 7.0).abs() < 1e-12);
    }

    #[test]
    fn inconsistent_system_reports_stall() {
        // No root: r = [x0, x0 - 1]... made square by duplicating the unknown
        // is singular; use r = [x0^2 + 1] instead (minimum above zero).
        let residual = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_element(1, x[0] * x[0] + 1.0))
        };

        let result = newton_solve(DVector::from_element(1, 3.0), residual, &NewtonConfig::default());
        match result {
            Ok(r) => assert!(!r.converged),
            Err(SolverError::Numerical { .. }) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
}
