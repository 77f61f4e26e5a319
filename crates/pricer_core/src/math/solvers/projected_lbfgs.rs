//! Limited-memory BFGS with projection onto box constraints.
//!
//! Gradients come from one-sided finite differences that never leave the
//! box. Variables sitting on a bound with the gradient pushing outward are
//! frozen for the iteration; the quasi-Newton direction is built from the
//! remaining free components and each trial point is projected back into
//! the box before the Armijo test.

use super::bounds::project;
use super::{Deadline, OptimisationResult, ParameterBounds, Termination};
use crate::types::SolverError;
use std::collections::VecDeque;
use tracing::{debug, trace};

/// Settings for [`projected_lbfgs`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LbfgsConfig {
    /// Hard cap on outer iterations.
    pub max_iterations: usize,
    /// Number of correction pairs kept.
    pub memory: usize,
    /// Stop when the projected gradient's max-norm drops below this.
    pub gradient_tolerance: f64,
    /// Stop when `(f_k - f_{k+1}) / max(|f_k|, |f_{k+1}|, 1)` drops below this.
    pub function_tolerance: f64,
    /// Relative finite-difference step.
    pub fd_step: f64,
    /// Maximum step halvings per line search.
    pub max_line_search: usize,
    /// Sufficient-decrease constant.
    pub armijo: f64,
}

impl Default for LbfgsConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            memory: 10,
            gradient_tolerance: 1e-5,
            function_tolerance: 2.220446049250313e-9,
            fd_step: 1.4901161193847656e-8,
            max_line_search: 20,
            armijo: 1e-4,
        }
    }
}

struct Correction {
    s: Vec<f64>,
    y: Vec<f64>,
    rho: f64,
}

#[inline]
fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline]
fn max_norm(v: &[f64]) -> f64 {
    v.iter().fold(0.0_f64, |m, x| m.max(x.abs()))
}

fn finite_difference_gradient<F>(
    x: &[f64],
    fx: f64,
    bounds: &[ParameterBounds],
    rel_step: f64,
    objective: &mut F,
    evaluations: &mut usize,
) -> Vec<f64>
where
    F: FnMut(&[f64]) -> f64,
{
    let mut probe = x.to_vec();
    let mut grad = vec![0.0; x.len()];

    for i in 0..x.len() {
        let h = rel_step * x[i].abs().max(1.0);
        let forward = x[i] + h <= bounds[i].max;
        probe[i] = if forward { x[i] + h } else { x[i] - h };
        let step = probe[i] - x[i];
        if step != 0.0 {
            let fp = objective(&probe);
            *evaluations += 1;
            let g = (fp - fx) / step;
            grad[i] = if g.is_finite() { g } else { 0.0 };
        }
        probe[i] = x[i];
    }
    grad
}

/// Components frozen on a bound: at the lower bound with `g > 0` or at the
/// upper bound with `g < 0`.
fn active_set(x: &[f64], g: &[f64], bounds: &[ParameterBounds]) -> Vec<bool> {
    x.iter()
        .zip(g)
        .zip(bounds)
        .map(|((&xi, &gi), b)| (xi <= b.min && gi > 0.0) || (xi >= b.max && gi < 0.0))
        .collect()
}

/// `x - P(x - g)`, zero exactly at a KKT point of the box problem.
fn projected_gradient(x: &[f64], g: &[f64], bounds: &[ParameterBounds]) -> Vec<f64> {
    x.iter()
        .zip(g)
        .zip(bounds)
        .map(|((&xi, &gi), b)| xi - b.clamp(xi - gi))
        .collect()
}

/// Two-loop recursion returning `-H g`.
fn two_loop(g: &[f64], history: &VecDeque<Correction>) -> Vec<f64> {
    let mut q = g.to_vec();
    let mut alphas = Vec::with_capacity(history.len());

    for c in history.iter().rev() {
        let a = c.rho * dot(&c.s, &q);
        q.iter_mut().zip(&c.y).for_each(|(qi, yi)| *qi -= a * yi);
        alphas.push(a);
    }

    if let Some(last) = history.back() {
        let yy = dot(&last.y, &last.y);
        if yy > 0.0 {
            let gamma = dot(&last.s, &last.y) / yy;
            q.iter_mut().for_each(|qi| *qi *= gamma);
        }
    }

    for (c, a) in history.iter().zip(alphas.iter().rev()) {
        let b = c.rho * dot(&c.y, &q);
        q.iter_mut().zip(&c.s).for_each(|(qi, si)| *qi += (a - b) * si);
    }

    q.iter_mut().for_each(|qi| *qi = -*qi);
    q
}

/// Minimise `objective` over the box `bounds` starting from `x0`.
///
/// The start point is projected into the box first. The returned point is
/// always the best one evaluated.
///
/// # Errors
///
/// * `InvalidProblem` - empty problem, length mismatch, or non-finite bounds
/// * `NumericalInstability` - objective is not finite at the start point
///
/// # Example
///
/// ```
/// use pricer_core::math::solvers::{projected_lbfgs, Deadline, LbfgsConfig, ParameterBounds};
///
/// // Bowl centred at (2, -1); the box cuts it off at x0 <= 1.
/// let bounds = [ParameterBounds::new(-1.0, 1.0), ParameterBounds::new(-3.0, 3.0)];
/// let bowl = |x: &[f64]| (x[0] - 2.0).powi(2) + (x[1] + 1.0).powi(2);
/// let out = projected_lbfgs(&[0.0, 0.0], &bounds, &LbfgsConfig::default(), Deadline::none(), bowl)
///     .unwrap();
/// assert_eq!(out.params[0], 1.0);
/// assert!((out.params[1] + 1.0).abs() < 1e-4);
/// ```
pub fn projected_lbfgs<F>(
    x0: &[f64],
    bounds: &[ParameterBounds],
    config: &LbfgsConfig,
    deadline: Deadline,
    mut objective: F,
) -> Result<OptimisationResult, SolverError>
where
    F: FnMut(&[f64]) -> f64,
{
    if x0.is_empty() || x0.len() != bounds.len() {
        return Err(SolverError::InvalidProblem(format!(
            "start point has {} coordinates, bounds have {}",
            x0.len(),
            bounds.len()
        )));
    }
    if bounds.iter().any(|b| !b.is_valid()) {
        return Err(SolverError::InvalidProblem(
            "bounds must be finite with min <= max".to_string(),
        ));
    }

    let n = x0.len();
    let mut x = project(x0, bounds);
    let mut fx = objective(&x);
    let mut evaluations = 1;
    if !fx.is_finite() {
        return Err(SolverError::NumericalInstability(format!(
            "objective is {fx} at the start point"
        )));
    }

    let mut g = finite_difference_gradient(&x, fx, bounds, config.fd_step, &mut objective, &mut evaluations);
    let mut history: VecDeque<Correction> = VecDeque::with_capacity(config.memory);
    let mut termination = Termination::MaxIterations;
    let mut iterations = 0;

    while iterations < config.max_iterations {
        if deadline.expired() {
            termination = Termination::DeadlineExceeded;
            break;
        }

        if max_norm(&projected_gradient(&x, &g, bounds)) < config.gradient_tolerance {
            termination = Termination::GradientTolerance;
            break;
        }
        iterations += 1;

        let active = active_set(&x, &g, bounds);
        let reduced: Vec<f64> = g
            .iter()
            .zip(&active)
            .map(|(&gi, &a)| if a { 0.0 } else { gi })
            .collect();

        let mut d = two_loop(&reduced, &history);
        d.iter_mut().zip(&active).for_each(|(di, &a)| {
            if a {
                *di = 0.0;
            }
        });
        if !(dot(&d, &reduced) < 0.0) {
            // Curvature pairs gave an ascent direction; restart from steepest descent.
            history.clear();
            d = reduced.iter().map(|gi| -gi).collect();
        }

        let mut step = if history.is_empty() {
            (1.0 / dot(&d, &d).sqrt()).min(1.0)
        } else {
            1.0
        };

        let mut accepted = None;
        for _ in 0..=config.max_line_search {
            let trial: Vec<f64> = x
                .iter()
                .zip(&d)
                .zip(bounds)
                .map(|((&xi, &di), b)| b.clamp(xi + step * di))
                .collect();
            let moved: Vec<f64> = trial.iter().zip(&x).map(|(t, xi)| t - xi).collect();
            if max_norm(&moved) == 0.0 {
                break;
            }

            let ft = objective(&trial);
            evaluations += 1;
            if ft.is_finite() && ft <= fx + config.armijo * dot(&g, &moved) {
                accepted = Some((trial, ft, moved));
                break;
            }
            step *= 0.5;
        }

        let Some((x_new, f_new, s)) = accepted else {
            if history.is_empty() {
                termination = Termination::LineSearchFailed;
                break;
            }
            trace!(iteration = iterations, "line search failed, dropping curvature history");
            history.clear();
            continue;
        };

        let g_new = finite_difference_gradient(&x_new, f_new, bounds, config.fd_step, &mut objective, &mut evaluations);
        let y: Vec<f64> = g_new.iter().zip(&g).map(|(a, b)| a - b).collect();
        let sy = dot(&s, &y);
        if sy > 1e-12 * dot(&y, &y).max(f64::MIN_POSITIVE) {
            if history.len() == config.memory.max(1) {
                history.pop_front();
            }
            history.push_back(Correction { s, y, rho: 1.0 / sy });
        }

        let reduction = (fx - f_new) / fx.abs().max(f_new.abs()).max(1.0);
        trace!(iteration = iterations, value = f_new, step, "projected L-BFGS step");
        x = x_new;
        fx = f_new;
        g = g_new;

        if reduction <= config.function_tolerance {
            termination = Termination::FunctionTolerance;
            break;
        }
    }

    debug!(
        iterations,
        evaluations,
        value = fx,
        termination = %termination,
        dimension = n,
        "projected L-BFGS finished"
    );

    Ok(OptimisationResult {
        params: x,
        value: fx,
        iterations,
        evaluations,
        termination,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::time::Duration;

    fn quadratic(x: &[f64]) -> f64 {
        (x[0] - 0.3).powi(2) + 4.0 * (x[1] + 0.2).powi(2)
    }

    #[test]
    fn test_unconstrained_minimum_inside_box() {
        let bounds = [ParameterBounds::new(-1.0, 1.0), ParameterBounds::new(-1.0, 1.0)];
        let out = projected_lbfgs(&[0.9, 0.9], &bounds, &LbfgsConfig::default(), Deadline::none(), quadratic)
            .unwrap();
        assert!(out.converged());
        assert_relative_eq!(out.params[0], 0.3, epsilon = 1e-4);
        assert_relative_eq!(out.params[1], -0.2, epsilon = 1e-4);
    }

    #[test]
    fn test_minimum_on_bound() {
        // Free minimum at (0.3, -0.2); the box forces x1 >= 0.
        let bounds = [ParameterBounds::new(-1.0, 1.0), ParameterBounds::new(0.0, 1.0)];
        let out = projected_lbfgs(&[-0.5, 0.7], &bounds, &LbfgsConfig::default(), Deadline::none(), quadratic)
            .unwrap();
        assert!(out.converged());
        assert_relative_eq!(out.params[0], 0.3, epsilon = 1e-4);
        assert_eq!(out.params[1], 0.0);
    }

    #[test]
    fn test_start_outside_box_is_projected() {
        let bounds = [ParameterBounds::new(0.0, 1.0), ParameterBounds::new(-1.0, 1.0)];
        let out = projected_lbfgs(&[5.0, -5.0], &bounds, &LbfgsConfig::default(), Deadline::none(), quadratic)
            .unwrap();
        assert!(bounds.iter().zip(&out.params).all(|(b, &v)| b.contains(v)));
    }

    #[test]
    fn test_iteration_cap() {
        let bounds = [ParameterBounds::new(-2.0, 2.0), ParameterBounds::new(-2.0, 2.0)];
        let config = LbfgsConfig {
            max_iterations: 2,
            ..LbfgsConfig::default()
        };
        let rosen = |x: &[f64]| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2);
        let out = projected_lbfgs(&[-1.2, 1.0], &bounds, &config, Deadline::none(), rosen).unwrap();
        assert_eq!(out.iterations, 2);
        assert_eq!(out.termination, Termination::MaxIterations);
        assert!(!out.converged());
    }

    #[test]
    fn test_expired_deadline() {
        let bounds = [ParameterBounds::new(-1.0, 1.0), ParameterBounds::new(-1.0, 1.0)];
        let out = projected_lbfgs(
            &[0.9, 0.9],
            &bounds,
            &LbfgsConfig::default(),
            Deadline::after(Duration::ZERO),
            quadratic,
        )
        .unwrap();
        assert_eq!(out.termination, Termination::DeadlineExceeded);
        assert_eq!(out.iterations, 0);
    }

    #[test]
    fn test_invalid_problem() {
        let bounds = [ParameterBounds::new(-1.0, 1.0)];
        let err = projected_lbfgs(&[0.0, 0.0], &bounds, &LbfgsConfig::default(), Deadline::none(), |_| 0.0)
            .unwrap_err();
        assert!(matches!(err, SolverError::InvalidProblem(_)));

        let err = projected_lbfgs(&[0.0], &bounds, &LbfgsConfig::default(), Deadline::none(), |_| f64::NAN)
            .unwrap_err();
        assert!(matches!(err, SolverError::NumericalInstability(_)));
    }
}
