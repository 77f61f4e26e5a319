//! Newton-Raphson root finding.

use super::{ParameterBounds, SolverConfig};
use num_traits::Float;

/// Outcome of a bounded Newton run.
///
/// The bounded variant always yields an iterate; `converged` says whether
/// the residual met the tolerance before the iteration cap or a flat
/// derivative stopped it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundedRoot<T> {
    /// Final iterate (always inside the bounds)
    pub x: T,
    /// Newton steps taken
    pub iterations: usize,
    /// Whether `|f(x)| < tolerance` was reached
    pub converged: bool,
}

/// Newton-Raphson root finder.
///
/// Uses `x_{n+1} = x_n - f(x_n) / f'(x_n)`.
#[derive(Debug, Clone)]
pub struct NewtonRaphsonSolver<T: Float> {
    config: SolverConfig<T>,
}

impl<T: Float> NewtonRaphsonSolver<T> {
    /// Create a new solver with the given configuration.
    pub fn new(config: SolverConfig<T>) -> Self {
        Self { config }
    }

    /// Derivatives smaller than this stop the iteration.
    fn flat_derivative() -> T {
        T::from(1e-30).unwrap_or_else(T::min_positive_value)
    }
}

impl NewtonRaphsonSolver<f64> {
    /// Newton iteration with every iterate projected onto `bounds`.
    ///
    /// Never fails: a flat derivative or an exhausted cap ends the run and
    /// the last in-bounds iterate is returned with `converged = false`.
    /// A non-finite step leaves the iterate where it was.
    ///
    /// ```
    /// use pricer_core::math::solvers::{NewtonRaphsonSolver, ParameterBounds, SolverConfig};
    ///
    /// let solver = NewtonRaphsonSolver::new(SolverConfig::new(1e-12, 20));
    /// let bounds = ParameterBounds::new(0.01, 2.0);
    ///
    /// // Root at 3.0 lies outside the box: the iterate parks on the upper bound.
    /// let out = solver.find_root_bounded(|x| x - 3.0, |_| 1.0, 0.2, bounds);
    /// assert_eq!(out.x, 2.0);
    /// assert!(!out.converged);
    /// ```
    pub fn find_root_bounded<F, G>(
        &self,
        f: F,
        f_prime: G,
        x0: f64,
        bounds: ParameterBounds,
    ) -> BoundedRoot<f64>
    where
        F: Fn(f64) -> f64,
        G: Fn(f64) -> f64,
    {
        let mut x = bounds.clamp(x0);
        let epsilon = Self::flat_derivative();

        for iteration in 0..self.config.max_iterations {
            let f_val = f(x);
            if f_val.abs() < self.config.tolerance {
                return BoundedRoot {
                    x,
                    iterations: iteration,
                    converged: true,
                };
            }

            let f_prime_val = f_prime(x);
            if !(f_prime_val.abs() >= epsilon) {
                return BoundedRoot {
                    x,
                    iterations: iteration,
                    converged: false,
                };
            }

            let next = x - f_val / f_prime_val;
            if next.is_finite() {
                x = bounds.clamp(next);
            }
        }

        BoundedRoot {
            x,
            iterations: self.config.max_iterations,
            converged: f(x).abs() < self.config.tolerance,
        }
    }
}
