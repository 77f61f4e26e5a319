//! Gauss-Legendre quadrature.
//!
//! [`GaussLegendre`] holds the nodes and weights of an n-point rule on
//! [-1, 1]. [`CompositeRule`] maps one rule onto a sequence of panels and
//! flattens the result into a single list of abscissae and weights, so an
//! integrand can be tabulated once and reused for many weightings (one per
//! strike in the Fourier pricer).
//!
//! ```
//! use pricer_core::math::quadrature::CompositeRule;
//!
//! let rule = CompositeRule::new(&[0.0, 1.0, 3.0], 8).unwrap();
//! let area = rule.integrate(|x| x * x);
//! assert!((area - 9.0).abs() < 1e-12);
//! ```

use crate::types::SolverError;
use std::f64::consts::PI;

const NEWTON_MAX_ITER: usize = 100;
const NEWTON_TOL: f64 = 1e-15;

/// Legendre polynomial P_n(x) and its derivative by the three-term recurrence.
fn legendre_with_derivative(n: usize, x: f64) -> (f64, f64) {
    let mut p0 = 1.0;
    let mut p1 = x;
    for k in 2..=n {
        let k = k as f64;
        let p2 = ((2.0 * k - 1.0) * x * p1 - (k - 1.0) * p0) / k;
        p0 = p1;
        p1 = p2;
    }
    let n = n as f64;
    let dp = n * (x * p1 - p0) / (x * x - 1.0);
    (p1, dp)
}

/// n-point Gauss-Legendre rule on [-1, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct GaussLegendre {
    nodes: Vec<f64>,
    weights: Vec<f64>,
}

impl GaussLegendre {
    /// Compute the rule by Newton iteration on P_n.
    ///
    /// # Errors
    ///
    /// `SolverError::InvalidProblem` when `n < 2`.
    pub fn new(n: usize) -> Result<Self, SolverError> {
        if n < 2 {
            return Err(SolverError::InvalidProblem(format!(
                "Gauss-Legendre order must be >= 2, got {n}"
            )));
        }

        let mut nodes = vec![0.0; n];
        let mut weights = vec![0.0; n];
        let nf = n as f64;

        for i in 0..n.div_ceil(2) {
            let mut z = (PI * (i as f64 + 0.75) / (nf + 0.5)).cos();
            for _ in 0..NEWTON_MAX_ITER {
                let (p, dp) = legendre_with_derivative(n, z);
                let dz = p / dp;
                z -= dz;
                if dz.abs() < NEWTON_TOL {
                    break;
                }
            }
            let (_, dp) = legendre_with_derivative(n, z);
            let w = 2.0 / ((1.0 - z * z) * dp * dp);

            nodes[i] = -z;
            nodes[n - 1 - i] = z;
            weights[i] = w;
            weights[n - 1 - i] = w;
        }

        Ok(Self { nodes, weights })
    }

    /// Number of points.
    pub fn order(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes on [-1, 1], ascending.
    pub fn nodes(&self) -> &[f64] {
        &self.nodes
    }

    /// Weights matching [`GaussLegendre::nodes`].
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Integrate `f` over `[a, b]`.
    pub fn integrate<F: Fn(f64) -> f64>(&self, f: F, a: f64, b: f64) -> f64 {
        let half = 0.5 * (b - a);
        let mid = 0.5 * (b + a);
        half * self
            .nodes
            .iter()
            .zip(&self.weights)
            .map(|(&x, &w)| w * f(half * x + mid))
            .sum::<f64>()
    }
}

/// Gauss-Legendre rule applied panel by panel over `[breaks[0], breaks[last]]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeRule {
    points: Vec<f64>,
    weights: Vec<f64>,
}

impl CompositeRule {
    /// Build from panel breakpoints and a per-panel order.
    ///
    /// # Errors
    ///
    /// `SolverError::InvalidProblem` when fewer than two breakpoints are
    /// given, the breakpoints are not strictly increasing, or `order < 2`.
    pub fn new(breaks: &[f64], order: usize) -> Result<Self, SolverError> {
        if breaks.len() < 2 {
            return Err(SolverError::InvalidProblem(
                "composite rule needs at least one panel".to_string(),
            ));
        }
        if breaks.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(SolverError::InvalidProblem(
                "panel breakpoints must be strictly increasing".to_string(),
            ));
        }

        let base = GaussLegendre::new(order)?;
        let panels = breaks.len() - 1;
        let mut points = Vec::with_capacity(panels * order);
        let mut weights = Vec::with_capacity(panels * order);

        for w in breaks.windows(2) {
            let half = 0.5 * (w[1] - w[0]);
            let mid = 0.5 * (w[1] + w[0]);
            for (&x, &wt) in base.nodes().iter().zip(base.weights()) {
                points.push(half * x + mid);
                weights.push(half * wt);
            }
        }

        Ok(Self { points, weights })
    }

    /// Abscissae across all panels, ascending.
    pub fn points(&self) -> &[f64] {
        &self.points
    }

    /// Weights matching [`CompositeRule::points`] (already scaled to panel width).
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Total number of abscissae.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false for a constructed rule.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Integrate `f` over the covered interval.
    pub fn integrate<F: Fn(f64) -> f64>(&self, f: F) -> f64 {
        self.points
            .iter()
            .zip(&self.weights)
            .map(|(&x, &w)| w * f(x))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_weights_sum_to_two() {
        for n in [2, 5, 16, 32] {
            let gl = GaussLegendre::new(n).unwrap();
            assert_relative_eq!(gl.weights().iter().sum::<f64>(), 2.0, epsilon = 1e-13);
        }
    }

    #[test]
    fn test_nodes_ascending_and_symmetric() {
        let gl = GaussLegendre::new(7).unwrap();
        assert!(gl.nodes().windows(2).all(|w| w[0] < w[1]));
        assert_relative_eq!(gl.nodes()[3], 0.0, epsilon = 1e-15);
        assert_relative_eq!(gl.nodes()[0], -gl.nodes()[6], epsilon = 1e-15);
    }

    #[test]
    fn test_exact_for_polynomials() {
        // An n-point rule is exact up to degree 2n - 1.
        let gl = GaussLegendre::new(4).unwrap();
        assert_relative_eq!(gl.integrate(|x| x.powi(7), 0.0, 1.0), 0.125, epsilon = 1e-14);
        assert_relative_eq!(gl.integrate(|x| x.powi(5), -1.0, 1.0), 0.0, epsilon = 1e-14);
    }

    #[test]
    fn test_composite_smooth_integrand() {
        let rule = CompositeRule::new(&[0.0, 0.5, 1.0, 2.0, 4.0, 8.0], 16).unwrap();
        assert_eq!(rule.len(), 80);
        let exact = 1.0 - (-8.0_f64).exp();
        assert_relative_eq!(rule.integrate(|x| (-x).exp()), exact, epsilon = 1e-13);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(GaussLegendre::new(1).is_err());
        assert!(CompositeRule::new(&[0.0], 8).is_err());
        assert!(CompositeRule::new(&[0.0, 1.0, 1.0], 8).is_err());
        assert!(CompositeRule::new(&[0.0, f64::NAN], 8).is_err());
    }
}
