//! Property tests for quadrature and the bounded optimisers.

use pricer_core::math::quadrature::GaussLegendre;
use pricer_core::math::solvers::{
    projected_lbfgs, within_bounds, Deadline, LbfgsConfig, NewtonRaphsonSolver, ParameterBounds,
    SolverConfig,
};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn gauss_legendre_exact_for_cubics(
        a in -5.0..5.0f64,
        b in -5.0..5.0f64,
        c in -5.0..5.0f64,
        d in -5.0..5.0f64,
    ) {
        let gl = GaussLegendre::new(2).unwrap();
        let f = |x: f64| a * x * x * x + b * x * x + c * x + d;
        let exact = a / 4.0 + b / 3.0 + c / 2.0 + d;
        prop_assert!((gl.integrate(f, 0.0, 1.0) - exact).abs() < 1e-12);
    }

    #[test]
    fn lbfgs_result_stays_in_box(
        cx in -3.0..3.0f64,
        cy in -3.0..3.0f64,
        x0 in -1.0..1.0f64,
        y0 in -1.0..1.0f64,
    ) {
        let bounds = [ParameterBounds::new(-1.0, 1.0), ParameterBounds::new(-1.0, 1.0)];
        let f = |x: &[f64]| (x[0] - cx).powi(2) + 2.0 * (x[1] - cy).powi(2);
        let out = projected_lbfgs(&[x0, y0], &bounds, &LbfgsConfig::default(), Deadline::none(), f).unwrap();
        prop_assert!(within_bounds(&out.params, &bounds));
        let expected = [cx.clamp(-1.0, 1.0), cy.clamp(-1.0, 1.0)];
        prop_assert!((out.params[0] - expected[0]).abs() < 1e-3);
        prop_assert!((out.params[1] - expected[1]).abs() < 1e-3);
    }

    #[test]
    fn bounded_newton_never_leaves_interval(target in -10.0..10.0f64, x0 in -10.0..10.0f64) {
        let solver = NewtonRaphsonSolver::new(SolverConfig::new(1e-12, 20));
        let bounds = ParameterBounds::new(0.01, 2.0);
        let out = solver.find_root_bounded(|x| x.powi(3) - target, |x| 3.0 * x * x, x0, bounds);
        prop_assert!(bounds.contains(out.x));
    }
}
