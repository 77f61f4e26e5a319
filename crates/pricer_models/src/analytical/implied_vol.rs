//! Implied volatility by bounded Newton-Raphson on the Black-Scholes price.

use pricer_core::math::solvers::{NewtonRaphsonSolver, ParameterBounds, SolverConfig};
use pricer_core::types::OptionType;

use super::black_scholes::{price, vega};

/// Inversion settings.
///
/// Defaults: start at 0.2, clamp every iterate to [0.01, 2.0], at most 20
/// Newton steps.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ImpliedVolConfig {
    /// Starting volatility.
    pub initial_guess: f64,
    /// Lower clamp.
    pub min_vol: f64,
    /// Upper clamp.
    pub max_vol: f64,
    /// Hard cap on Newton steps.
    pub max_iterations: usize,
    /// Stop once `|price(σ) - target|` is below this.
    pub price_tolerance: f64,
}

impl Default for ImpliedVolConfig {
    fn default() -> Self {
        Self {
            initial_guess: 0.2,
            min_vol: 0.01,
            max_vol: 2.0,
            max_iterations: 20,
            price_tolerance: 1e-12,
        }
    }
}

impl ImpliedVolConfig {
    /// The clamp interval.
    pub fn bounds(&self) -> ParameterBounds {
        ParameterBounds::new(self.min_vol, self.max_vol)
    }
}

/// Volatility at which the Black-Scholes price matches `target`.
///
/// Always returns a value inside `[min_vol, max_vol]`. When vega vanishes
/// (far out of the money, or expired) the iteration stops and the current
/// iterate is returned.
///
/// ```
/// use pricer_models::analytical::black_scholes::price;
/// use pricer_models::analytical::implied_vol::{implied_volatility, ImpliedVolConfig};
/// use pricer_core::types::OptionType;
///
/// let target = price(100.0, 105.0, 0.5, 0.05, 0.02, 0.35, OptionType::Call);
/// let iv = implied_volatility(target, 100.0, 105.0, 0.5, 0.05, 0.02, OptionType::Call, &ImpliedVolConfig::default());
/// assert!((iv - 0.35).abs() < 1e-8);
/// ```
#[allow(clippy::too_many_arguments)]
pub fn implied_volatility(
    target: f64,
    spot: f64,
    strike: f64,
    expiry: f64,
    rate: f64,
    dividend: f64,
    option_type: OptionType,
    config: &ImpliedVolConfig,
) -> f64 {
    let solver = NewtonRaphsonSolver::new(SolverConfig {
        tolerance: config.price_tolerance,
        max_iterations: config.max_iterations,
    });
    solver
        .find_root_bounded(
            |sigma| price(spot, strike, expiry, rate, dividend, sigma, option_type) - target,
            |sigma| vega(spot, strike, expiry, rate, dividend, sigma),
            config.initial_guess,
            config.bounds(),
        )
        .x
}
