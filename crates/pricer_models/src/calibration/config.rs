//! Calibration and quality-control settings.

use std::time::Duration;

use pricer_core::math::solvers::{DifferentialEvolutionConfig, LbfgsConfig};

use super::error::CalibrationError;
use crate::models::HestonBounds;
use crate::pricing::PricingConfig;

/// Thresholds of the quality-control gate.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct QcConfig {
    /// Minimum RMSE improvement relative to the prior fit (0.02 = 2%).
    pub min_relative_improvement: f64,
    /// Minimum absolute RMSE improvement in vol points (0.002).
    pub min_absolute_improvement: f64,
    /// A butterfly `C1 - 2 C2 + C3` below `-butterfly_tolerance` is a violation.
    pub butterfly_tolerance: f64,
    /// More violations than this reject the fit.
    pub max_arbitrage_violations: usize,
    /// A bucket fails when its RMSE exceeds this multiple of the prior RMSE.
    pub local_rmse_multiplier: f64,
    /// Buckets with fewer quotes are skipped.
    pub min_bucket_quotes: usize,
    /// Log-moneyness `ln(K/S)` bucket edges, inclusive.
    pub moneyness_buckets: Vec<[f64; 2]>,
    /// Days-to-expiry bucket edges, inclusive.
    pub dte_buckets: Vec<[f64; 2]>,
}

impl Default for QcConfig {
    fn default() -> Self {
        Self {
            min_relative_improvement: 0.02,
            min_absolute_improvement: 0.002,
            butterfly_tolerance: 0.01,
            max_arbitrage_violations: 5,
            local_rmse_multiplier: 1.25,
            min_bucket_quotes: 3,
            moneyness_buckets: vec![
                [-0.09, -0.06],
                [-0.06, -0.03],
                [-0.03, 0.03],
                [0.03, 0.06],
                [0.06, 0.09],
            ],
            dte_buckets: vec![[10.0, 20.0], [20.0, 35.0], [35.0, 50.0]],
        }
    }
}

/// Settings for [`super::HestonCalibrator`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CalibrationConfig {
    /// Parameter search box.
    pub bounds: HestonBounds,
    /// Exponent applied to normalised volume weights.
    pub liquid_bias: f64,
    /// Quotes with implied vol below this are dropped.
    pub min_implied_vol: f64,
    /// Quotes with implied vol above this are dropped.
    pub max_implied_vol: f64,
    /// Base regularisation strength `alpha0`.
    pub alpha0: f64,
    /// Reference residual scaling the regularisation.
    pub residual_reference: f64,
    /// Objective value for infeasible or unpriceable parameter vectors.
    pub sentinel: f64,
    /// Stage 1 settings.
    pub lbfgs: LbfgsConfig,
    /// Stage 2 settings.
    pub differential_evolution: DifferentialEvolutionConfig,
    /// Wall-clock budget shared by both stages, in seconds.
    pub time_budget_secs: Option<f64>,
    /// Number of rejections kept in the history.
    pub rejection_history: usize,
    /// Pricer settings used inside the objective and the QC gate.
    pub pricing: PricingConfig,
    /// Quality-control thresholds.
    pub qc: QcConfig,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            bounds: HestonBounds::default(),
            liquid_bias: 1.5,
            min_implied_vol: 0.01,
            max_implied_vol: 2.0,
            alpha0: 1.0,
            residual_reference: 1.0,
            sentinel: 1e10,
            lbfgs: LbfgsConfig {
                max_iterations: 100,
                ..LbfgsConfig::default()
            },
            differential_evolution: DifferentialEvolutionConfig {
                max_generations: 50,
                seed: 42,
                ..DifferentialEvolutionConfig::default()
            },
            time_budget_secs: None,
            rejection_history: 100,
            pricing: PricingConfig::default(),
            qc: QcConfig::default(),
        }
    }
}

impl CalibrationConfig {
    /// Reject settings the calibrator cannot run with.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if !self.bounds.is_valid() {
            return Err(CalibrationError::invalid_config("parameter bounds are not valid intervals"));
        }
        if !(self.liquid_bias.is_finite() && self.liquid_bias > 0.0) {
            return Err(CalibrationError::invalid_config(format!(
                "liquid_bias must be positive, got {}",
                self.liquid_bias
            )));
        }
        if !(self.min_implied_vol >= 0.0 && self.min_implied_vol < self.max_implied_vol) {
            return Err(CalibrationError::invalid_config(format!(
                "implied vol filter [{}, {}] is empty",
                self.min_implied_vol, self.max_implied_vol
            )));
        }
        if !(self.alpha0 >= 0.0 && self.residual_reference > 0.0) {
            return Err(CalibrationError::invalid_config(
                "alpha0 must be non-negative and residual_reference positive",
            ));
        }
        if !(self.sentinel.is_finite() && self.sentinel > 0.0) {
            return Err(CalibrationError::invalid_config("sentinel must be a positive finite value"));
        }
        if self.time_budget().is_none() && self.time_budget_secs.is_some() {
            return Err(CalibrationError::invalid_config(
                "time_budget_secs must be a non-negative number of seconds",
            ));
        }
        if self.lbfgs.memory == 0 {
            return Err(CalibrationError::invalid_config("lbfgs.memory must be at least 1"));
        }
        if self.differential_evolution.population_per_dimension == 0 {
            return Err(CalibrationError::invalid_config(
                "differential_evolution.population_per_dimension must be at least 1",
            ));
        }
        if !self.differential_evolution.is_valid() {
            let de = &self.differential_evolution;
            return Err(CalibrationError::invalid_config(format!(
                "differential_evolution needs finite mutation 0 < lo <= hi <= 2 and crossover in [0, 1], got {:?} and {}",
                de.mutation, de.crossover_probability
            )));
        }
        let qc = &self.qc;
        if qc.moneyness_buckets.iter().chain(&qc.dte_buckets).any(|[lo, hi]| !(lo <= hi)) {
            return Err(CalibrationError::invalid_config("QC bucket edges must satisfy lo <= hi"));
        }
        if !(qc.local_rmse_multiplier > 0.0) {
            return Err(CalibrationError::invalid_config("local_rmse_multiplier must be positive"));
        }
        self.pricing.validate()?;
        Ok(())
    }

    /// The configured budget as a `Duration`, if any.
    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget_secs
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = CalibrationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.lbfgs.max_iterations, 100);
        assert_eq!(config.differential_evolution.max_generations, 50);
        assert_eq!(config.differential_evolution.seed, 42);
        assert_eq!(config.qc.moneyness_buckets.len() * config.qc.dte_buckets.len(), 15);
    }

    #[test]
    fn test_rejects_negative_budget() {
        let config = CalibrationConfig {
            time_budget_secs: Some(-1.0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        let config = CalibrationConfig {
            time_budget_secs: Some(2.5),
            ..Default::default()
        };
        assert_eq!(config.time_budget(), Some(Duration::from_millis(2500)));
    }

    #[test]
    fn test_rejects_inverted_bucket() {
        let mut config = CalibrationConfig::default();
        config.qc.dte_buckets.push([50.0, 10.0]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_bias() {
        let config = CalibrationConfig {
            liquid_bias: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CalibrationError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_unusable_differential_evolution() {
        let mut config = CalibrationConfig::default();
        config.differential_evolution.mutation = (0.5, f64::INFINITY);
        assert!(matches!(config.validate(), Err(CalibrationError::InvalidConfig(_))));

        let mut config = CalibrationConfig::default();
        config.differential_evolution.mutation = (1.2, 0.4);
        assert!(config.validate().is_err());

        let mut config = CalibrationConfig::default();
        config.differential_evolution.crossover_probability = -0.1;
        assert!(config.validate().is_err());
    }
}
