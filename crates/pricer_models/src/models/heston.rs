//! Heston stochastic-volatility parameters.
//!
//! ```text
//! dS = (r - q) S dt + sqrt(v) S dW_S
//! dv = kappa (theta - v) dt + xi sqrt(v) dW_v
//! E[dW_S dW_v] = rho dt
//! ```
//!
//! ## Feller condition
//!
//! `2 kappa theta >= xi^2` keeps the variance process away from zero. The
//! calibrator reports violations but does not enforce the condition.
//!
//! ```
//! use pricer_models::models::HestonParams;
//!
//! let params = HestonParams::default();
//! assert!(params.satisfies_feller());
//! assert_eq!(HestonParams::from_slice(&params.to_vec()), Some(params));
//! ```

use pricer_core::math::solvers::ParameterBounds;

/// Heston parameter vector positions used by the solvers.
///
/// - `params[0]` = theta (long-run variance)
/// - `params[1]` = kappa (mean reversion speed)
/// - `params[2]` = xi (vol-of-vol)
/// - `params[3]` = rho (spot/variance correlation)
/// - `params[4]` = v0 (initial variance)
#[derive(Debug, Clone, Copy)]
pub struct HestonParamIndex;

impl HestonParamIndex {
    /// Long-run variance index.
    pub const THETA: usize = 0;
    /// Mean reversion speed index.
    pub const KAPPA: usize = 1;
    /// Vol-of-vol index.
    pub const XI: usize = 2;
    /// Correlation index.
    pub const RHO: usize = 3;
    /// Initial variance index.
    pub const V0: usize = 4;
    /// Number of parameters.
    pub const COUNT: usize = 5;
    /// Names in vector order.
    pub const NAMES: [&'static str; 5] = ["theta", "kappa", "xi", "rho", "v0"];
}

/// Heston model parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HestonParams {
    /// Long-run variance.
    pub theta: f64,
    /// Mean reversion speed.
    pub kappa: f64,
    /// Volatility of variance.
    pub xi: f64,
    /// Correlation between spot and variance shocks.
    pub rho: f64,
    /// Initial variance.
    pub v0: f64,
}

impl Default for HestonParams {
    fn default() -> Self {
        Self {
            theta: 0.04,
            kappa: 2.0,
            xi: 0.3,
            rho: -0.7,
            v0: 0.04,
        }
    }
}

impl HestonParams {
    /// Create from individual values (no validation).
    pub fn new(theta: f64, kappa: f64, xi: f64, rho: f64, v0: f64) -> Self {
        Self {
            theta,
            kappa,
            xi,
            rho,
            v0,
        }
    }

    /// Solver vector in [`HestonParamIndex`] order.
    pub fn to_vec(&self) -> Vec<f64> {
        self.to_array().to_vec()
    }

    /// Fixed-size form of [`HestonParams::to_vec`].
    pub fn to_array(&self) -> [f64; HestonParamIndex::COUNT] {
        [self.theta, self.kappa, self.xi, self.rho, self.v0]
    }

    /// Rebuild from a solver vector; `None` on a length mismatch.
    pub fn from_slice(x: &[f64]) -> Option<Self> {
        match *x {
            [theta, kappa, xi, rho, v0] => Some(Self::new(theta, kappa, xi, rho, v0)),
            _ => None,
        }
    }

    /// `2 kappa theta >= xi^2`.
    pub fn satisfies_feller(&self) -> bool {
        2.0 * self.kappa * self.theta >= self.xi * self.xi
    }

    /// `2 kappa theta / xi^2`; at least 1 when Feller holds.
    pub fn feller_ratio(&self) -> f64 {
        2.0 * self.kappa * self.theta / (self.xi * self.xi).max(f64::MIN_POSITIVE)
    }

    /// Every field finite.
    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    /// Squared Euclidean distance in solver-vector space.
    pub fn distance_squared(&self, other: &HestonParams) -> f64 {
        self.to_array()
            .iter()
            .zip(other.to_array())
            .map(|(a, b)| (a - b).powi(2))
            .sum()
    }
}

/// Search box for calibration.
///
/// Defaults: theta in [0.02, 0.08], kappa in [0.5, 5], xi in [0.1, 1],
/// rho in [-0.95, -0.05], v0 in [0.01, 0.1].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HestonBounds {
    /// Long-run variance.
    pub theta: ParameterBounds,
    /// Mean reversion speed.
    pub kappa: ParameterBounds,
    /// Vol-of-vol.
    pub xi: ParameterBounds,
    /// Correlation.
    pub rho: ParameterBounds,
    /// Initial variance.
    pub v0: ParameterBounds,
}

impl Default for HestonBounds {
    fn default() -> Self {
        Self {
            theta: ParameterBounds::new(0.02, 0.08),
            kappa: ParameterBounds::new(0.5, 5.0),
            xi: ParameterBounds::new(0.1, 1.0),
            rho: ParameterBounds::new(-0.95, -0.05),
            v0: ParameterBounds::new(0.01, 0.1),
        }
    }
}

impl HestonBounds {
    /// Bounds in [`HestonParamIndex`] order.
    pub fn as_array(&self) -> [ParameterBounds; HestonParamIndex::COUNT] {
        [self.theta, self.kappa, self.xi, self.rho, self.v0]
    }

    /// Whether `params` lies inside the box.
    pub fn contains(&self, params: &HestonParams) -> bool {
        self.as_array()
            .iter()
            .zip(params.to_array())
            .all(|(b, v)| b.contains(v))
    }

    /// Project `params` onto the box.
    pub fn clamp(&self, params: &HestonParams) -> HestonParams {
        let b = self.as_array();
        let x = params.to_array();
        HestonParams::new(
            b[0].clamp(x[0]),
            b[1].clamp(x[1]),
            b[2].clamp(x[2]),
            b[3].clamp(x[3]),
            b[4].clamp(x[4]),
        )
    }

    /// All five intervals finite and non-empty.
    pub fn is_valid(&self) -> bool {
        self.as_array().iter().all(ParameterBounds::is_valid)
    }
}
