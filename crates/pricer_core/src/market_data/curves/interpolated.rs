//! Pillar-based rate curve.

use super::RateCurve;
use crate::market_data::error::MarketDataError;

/// Rate curve interpolating linearly between pillars.
///
/// Maturities before the first pillar take the first rate and maturities
/// after the last pillar take the last rate.
///
/// # Example
///
/// ```
/// use pricer_core::market_data::curves::{InterpolatedCurve, RateCurve};
///
/// let curve = InterpolatedCurve::new(&[0.25, 1.0], &[0.02, 0.03]).unwrap();
/// assert!((curve.rate(0.625) - 0.025).abs() < 1e-12);
/// assert_eq!(curve.rate(0.01), 0.02);
/// assert_eq!(curve.rate(10.0), 0.03);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InterpolatedCurve {
    tenors: Vec<f64>,
    rates: Vec<f64>,
}

impl InterpolatedCurve {
    /// Construct a curve from pillar points.
    ///
    /// # Errors
    ///
    /// * `InsufficientData` - no pillars, or tenor and rate lengths differ
    /// * `InvalidMaturity` - a tenor is not positive or not strictly increasing
    /// * `InvalidRate` - a rate is not finite
    pub fn new(tenors: &[f64], rates: &[f64]) -> Result<Self, MarketDataError> {
        if tenors.is_empty() {
            return Err(MarketDataError::InsufficientData { got: 0, need: 1 });
        }
        if tenors.len() != rates.len() {
            return Err(MarketDataError::InsufficientData {
                got: rates.len(),
                need: tenors.len(),
            });
        }

        for (i, (&t, &r)) in tenors.iter().zip(rates).enumerate() {
            if !(t > 0.0) || (i > 0 && t <= tenors[i - 1]) {
                return Err(MarketDataError::InvalidMaturity { t });
            }
            if !r.is_finite() {
                return Err(MarketDataError::InvalidRate { t, rate: r });
            }
        }

        Ok(Self {
            tenors: tenors.to_vec(),
            rates: rates.to_vec(),
        })
    }

    /// Pillar tenors in years.
    pub fn tenors(&self) -> &[f64] {
        &self.tenors
    }

    /// Pillar rates.
    pub fn rates(&self) -> &[f64] {
        &self.rates
    }
}

impl RateCurve for InterpolatedCurve {
    fn rate(&self, t: f64) -> f64 {
        let n = self.tenors.len();
        if t <= self.tenors[0] {
            return self.rates[0];
        }
        if t >= self.tenors[n - 1] {
            return self.rates[n - 1];
        }

        // First pillar at or above t.
        let i = self.tenors.partition_point(|&x| x < t);
        let (t0, t1) = (self.tenors[i - 1], self.tenors[i]);
        let (r0, r1) = (self.rates[i - 1], self.rates[i]);
        r0 + (r1 - r0) * (t - t0) / (t1 - t0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn curve() -> InterpolatedCurve {
        InterpolatedCurve::new(&[0.25, 0.5, 1.0, 2.0], &[0.02, 0.025, 0.03, 0.04]).unwrap()
    }

    #[test]
    fn test_hits_pillars() {
        let c = curve();
        for (&t, &r) in c.tenors().iter().zip(c.rates()) {
            assert_relative_eq!(c.rate(t), r, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_linear_between_pillars() {
        let c = curve();
        assert_relative_eq!(c.rate(0.75), 0.0275, epsilon = 1e-15);
        assert_relative_eq!(c.rate(1.5), 0.035, epsilon = 1e-15);
    }

    #[test]
    fn test_flat_extrapolation() {
        let c = curve();
        assert_eq!(c.rate(0.0), 0.02);
        assert_eq!(c.rate(30.0), 0.04);
    }

    #[test]
    fn test_single_pillar_is_flat() {
        let c = InterpolatedCurve::new(&[1.0], &[0.01]).unwrap();
        assert_eq!(c.rate(0.1), 0.01);
        assert_eq!(c.rate(5.0), 0.01);
    }

    #[test]
    fn test_rejects_bad_pillars() {
        assert!(matches!(
            InterpolatedCurve::new(&[], &[]),
            Err(MarketDataError::InsufficientData { .. })
        ));
        assert!(matches!(
            InterpolatedCurve::new(&[1.0, 0.5], &[0.01, 0.02]),
            Err(MarketDataError::InvalidMaturity { .. })
        ));
        assert!(matches!(
            InterpolatedCurve::new(&[1.0], &[f64::NAN]),
            Err(MarketDataError::InvalidRate { .. })
        ));
        assert!(matches!(
            InterpolatedCurve::new(&[1.0, 2.0], &[0.01]),
            Err(MarketDataError::InsufficientData { .. })
        ));
    }
}
