//! Flat rate curve.

use super::RateCurve;

/// Curve with the same rate at every maturity.
///
/// ```
/// use pricer_core::market_data::curves::{FlatCurve, RateCurve};
///
/// let curve = FlatCurve::new(0.05);
/// assert_eq!(curve.rate(0.1), 0.05);
/// assert_eq!(curve.rate(5.0), 0.05);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlatCurve {
    rate: f64,
}

impl FlatCurve {
    /// Construct a flat curve with the given constant rate.
    #[inline]
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }

    /// The constant rate.
    #[inline]
    pub fn value(&self) -> f64 {
        self.rate
    }
}

impl RateCurve for FlatCurve {
    #[inline]
    fn rate(&self, _t: f64) -> f64 {
        self.rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_discount_factor() {
        let curve = FlatCurve::new(0.05);
        assert_relative_eq!(curve.discount_factor(1.0), (-0.05_f64).exp(), epsilon = 1e-15);
        assert_relative_eq!(curve.discount_factor(0.0), 1.0);
    }

    #[test]
    fn test_negative_rate() {
        let curve = FlatCurve::new(-0.01);
        assert!(curve.discount_factor(2.0) > 1.0);
    }
}
