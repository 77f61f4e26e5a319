//! Rate curve trait definition.

/// A term structure of continuously compounded rates.
///
/// The same trait serves the risk-free curve and the dividend-yield curve.
/// Implementations are queried with time-to-expiry in years and must return
/// a finite rate for every `t >= 0`.
///
/// # Example
///
/// ```
/// use pricer_core::market_data::curves::{FlatCurve, RateCurve};
///
/// let curves: Vec<Box<dyn RateCurve>> = vec![Box::new(FlatCurve::new(0.02))];
/// assert_eq!(curves[0].rate(3.0), 0.02);
/// ```
pub trait RateCurve: Send + Sync {
    /// Continuously compounded rate for maturity `t`.
    fn rate(&self, t: f64) -> f64;

    /// Discount factor `exp(-r(t) * t)`.
    fn discount_factor(&self, t: f64) -> f64 {
        (-self.rate(t) * t).exp()
    }
}

impl<C: RateCurve + ?Sized> RateCurve for &C {
    fn rate(&self, t: f64) -> f64 {
        (**self).rate(t)
    }
}

impl<C: RateCurve + ?Sized> RateCurve for Box<C> {
    fn rate(&self, t: f64) -> f64 {
        (**self).rate(t)
    }
}
