//! Market volatility quotes.

use crate::market_data::error::MarketDataError;
use crate::types::{Date, OptionType};

/// Strike resolution used when quotes are used as map keys.
const STRIKE_SCALE: f64 = 1_000.0;

/// One market quote on the implied-volatility surface.
///
/// `option_type` is optional; when absent the out-of-the-money side relative
/// to the forward is assumed by consumers that need one.
///
/// # Example
///
/// ```
/// use pricer_core::market_data::surfaces::VolSurfacePoint;
/// use pricer_core::types::Date;
///
/// let expiry = Date::from_ymd(2024, 3, 15).unwrap();
/// let q = VolSurfacePoint::new(100.0, expiry, 0.2)
///     .with_volume(250.0)
///     .with_quotes(4.9, 5.1);
/// assert_eq!(q.mid(), Some(5.0));
/// assert!((q.relative_spread().unwrap() - 0.04).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VolSurfacePoint {
    /// Strike price
    pub strike: f64,
    /// Expiry date
    pub expiry: Date,
    /// Quoted implied volatility (decimal)
    pub implied_vol: f64,
    /// Traded volume, used for calibration weights
    #[cfg_attr(feature = "serde", serde(default))]
    pub volume: f64,
    /// Best bid (0 when unknown)
    #[cfg_attr(feature = "serde", serde(default))]
    pub bid: f64,
    /// Best ask (0 when unknown)
    #[cfg_attr(feature = "serde", serde(default))]
    pub ask: f64,
    /// Call or put, if the provider supplies it
    #[cfg_attr(feature = "serde", serde(default))]
    pub option_type: Option<OptionType>,
}

impl VolSurfacePoint {
    /// Quote with zero volume and no bid/ask.
    pub fn new(strike: f64, expiry: Date, implied_vol: f64) -> Self {
        Self {
            strike,
            expiry,
            implied_vol,
            volume: 0.0,
            bid: 0.0,
            ask: 0.0,
            option_type: None,
        }
    }

    /// Set the traded volume.
    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    /// Set bid and ask.
    pub fn with_quotes(mut self, bid: f64, ask: f64) -> Self {
        self.bid = bid;
        self.ask = ask;
        self
    }

    /// Set the option type.
    pub fn with_option_type(mut self, option_type: OptionType) -> Self {
        self.option_type = Some(option_type);
        self
    }

    /// Map key for this quote's (strike, expiry) node.
    #[inline]
    pub fn key(&self) -> QuoteKey {
        QuoteKey::new(self.strike, self.expiry)
    }

    /// Mid price, if a two-sided market is present.
    pub fn mid(&self) -> Option<f64> {
        if self.bid > 0.0 && self.ask >= self.bid {
            Some(0.5 * (self.bid + self.ask))
        } else {
            None
        }
    }

    /// Bid/ask spread relative to mid.
    pub fn relative_spread(&self) -> Option<f64> {
        self.mid().map(|mid| (self.ask - self.bid) / mid)
    }

    /// `ln(K / S)`.
    #[inline]
    pub fn log_moneyness(&self, spot: f64) -> f64 {
        (self.strike / spot).ln()
    }

    /// Calendar days from `valuation` to expiry.
    #[inline]
    pub fn days_to_expiry(&self, valuation: Date) -> i64 {
        self.expiry.days_since(valuation)
    }

    /// Structural checks: positive finite strike, finite vol, non-negative volume.
    ///
    /// Range filtering of the vol itself is left to the calibrator.
    pub fn validate(&self) -> Result<(), MarketDataError> {
        let invalid = |reason: &str| MarketDataError::InvalidQuote {
            strike: self.strike,
            reason: reason.to_string(),
        };
        if !self.strike.is_finite() || self.strike <= 0.0 {
            return Err(invalid("strike must be positive and finite"));
        }
        if !self.implied_vol.is_finite() {
            return Err(invalid("implied vol is not finite"));
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(invalid("volume must be non-negative"));
        }
        Ok(())
    }
}

/// Hashable (strike, expiry) key.
///
/// Strikes are rounded to three decimals so quotes from different sources
/// land on the same node.
///
/// ```
/// use pricer_core::market_data::surfaces::QuoteKey;
/// use pricer_core::types::Date;
///
/// let expiry = Date::from_ymd(2024, 3, 15).unwrap();
/// assert_eq!(QuoteKey::new(100.0, expiry), QuoteKey::new(100.0000001, expiry));
/// assert_eq!(QuoteKey::new(102.5, expiry).strike(), 102.5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuoteKey {
    /// Expiry date
    pub expiry: Date,
    strike_milli: i64,
}

impl QuoteKey {
    /// Key for `strike` at `expiry`.
    pub fn new(strike: f64, expiry: Date) -> Self {
        Self {
            expiry,
            strike_milli: (strike * STRIKE_SCALE).round() as i64,
        }
    }

    /// The rounded strike.
    #[inline]
    pub fn strike(&self) -> f64 {
        self.strike_milli as f64 / STRIKE_SCALE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expiry() -> Date {
        Date::from_ymd(2024, 3, 15).unwrap()
    }

    #[test]
    fn test_mid_requires_two_sided_market() {
        let q = VolSurfacePoint::new(100.0, expiry(), 0.2);
        assert_eq!(q.mid(), None);
        assert_eq!(q.relative_spread(), None);
        let crossed = q.clone().with_quotes(5.0, 4.0);
        assert_eq!(crossed.mid(), None);
    }

    #[test]
    fn test_validate() {
        assert!(VolSurfacePoint::new(100.0, expiry(), 0.2).validate().is_ok());
        assert!(VolSurfacePoint::new(0.0, expiry(), 0.2).validate().is_err());
        assert!(VolSurfacePoint::new(f64::NAN, expiry(), 0.2).validate().is_err());
        assert!(VolSurfacePoint::new(100.0, expiry(), f64::INFINITY)
            .validate()
            .is_err());
        assert!(VolSurfacePoint::new(100.0, expiry(), 0.2)
            .with_volume(-1.0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_key_ordering_groups_by_expiry() {
        let early = Date::from_ymd(2024, 2, 15).unwrap();
        let a = QuoteKey::new(120.0, early);
        let b = QuoteKey::new(80.0, expiry());
        assert!(a < b);
    }

    #[test]
    fn test_log_moneyness_and_days() {
        let q = VolSurfacePoint::new(110.0, expiry(), 0.2);
        assert!((q.log_moneyness(100.0) - 1.1_f64.ln()).abs() < 1e-15);
        let valuation = Date::from_ymd(2024, 3, 1).unwrap();
        assert_eq!(q.days_to_expiry(valuation), 14);
    }
}
