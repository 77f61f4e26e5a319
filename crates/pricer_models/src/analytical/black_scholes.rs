//! Black-Scholes pricing with a continuous dividend yield.
//!
//! **Call**: C = S·e^(-qT)·N(d₁) - K·e^(-rT)·N(d₂)
//! **Put**: P = K·e^(-rT)·N(-d₂) - S·e^(-qT)·N(-d₁)
//!
//! with d₁ = (ln(S/K) + (r - q + σ²/2)T) / (σ√T), d₂ = d₁ - σ√T.
//!
//! Degenerate inputs take deterministic shortcuts instead of failing:
//! an expired option (T ≤ 0) is worth its intrinsic value on spot, and a
//! zero-volatility option is worth the discounted intrinsic value on the
//! forward.

use pricer_core::types::OptionType;

use super::distributions::{norm_cdf, norm_pdf};
use super::error::AnalyticalError;

/// Below this total standard deviation σ√T the option is treated as deterministic.
const MIN_TOTAL_VOL: f64 = 1e-12;

/// Black-Scholes price. See the module docs for the shortcut rules.
///
/// ```
/// use pricer_models::analytical::black_scholes::price;
/// use pricer_core::types::OptionType;
///
/// let call = price(100.0, 100.0, 1.0, 0.05, 0.02, 0.2, OptionType::Call);
/// let put = price(100.0, 100.0, 1.0, 0.05, 0.02, 0.2, OptionType::Put);
/// let parity = 100.0 * (-0.02_f64).exp() - 100.0 * (-0.05_f64).exp();
/// assert!((call - put - parity).abs() < 1e-12);
/// ```
pub fn price(
    spot: f64,
    strike: f64,
    expiry: f64,
    rate: f64,
    dividend: f64,
    volatility: f64,
    option_type: OptionType,
) -> f64 {
    if expiry <= 0.0 {
        return option_type.payoff(spot, strike);
    }

    let df_q = (-dividend * expiry).exp();
    let df_r = (-rate * expiry).exp();
    let total_vol = volatility * expiry.sqrt();
    if !(total_vol > MIN_TOTAL_VOL) {
        return option_type.payoff(spot * df_q, strike * df_r);
    }

    let d1 = ((spot / strike).ln() + (rate - dividend + 0.5 * volatility * volatility) * expiry)
        / total_vol;
    let d2 = d1 - total_vol;
    let w = option_type.sign();
    w * (spot * df_q * norm_cdf(w * d1) - strike * df_r * norm_cdf(w * d2))
}

/// Sensitivity of [`price`] to volatility (same for calls and puts).
///
/// Zero wherever [`price`] takes a shortcut.
pub fn vega(spot: f64, strike: f64, expiry: f64, rate: f64, dividend: f64, volatility: f64) -> f64 {
    if expiry <= 0.0 {
        return 0.0;
    }
    let sqrt_t = expiry.sqrt();
    let total_vol = volatility * sqrt_t;
    if !(total_vol > MIN_TOTAL_VOL) {
        return 0.0;
    }
    let d1 = ((spot / strike).ln() + (rate - dividend + 0.5 * volatility * volatility) * expiry)
        / total_vol;
    spot * (-dividend * expiry).exp() * norm_pdf(d1) * sqrt_t
}

/// Black-Scholes model bound to one spot, rate, dividend yield and volatility.
///
/// # Examples
/// ```
/// use pricer_models::analytical::BlackScholes;
/// use pricer_core::types::OptionType;
///
/// let bs = BlackScholes::new(100.0, 0.05, 0.0, 0.2).unwrap();
/// let call = bs.price(100.0, 1.0, OptionType::Call);
/// assert!((call - 10.450583572185565).abs() < 1e-9);
///
/// assert!(BlackScholes::new(-100.0, 0.05, 0.0, 0.2).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlackScholes {
    spot: f64,
    rate: f64,
    dividend: f64,
    volatility: f64,
}

impl BlackScholes {
    /// Creates a new model.
    ///
    /// # Errors
    /// - `AnalyticalError::InvalidSpot` if spot is not positive and finite
    /// - `AnalyticalError::InvalidVolatility` if volatility is negative or not finite
    pub fn new(spot: f64, rate: f64, dividend: f64, volatility: f64) -> Result<Self, AnalyticalError> {
        if !(spot > 0.0) || !spot.is_finite() {
            return Err(AnalyticalError::InvalidSpot { spot });
        }
        if !(volatility >= 0.0) || !volatility.is_finite() {
            return Err(AnalyticalError::InvalidVolatility { volatility });
        }
        Ok(Self {
            spot,
            rate,
            dividend,
            volatility,
        })
    }

    /// Returns the spot price.
    #[inline]
    pub fn spot(&self) -> f64 {
        self.spot
    }

    /// Returns the volatility.
    #[inline]
    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    /// Forward price `S·e^((r-q)T)`.
    #[inline]
    pub fn forward(&self, expiry: f64) -> f64 {
        self.spot * ((self.rate - self.dividend) * expiry).exp()
    }

    /// Option price.
    #[inline]
    pub fn price(&self, strike: f64, expiry: f64, option_type: OptionType) -> f64 {
        price(
            self.spot,
            strike,
            expiry,
            self.rate,
            self.dividend,
            self.volatility,
            option_type,
        )
    }

    /// Vega.
    #[inline]
    pub fn vega(&self, strike: f64, expiry: f64) -> f64 {
        vega(self.spot, strike, expiry, self.rate, self.dividend, self.volatility)
    }
}
