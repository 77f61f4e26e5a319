//! Fourier pricer for European options under Heston.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::{Arc, PoisonError, RwLock};

use num_complex::Complex64;
use pricer_core::math::CompositeRule;
use pricer_core::types::{OptionType, PricingError};
use tracing::debug;

use super::characteristic::characteristic_function;
use super::config::PricingConfig;
use crate::analytical::{black_scholes, implied_volatility};
use crate::models::HestonParams;

/// `(T, r, q)` as raw bits so that the key is `Eq + Hash`.
type CacheKey = (u64, u64, u64);

/// European option pricer for a fixed Heston parameter set.
///
/// Calls use the Lewis single-integral representation
///
/// ```text
/// C = S e^{-qT} - sqrt(S K) e^{-rT} / pi * Int_0^U Re[e^{iuk} phi(u - i/2)] / (u^2 + 1/4) du
/// ```
///
/// with `k = ln(S / K)`; puts follow from parity. The strike enters only
/// through `e^{iuk}`, so the weighted characteristic-function values are
/// computed once per `(T, r, q)` and shared by every strike of an expiry.
///
/// # Example
///
/// ```
/// use pricer_core::types::OptionType;
/// use pricer_models::models::HestonParams;
/// use pricer_models::pricing::{HestonPricer, PricingConfig};
///
/// let pricer = HestonPricer::new(HestonParams::default(), PricingConfig::default()).unwrap();
/// let call = pricer.price(100.0, 100.0, 0.5, 0.05, 0.02, OptionType::Call).unwrap();
/// let put = pricer.price(100.0, 100.0, 0.5, 0.05, 0.02, OptionType::Put).unwrap();
///
/// let parity = 100.0 * (-0.02_f64 * 0.5).exp() - 100.0 * (-0.05_f64 * 0.5).exp();
/// assert!((call - put - parity).abs() < 1e-10);
/// assert_eq!(pricer.cached_expiries(), 1);
/// ```
#[derive(Debug)]
pub struct HestonPricer {
    params: HestonParams,
    rule: Arc<CompositeRule>,
    config: PricingConfig,
    cache: RwLock<HashMap<CacheKey, Arc<[Complex64]>>>,
}

impl HestonPricer {
    /// Build a pricer, constructing the quadrature rule from `config`.
    ///
    /// # Errors
    ///
    /// `PricingError::InvalidInput` for an unusable configuration.
    pub fn new(params: HestonParams, config: PricingConfig) -> Result<Self, PricingError> {
        let rule = Arc::new(config.build_rule()?);
        Ok(Self::with_rule(params, rule, config))
    }

    /// Build a pricer around an existing rule.
    ///
    /// Used when many short-lived pricers share one rule, as in calibration.
    pub fn with_rule(params: HestonParams, rule: Arc<CompositeRule>, config: PricingConfig) -> Self {
        Self {
            params,
            rule,
            config,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Model parameters.
    pub fn params(&self) -> &HestonParams {
        &self.params
    }

    /// Pricing configuration.
    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Number of `(T, r, q)` triples with memoised integrand weights.
    pub fn cached_expiries(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Drop all memoised integrand weights.
    pub fn clear_cache(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Price a European option.
    ///
    /// Shortcuts: `expiry <= 0` gives the spot intrinsic value; `v0 <= 0`
    /// gives the discounted intrinsic value on the forward.
    ///
    /// # Errors
    ///
    /// - `PricingError::InvalidInput` for non-positive spot or strike,
    ///   non-finite inputs, or a non-positive vol-of-vol
    /// - `PricingError::NumericalInstability` when the integral is not finite
    pub fn price(
        &self,
        spot: f64,
        strike: f64,
        expiry: f64,
        rate: f64,
        dividend: f64,
        option_type: OptionType,
    ) -> Result<f64, PricingError> {
        validate_market(spot, strike, expiry, rate, dividend)?;
        if let Some(value) = self.shortcut(spot, strike, expiry, rate, dividend, option_type) {
            return Ok(value);
        }
        let coefficients = self.coefficients(expiry, rate, dividend)?;
        let call = self.lewis_call(&coefficients, spot, strike, expiry, rate, dividend)?;
        Ok(from_call(call, spot, strike, expiry, rate, dividend, option_type))
    }

    /// Call prices for several strikes of one expiry.
    ///
    /// # Errors
    ///
    /// As [`HestonPricer::price`]; the first failing strike aborts.
    pub fn call_prices(
        &self,
        spot: f64,
        strikes: &[f64],
        expiry: f64,
        rate: f64,
        dividend: f64,
    ) -> Result<Vec<f64>, PricingError> {
        strikes
            .iter()
            .map(|&k| self.price(spot, k, expiry, rate, dividend, OptionType::Call))
            .collect()
    }

    /// [`HestonPricer::price`], or Black-Scholes at `sqrt(v0)` when the
    /// Fourier integral fails.
    pub fn price_or_fallback(
        &self,
        spot: f64,
        strike: f64,
        expiry: f64,
        rate: f64,
        dividend: f64,
        option_type: OptionType,
    ) -> f64 {
        match self.price(spot, strike, expiry, rate, dividend, option_type) {
            Ok(value) => value,
            Err(err) => {
                debug!(strike, expiry, error = %err, "Heston pricing failed, using Black-Scholes");
                let vol = self.params.v0.max(0.0).sqrt();
                black_scholes::price(spot, strike, expiry, rate, dividend, vol, option_type)
            }
        }
    }

    /// Black-Scholes implied volatility of `target`.
    ///
    /// Newton-Raphson from the configured initial guess, clamped every step.
    #[allow(clippy::too_many_arguments)]
    pub fn implied_volatility_from_price(
        &self,
        target: f64,
        spot: f64,
        strike: f64,
        expiry: f64,
        rate: f64,
        dividend: f64,
        option_type: OptionType,
    ) -> f64 {
        implied_volatility(
            target,
            spot,
            strike,
            expiry,
            rate,
            dividend,
            option_type,
            &self.config.implied_vol,
        )
    }

    /// Model implied volatility at `(strike, expiry)`.
    ///
    /// Prices the out-of-the-money side (put below the forward, call at or
    /// above it) and inverts that price.
    ///
    /// # Errors
    ///
    /// As [`HestonPricer::price`].
    pub fn model_implied_vol(
        &self,
        spot: f64,
        strike: f64,
        expiry: f64,
        rate: f64,
        dividend: f64,
    ) -> Result<f64, PricingError> {
        let forward = spot * ((rate - dividend) * expiry).exp();
        let option_type = OptionType::out_of_the_money(strike, forward);
        let value = self.price(spot, strike, expiry, rate, dividend, option_type)?;
        Ok(self.implied_volatility_from_price(value, spot, strike, expiry, rate, dividend, option_type))
    }

    fn shortcut(
        &self,
        spot: f64,
        strike: f64,
        expiry: f64,
        rate: f64,
        dividend: f64,
        option_type: OptionType,
    ) -> Option<f64> {
        if expiry <= 0.0 {
            return Some(option_type.payoff(spot, strike));
        }
        if self.params.v0 <= 0.0 {
            let forward = spot * ((rate - dividend) * expiry).exp();
            return Some((-rate * expiry).exp() * option_type.payoff(forward, strike));
        }
        None
    }

    /// Weighted integrand values `w_j phi(u_j - i/2) / (u_j^2 + 1/4)`.
    fn coefficients(&self, expiry: f64, rate: f64, dividend: f64) -> Result<Arc<[Complex64]>, PricingError> {
        let key = (expiry.to_bits(), rate.to_bits(), dividend.to_bits());
        if let Some(hit) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(Arc::clone(hit));
        }

        self.validate_params()?;
        let shift = Complex64::new(0.0, -0.5);
        let coefficients: Arc<[Complex64]> = self
            .rule
            .points()
            .iter()
            .zip(self.rule.weights())
            .map(|(&u, &w)| {
                let phi = characteristic_function(u + shift, expiry, rate, dividend, &self.params);
                phi * (w / (u * u + 0.25))
            })
            .collect();

        if let Some(bad) = coefficients.iter().position(|c| !(c.re.is_finite() && c.im.is_finite())) {
            return Err(PricingError::numerical(format!(
                "characteristic function not finite at u = {:.4} (T = {expiry})",
                self.rule.points()[bad]
            )));
        }

        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::clone(&coefficients));
        Ok(coefficients)
    }

    fn lewis_call(
        &self,
        coefficients: &[Complex64],
        spot: f64,
        strike: f64,
        expiry: f64,
        rate: f64,
        dividend: f64,
    ) -> Result<f64, PricingError> {
        let k = (spot / strike).ln();
        let integral: f64 = self
            .rule
            .points()
            .iter()
            .zip(coefficients)
            .map(|(&u, c)| (Complex64::new(0.0, u * k).exp() * c).re)
            .sum();

        let call = spot * (-dividend * expiry).exp()
            - (spot * strike).sqrt() * (-rate * expiry).exp() / PI * integral;
        if call.is_finite() {
            Ok(call)
        } else {
            Err(PricingError::numerical(format!(
                "Fourier integral is {integral} for K = {strike}, T = {expiry}"
            )))
        }
    }

    fn validate_params(&self) -> Result<(), PricingError> {
        let p = &self.params;
        if !p.is_finite() {
            return Err(PricingError::invalid_input(format!("non-finite Heston parameters {p:?}")));
        }
        if p.xi <= 0.0 {
            return Err(PricingError::invalid_input(format!(
                "vol-of-vol must be positive, got {}",
                p.xi
            )));
        }
        Ok(())
    }
}

fn validate_market(spot: f64, strike: f64, expiry: f64, rate: f64, dividend: f64) -> Result<(), PricingError> {
    if !(spot.is_finite() && spot > 0.0) {
        return Err(PricingError::invalid_input(format!("spot must be positive, got {spot}")));
    }
    if !(strike.is_finite() && strike > 0.0) {
        return Err(PricingError::invalid_input(format!("strike must be positive, got {strike}")));
    }
    if !(expiry.is_finite() && rate.is_finite() && dividend.is_finite()) {
        return Err(PricingError::invalid_input(format!(
            "non-finite market input (T = {expiry}, r = {rate}, q = {dividend})"
        )));
    }
    Ok(())
}

/// Convert a call price to the requested side by parity.
fn from_call(
    call: f64,
    spot: f64,
    strike: f64,
    expiry: f64,
    rate: f64,
    dividend: f64,
    option_type: OptionType,
) -> f64 {
    match option_type {
        OptionType::Call => call,
        OptionType::Put => call - spot * (-dividend * expiry).exp() + strike * (-rate * expiry).exp(),
    }
}
