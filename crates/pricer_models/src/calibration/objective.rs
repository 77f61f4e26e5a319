//! Calibration inputs and the objective minimised by both solver stages.

use std::ops::Range;
use std::sync::Arc;

use pricer_core::market_data::curves::RateCurve;
use pricer_core::market_data::surfaces::VolSurfacePoint;
use pricer_core::math::solvers::{within_bounds, ParameterBounds};
use pricer_core::math::CompositeRule;
use pricer_core::types::{Date, PricingError, DAYS_PER_YEAR};
use tracing::trace;

use super::config::CalibrationConfig;
use crate::models::{HestonParamIndex, HestonParams};
use crate::pricing::{HestonPricer, PricingConfig};

/// One quote after filtering, with its curve inputs resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedQuote {
    /// Strike.
    pub strike: f64,
    /// Expiry date.
    pub expiry: Date,
    /// Calendar days from valuation to expiry.
    pub days: i64,
    /// Year fraction, `days / 365`.
    pub time: f64,
    /// `ln(K / S)`.
    pub log_moneyness: f64,
    /// Quoted implied volatility.
    pub market_vol: f64,
    /// Risk-free rate at `time`.
    pub rate: f64,
    /// Dividend yield at `time`.
    pub dividend: f64,
    /// Normalised calibration weight; weights sum to one.
    pub weight: f64,
}

/// Quotes ready for calibration, sorted by expiry then strike.
#[derive(Debug, Clone, Default)]
pub struct PreparedSurface {
    spot: f64,
    quotes: Vec<PreparedQuote>,
    slices: Vec<Range<usize>>,
    dropped: usize,
}

impl PreparedSurface {
    /// Filter and weight `surface` as of `valuation`.
    ///
    /// Drops quotes that are expired, have a non-positive or non-finite
    /// strike, or an implied vol outside `[min_implied_vol, max_implied_vol]`.
    /// Weights are volume shares raised to `liquid_bias` and renormalised;
    /// uniform when no quote carries volume.
    pub fn new(
        surface: &[VolSurfacePoint],
        spot: f64,
        rates: &dyn RateCurve,
        dividends: &dyn RateCurve,
        valuation: Date,
        config: &CalibrationConfig,
    ) -> Self {
        let spot_ok = spot.is_finite() && spot > 0.0;
        let mut quotes: Vec<(PreparedQuote, f64)> = surface
            .iter()
            .filter_map(|q| {
                let days = q.expiry.days_since(valuation);
                let keep = spot_ok
                    && days > 0
                    && q.strike.is_finite()
                    && q.strike > 0.0
                    && q.implied_vol >= config.min_implied_vol
                    && q.implied_vol <= config.max_implied_vol;
                if !keep {
                    return None;
                }
                let time = days as f64 / DAYS_PER_YEAR;
                let volume = if q.volume.is_finite() { q.volume.max(0.0) } else { 0.0 };
                Some((
                    PreparedQuote {
                        strike: q.strike,
                        expiry: q.expiry,
                        days,
                        time,
                        log_moneyness: (q.strike / spot).ln(),
                        market_vol: q.implied_vol,
                        rate: rates.rate(time),
                        dividend: dividends.rate(time),
                        weight: 0.0,
                    },
                    volume,
                ))
            })
            .collect();

        let dropped = surface.len() - quotes.len();
        quotes.sort_by(|a, b| {
            a.0.expiry
                .cmp(&b.0.expiry)
                .then(a.0.strike.total_cmp(&b.0.strike))
        });

        let volumes: Vec<f64> = quotes.iter().map(|(_, v)| *v).collect();
        let weights = liquidity_weights(&volumes, config.liquid_bias);
        let quotes: Vec<PreparedQuote> = quotes
            .into_iter()
            .zip(weights)
            .map(|((q, _), weight)| PreparedQuote { weight, ..q })
            .collect();

        let mut slices = Vec::new();
        let mut start = 0;
        for i in 1..=quotes.len() {
            if i == quotes.len() || quotes[i].expiry != quotes[start].expiry {
                slices.push(start..i);
                start = i;
            }
        }

        Self {
            spot,
            quotes,
            slices,
            dropped,
        }
    }

    /// Spot used for moneyness and pricing.
    pub fn spot(&self) -> f64 {
        self.spot
    }

    /// Surviving quotes.
    pub fn quotes(&self) -> &[PreparedQuote] {
        &self.quotes
    }

    /// Number of surviving quotes.
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    /// No quote survived filtering.
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Number of quotes removed by the filters.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Quotes grouped by expiry.
    pub fn expiry_slices(&self) -> impl Iterator<Item = &[PreparedQuote]> + '_ {
        self.slices.iter().map(move |r| &self.quotes[r.clone()])
    }

    /// Model implied vol for every quote, in [`PreparedSurface::quotes`] order.
    pub fn model_vols(&self, pricer: &HestonPricer) -> Vec<Result<f64, PricingError>> {
        let price_slice = |slice: &[PreparedQuote]| -> Vec<Result<f64, PricingError>> {
            slice
                .iter()
                .map(|q| pricer.model_implied_vol(self.spot, q.strike, q.time, q.rate, q.dividend))
                .collect()
        };
        let slices: Vec<&[PreparedQuote]> = self.expiry_slices().collect();

        #[cfg(feature = "parallel")]
        let per_slice: Vec<Vec<Result<f64, PricingError>>> = {
            use rayon::prelude::*;
            slices.par_iter().map(|s| price_slice(*s)).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let per_slice: Vec<Vec<Result<f64, PricingError>>> =
            slices.iter().map(|s| price_slice(*s)).collect();

        per_slice.into_iter().flatten().collect()
    }
}

/// Volume shares raised to `bias` and renormalised.
///
/// ```
/// use pricer_models::calibration::liquidity_weights;
///
/// let w = liquidity_weights(&[100.0, 300.0], 1.5);
/// assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
/// assert!(w[1] / w[0] > 3.0);
/// assert_eq!(liquidity_weights(&[0.0, 0.0], 1.5), vec![0.5, 0.5]);
/// ```
pub fn liquidity_weights(volumes: &[f64], bias: f64) -> Vec<f64> {
    let n = volumes.len();
    if n == 0 {
        return Vec::new();
    }
    let uniform = vec![1.0 / n as f64; n];
    let total: f64 = volumes.iter().sum();
    if !(total > 0.0) {
        return uniform;
    }
    let biased: Vec<f64> = volumes.iter().map(|v| (v / total).powf(bias)).collect();
    let norm: f64 = biased.iter().sum();
    if !(norm > 0.0 && norm.is_finite()) {
        return uniform;
    }
    biased.into_iter().map(|w| w / norm).collect()
}

/// Last accepted fit, used for regularisation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prior {
    /// Accepted parameters.
    pub params: HestonParams,
    /// Their RMSE.
    pub rmse: f64,
}

/// Regularised weighted-RMSE objective over a [`PreparedSurface`].
///
/// `value(p) = sqrt(sum w_i (iv_model_i - iv_market_i)^2) + alpha |p - p_prior|^2`
/// with `alpha = alpha0 (rmse_prior / residual_reference)^2`, and zero
/// without a prior. Out-of-bounds vectors and pricing failures return the
/// sentinel.
#[derive(Debug)]
pub struct Objective<'a> {
    surface: &'a PreparedSurface,
    rule: Arc<CompositeRule>,
    pricing: PricingConfig,
    bounds: [ParameterBounds; HestonParamIndex::COUNT],
    prior: Option<Prior>,
    alpha: f64,
    sentinel: f64,
}

impl<'a> Objective<'a> {
    /// Objective for `surface` under `config`, regularised toward `prior`.
    pub fn new(
        surface: &'a PreparedSurface,
        rule: Arc<CompositeRule>,
        config: &CalibrationConfig,
        prior: Option<Prior>,
    ) -> Self {
        let alpha = prior.map_or(0.0, |p| {
            config.alpha0 * (p.rmse / config.residual_reference).powi(2)
        });
        Self {
            surface,
            rule,
            pricing: config.pricing,
            bounds: config.bounds.as_array(),
            prior,
            alpha,
            sentinel: config.sentinel,
        }
    }

    /// Regularisation strength in use.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Value returned for infeasible vectors.
    pub fn sentinel(&self) -> f64 {
        self.sentinel
    }

    /// Pricer for `params` sharing this objective's quadrature rule.
    pub fn pricer(&self, params: HestonParams) -> HestonPricer {
        HestonPricer::with_rule(params, Arc::clone(&self.rule), self.pricing)
    }

    /// Weighted RMSE of model vs market implied vols, without regularisation.
    ///
    /// `None` when the surface is empty or any quote fails to price.
    pub fn rmse(&self, params: &HestonParams) -> Option<f64> {
        if self.surface.is_empty() {
            return None;
        }
        let pricer = self.pricer(*params);
        let mut sse = 0.0;
        for (quote, model) in self.surface.quotes().iter().zip(self.surface.model_vols(&pricer)) {
            match model {
                Ok(vol) => sse += quote.weight * (vol - quote.market_vol).powi(2),
                Err(err) => {
                    trace!(strike = quote.strike, days = quote.days, error = %err, "objective pricing failure");
                    return None;
                }
            }
        }
        let rmse = sse.sqrt();
        rmse.is_finite().then_some(rmse)
    }

    /// `alpha |p - p_prior|^2`.
    pub fn regularisation(&self, params: &HestonParams) -> f64 {
        self.prior
            .map_or(0.0, |prior| self.alpha * params.distance_squared(&prior.params))
    }

    /// Objective value for a solver vector in [`HestonParamIndex`] order.
    pub fn value(&self, x: &[f64]) -> f64 {
        if !within_bounds(x, &self.bounds) {
            return self.sentinel;
        }
        let Some(params) = HestonParams::from_slice(x) else {
            return self.sentinel;
        };
        match self.rmse(&params) {
            Some(rmse) => {
                let value = rmse + self.regularisation(&params);
                if value.is_finite() {
                    value
                } else {
                    self.sentinel
                }
            }
            None => self.sentinel,
        }
    }
}
