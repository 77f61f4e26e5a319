//! Surface-level pricing: one pass per expiry over a set of market quotes.
//!
//! Quotes are grouped by expiry so that each group reuses one set of
//! memoised integrand weights. With the `parallel` feature the groups are
//! priced concurrently.

use std::collections::BTreeMap;

use pricer_core::market_data::curves::RateCurve;
use pricer_core::market_data::surfaces::{QuoteKey, VolSurfacePoint};
use pricer_core::types::{year_fraction, Date, OptionType};

use super::HestonPricer;

/// Key of a theoretical price: quote location plus option side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OptionKey {
    /// Strike and expiry.
    pub quote: QuoteKey,
    /// Call or put.
    pub option_type: OptionType,
}

/// Market inputs shared by every quote of one expiry.
#[derive(Debug, Clone, Copy)]
struct ExpiryInputs {
    expiry: f64,
    rate: f64,
    dividend: f64,
    forward: f64,
}

impl ExpiryInputs {
    fn new(spot: f64, expiry: f64, rates: &dyn RateCurve, dividends: &dyn RateCurve) -> Self {
        let rate = rates.rate(expiry);
        let dividend = dividends.rate(expiry);
        Self {
            expiry,
            rate,
            dividend,
            forward: spot * ((rate - dividend) * expiry).exp(),
        }
    }

    /// Quoted side, or the out-of-the-money side when none is given.
    fn side(&self, quote: &VolSurfacePoint) -> OptionType {
        quote
            .option_type
            .unwrap_or_else(|| OptionType::out_of_the_money(quote.strike, self.forward))
    }
}

fn group_by_expiry(quotes: &[VolSurfacePoint]) -> Vec<(Date, Vec<&VolSurfacePoint>)> {
    let mut groups: BTreeMap<Date, Vec<&VolSurfacePoint>> = BTreeMap::new();
    for quote in quotes {
        groups.entry(quote.expiry).or_default().push(quote);
    }
    groups.into_iter().collect()
}

#[cfg(feature = "parallel")]
fn map_groups<'a, T, F>(groups: &[(Date, Vec<&'a VolSurfacePoint>)], f: F) -> Vec<T>
where
    T: Send,
    F: Fn(Date, &[&'a VolSurfacePoint]) -> Vec<T> + Sync + Send,
{
    use rayon::prelude::*;

    groups
        .par_iter()
        .map(|(expiry, quotes)| f(*expiry, quotes))
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn map_groups<'a, T, F>(groups: &[(Date, Vec<&'a VolSurfacePoint>)], f: F) -> Vec<T>
where
    F: Fn(Date, &[&'a VolSurfacePoint]) -> Vec<T>,
{
    groups
        .iter()
        .flat_map(|(expiry, quotes)| f(*expiry, quotes))
        .collect()
}

/// Theoretical price for every quote.
///
/// Each quote is priced on its quoted side, or on the out-of-the-money side
/// when the quote does not carry one. Fourier failures fall back to
/// Black-Scholes at `sqrt(v0)`. Expired quotes get intrinsic value.
pub fn theoretical_prices(
    pricer: &HestonPricer,
    quotes: &[VolSurfacePoint],
    spot: f64,
    rates: &dyn RateCurve,
    dividends: &dyn RateCurve,
    valuation: Date,
) -> BTreeMap<OptionKey, f64> {
    let groups = group_by_expiry(quotes);
    map_groups(&groups, |expiry, group| {
        let inputs = ExpiryInputs::new(spot, year_fraction(valuation, expiry), rates, dividends);
        group
            .iter()
            .map(|quote| {
                let option_type = inputs.side(quote);
                let value = pricer.price_or_fallback(
                    spot,
                    quote.strike,
                    inputs.expiry,
                    inputs.rate,
                    inputs.dividend,
                    option_type,
                );
                (
                    OptionKey {
                        quote: quote.key(),
                        option_type,
                    },
                    value,
                )
            })
            .collect()
    })
    .into_iter()
    .collect()
}

/// Model implied-volatility surface at the locations of `quotes`.
///
/// Expired quotes are dropped. The returned points keep each quote's
/// strike, expiry, volume and side with `implied_vol` replaced by the model
/// value; a quote whose Fourier price fails gets `sqrt(v0)`, the volatility
/// of the Black-Scholes fallback.
pub fn model_surface(
    pricer: &HestonPricer,
    quotes: &[VolSurfacePoint],
    spot: f64,
    rates: &dyn RateCurve,
    dividends: &dyn RateCurve,
    valuation: Date,
) -> Vec<VolSurfacePoint> {
    let groups = group_by_expiry(quotes);
    let iv_config = pricer.config().implied_vol;
    let fallback_vol = iv_config.bounds().clamp(pricer.params().v0.max(0.0).sqrt());

    map_groups(&groups, |expiry, group| {
        let t = year_fraction(valuation, expiry);
        if t <= 0.0 {
            return Vec::new();
        }
        let inputs = ExpiryInputs::new(spot, t, rates, dividends);
        group
            .iter()
            .map(|quote| {
                let model_vol = pricer
                    .model_implied_vol(spot, quote.strike, inputs.expiry, inputs.rate, inputs.dividend)
                    .unwrap_or(fallback_vol);
                VolSurfacePoint {
                    implied_vol: model_vol,
                    ..(*quote).clone()
                }
            })
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HestonParams;
    use crate::pricing::PricingConfig;
    use approx::assert_relative_eq;
    use pricer_core::market_data::curves::FlatCurve;

    fn valuation() -> Date {
        Date::from_ymd(2024, 1, 2).unwrap()
    }

    fn quotes() -> Vec<VolSurfacePoint> {
        let mut out = Vec::new();
        for days in [30, 60] {
            let expiry = valuation().add_days(days);
            for strike in [90.0, 100.0, 110.0] {
                out.push(VolSurfacePoint::new(strike, expiry, 0.2));
            }
        }
        out.push(VolSurfacePoint::new(100.0, valuation(), 0.2).with_option_type(OptionType::Call));
        out
    }

    #[test]
    fn test_theoretical_prices_cover_every_quote() {
        let pricer = HestonPricer::new(HestonParams::default(), PricingConfig::default()).unwrap();
        let (r, q) = (FlatCurve::new(0.05), FlatCurve::new(0.02));
        let prices = theoretical_prices(&pricer, &quotes(), 100.0, &r, &q, valuation());
        assert_eq!(prices.len(), 7);

        let expiry = valuation().add_days(30);
        let put = OptionKey {
            quote: QuoteKey::new(90.0, expiry),
            option_type: OptionType::Put,
        };
        let direct = pricer
            .price(100.0, 90.0, 30.0 / 365.0, 0.05, 0.02, OptionType::Put)
            .unwrap();
        assert_relative_eq!(prices[&put], direct, epsilon = 1e-12);

        let expired = OptionKey {
            quote: QuoteKey::new(100.0, valuation()),
            option_type: OptionType::Call,
        };
        assert_eq!(prices[&expired], 0.0);
    }

    #[test]
    fn test_model_surface_drops_expired_and_keeps_metadata() {
        let pricer = HestonPricer::new(HestonParams::default(), PricingConfig::default()).unwrap();
        let (r, q) = (FlatCurve::new(0.05), FlatCurve::new(0.02));
        let market: Vec<_> = quotes().into_iter().map(|p| p.with_volume(42.0)).collect();
        let model = model_surface(&pricer, &market, 100.0, &r, &q, valuation());
        assert_eq!(model.len(), 6);
        assert!(model.iter().all(|p| p.volume == 42.0));
        assert!(model.iter().all(|p| p.implied_vol > 0.1 && p.implied_vol < 0.3));
        assert_eq!(pricer.cached_expiries(), 2);
    }

    #[test]
    fn test_model_surface_falls_back_to_sqrt_v0() {
        let mut params = HestonParams::default();
        params.xi = f64::NAN;
        params.v0 = 0.09;
        let pricer = HestonPricer::new(params, PricingConfig::default()).unwrap();
        let (r, q) = (FlatCurve::new(0.05), FlatCurve::new(0.02));
        let model = model_surface(&pricer, &quotes(), 100.0, &r, &q, valuation());
        assert!(model.iter().all(|p| (p.implied_vol - 0.3).abs() < 1e-12));
    }
}
