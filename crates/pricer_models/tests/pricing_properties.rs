//! Property tests for the Fourier pricer and the implied-vol inversion.

use approx::assert_relative_eq;
use pricer_core::types::OptionType;
use pricer_models::analytical::{black_scholes, implied_volatility, ImpliedVolConfig};
use pricer_models::models::HestonParams;
use pricer_models::pricing::{HestonPricer, PricingConfig};
use proptest::prelude::*;

// Kept away from the xi/rho/v0 corner where the truncated integral ripples
// by more than the monotonicity tolerance.
fn heston_params() -> impl Strategy<Value = HestonParams> {
    (0.02..0.08f64, 0.5..5.0f64, 0.1..0.6f64, -0.8..-0.05f64, 0.02..0.1f64)
        .prop_map(|(theta, kappa, xi, rho, v0)| HestonParams::new(theta, kappa, xi, rho, v0))
}

fn pricer(params: HestonParams) -> HestonPricer {
    HestonPricer::new(params, PricingConfig::default()).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn put_call_parity_holds(
        params in heston_params(),
        spot in 50.0..150.0f64,
        strike in 50.0..150.0f64,
        expiry in 0.05..2.0f64,
        rate in 0.0..0.08f64,
        dividend in 0.0..0.05f64,
    ) {
        let p = pricer(params);
        let call = p.price(spot, strike, expiry, rate, dividend, OptionType::Call).unwrap();
        let put = p.price(spot, strike, expiry, rate, dividend, OptionType::Put).unwrap();
        let forward_value = spot * (-dividend * expiry).exp() - strike * (-rate * expiry).exp();
        prop_assert!((call - put - forward_value).abs() < 1e-9);
    }

    #[test]
    fn calls_decrease_in_strike(
        params in heston_params(),
        strike in 70.0..130.0f64,
        expiry in 0.25..2.0f64,
    ) {
        let p = pricer(params);
        let lower = p.price(100.0, strike, expiry, 0.05, 0.02, OptionType::Call).unwrap();
        let higher = p.price(100.0, strike + 5.0, expiry, 0.05, 0.02, OptionType::Call).unwrap();
        prop_assert!(lower + 1e-4 >= higher, "C({}) = {} < C({}) = {}", strike, lower, strike + 5.0, higher);
    }

    #[test]
    fn calls_increase_and_puts_decrease_in_spot(
        params in heston_params(),
        spot in 70.0..130.0f64,
        expiry in 0.25..2.0f64,
    ) {
        let p = pricer(params);
        let c0 = p.price(spot, 100.0, expiry, 0.05, 0.02, OptionType::Call).unwrap();
        let c1 = p.price(spot + 5.0, 100.0, expiry, 0.05, 0.02, OptionType::Call).unwrap();
        let p0 = p.price(spot, 100.0, expiry, 0.05, 0.02, OptionType::Put).unwrap();
        let p1 = p.price(spot + 5.0, 100.0, expiry, 0.05, 0.02, OptionType::Put).unwrap();
        prop_assert!(c1 + 1e-4 >= c0);
        prop_assert!(p1 <= p0 + 1e-4);
    }

    #[test]
    fn expired_options_pay_intrinsic(
        params in heston_params(),
        spot in 50.0..150.0f64,
        strike in 50.0..150.0f64,
    ) {
        let p = pricer(params);
        let call = p.price(spot, strike, 0.0, 0.05, 0.02, OptionType::Call).unwrap();
        let put = p.price(spot, strike, 0.0, 0.05, 0.02, OptionType::Put).unwrap();
        prop_assert_eq!(call, (spot - strike).max(0.0));
        prop_assert_eq!(put, (strike - spot).max(0.0));
    }

    #[test]
    fn implied_vol_round_trip(
        sigma in 0.05..0.8f64,
        expiry in 0.02..2.0f64,
        z in -0.5..0.5f64,
    ) {
        let (spot, rate, dividend) = (100.0, 0.05, 0.02);
        let forward = spot * ((rate - dividend) * expiry).exp();
        let strike = forward * (z * sigma * expiry.sqrt()).exp();
        let side = OptionType::out_of_the_money(strike, forward);
        let target = black_scholes::price(spot, strike, expiry, rate, dividend, sigma, side);

        let iv = implied_volatility(target, spot, strike, expiry, rate, dividend, side, &ImpliedVolConfig::default());
        prop_assert!((iv - sigma).abs() < 1e-3, "sigma = {}, recovered {}", sigma, iv);

        let via_pricer = pricer(HestonParams::default())
            .implied_volatility_from_price(target, spot, strike, expiry, rate, dividend, side);
        prop_assert_eq!(iv, via_pricer);
    }
}

#[test]
fn memoisation_does_not_change_prices() {
    let p = pricer(HestonParams::default());
    let cold = p.price(100.0, 97.5, 0.3, 0.04, 0.01, OptionType::Call).unwrap();
    let warm = p.price(100.0, 97.5, 0.3, 0.04, 0.01, OptionType::Call).unwrap();
    assert_eq!(cold, warm);

    let fresh = pricer(HestonParams::default());
    let strikes = [95.0, 97.5, 100.0];
    let batch = fresh.call_prices(100.0, &strikes, 0.3, 0.04, 0.01).unwrap();
    assert_relative_eq!(batch[1], cold, epsilon = 1e-14);
}

#[test]
fn model_smile_is_skewed_by_correlation() {
    let negative = pricer(HestonParams::new(0.04, 2.0, 0.5, -0.8, 0.04));
    let positive_side = pricer(HestonParams::new(0.04, 2.0, 0.5, -0.05, 0.04));
    let skew = |p: &HestonPricer| {
        p.model_implied_vol(100.0, 90.0, 0.5, 0.05, 0.02).unwrap()
            - p.model_implied_vol(100.0, 110.0, 0.5, 0.05, 0.02).unwrap()
    };
    assert!(skew(&negative) > skew(&positive_side));
    assert!(skew(&negative) > 0.0);
}
