//! Heston characteristic function of `ln(S_T / S_0)`.
//!
//! With `b = kappa - rho xi i u`:
//!
//! ```text
//! d = sqrt((rho xi i u - kappa)^2 + xi^2 (i u + u^2))
//! g = (b - d) / (b + d)
//! A = (r - q) i u T + kappa theta / xi^2 [(b - d) T - 2 ln((1 - g e^{-dT}) / (1 - g))]
//! B = (b - d) / xi^2 (1 - e^{-dT}) / (1 - g e^{-dT})
//! phi(u) = exp(A + B v0)
//! ```
//!
//! Principal branches are used for the square root and the logarithm; no
//! further branch tracking is applied.

use num_complex::Complex64;

use crate::models::HestonParams;

/// `E[exp(i u ln(S_T / S_0))]` under the risk-neutral Heston dynamics.
///
/// `u` may be complex; the pricer evaluates it on the line `Im u = -1/2`.
///
/// ```
/// use num_complex::Complex64;
/// use pricer_models::models::HestonParams;
/// use pricer_models::pricing::characteristic_function;
///
/// let phi = characteristic_function(Complex64::new(0.0, 0.0), 1.0, 0.05, 0.02, &HestonParams::default());
/// assert!((phi - Complex64::new(1.0, 0.0)).norm() < 1e-14);
/// ```
pub fn characteristic_function(
    u: Complex64,
    expiry: f64,
    rate: f64,
    dividend: f64,
    params: &HestonParams,
) -> Complex64 {
    let HestonParams {
        theta,
        kappa,
        xi,
        rho,
        v0,
    } = *params;
    let i = Complex64::i();
    let one = Complex64::new(1.0, 0.0);
    let xi2 = xi * xi;

    let iu = i * u;
    let b = kappa - rho * xi * iu;
    let d = ((rho * xi * iu - kappa).powi(2) + xi2 * (iu + u * u)).sqrt();
    let g = (b - d) / (b + d);

    let exp_dt = (-d * expiry).exp();
    let one_minus_g_exp = one - g * exp_dt;

    let a = (rate - dividend) * iu * expiry
        + kappa * theta / xi2 * ((b - d) * expiry - 2.0 * (one_minus_g_exp / (one - g)).ln());
    let b_coeff = (b - d) / xi2 * ((one - exp_dt) / one_minus_g_exp);

    (a + b_coeff * v0).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn params() -> HestonParams {
        HestonParams::default()
    }

    #[test]
    fn test_martingale_at_minus_i() {
        // phi(-i) = E[S_T / S_0] = exp((r - q) T)
        let phi = characteristic_function(Complex64::new(0.0, -1.0), 0.75, 0.05, 0.02, &params());
        assert_relative_eq!(phi.re, (0.03_f64 * 0.75).exp(), epsilon = 1e-12);
        assert!(phi.im.abs() < 1e-12);
    }

    #[test]
    fn test_conjugate_symmetry() {
        let u = Complex64::new(3.7, 0.0);
        let phi = characteristic_function(u, 0.5, 0.05, 0.02, &params());
        let phi_neg = characteristic_function(-u, 0.5, 0.05, 0.02, &params());
        assert_relative_eq!(phi.re, phi_neg.re, epsilon = 1e-12);
        assert_relative_eq!(phi.im, -phi_neg.im, epsilon = 1e-12);
    }

    #[test]
    fn test_modulus_bounded_on_real_axis() {
        for k in 1..200 {
            let u = Complex64::new(k as f64 * 0.5, 0.0);
            let phi = characteristic_function(u, 1.0, 0.05, 0.02, &params());
            assert!(phi.norm() <= 1.0 + 1e-12, "|phi({})| = {}", u.re, phi.norm());
        }
    }

    #[test]
    fn test_small_vol_of_vol_matches_lognormal() {
        // With xi -> 0 and v0 = theta the log-price is Gaussian with variance v0 T.
        let p = HestonParams::new(0.04, 2.0, 1e-4, 0.0, 0.04);
        let (t, r, q) = (1.0, 0.05, 0.02);
        let u = 1.3;
        let phi = characteristic_function(Complex64::new(u, 0.0), t, r, q, &p);
        let mean = (r - q - 0.02) * t;
        let expected = Complex64::new(-0.5 * 0.04 * t * u * u, u * mean).exp();
        assert_relative_eq!(phi.re, expected.re, epsilon = 1e-6);
        assert_relative_eq!(phi.im, expected.im, epsilon = 1e-6);
    }
}
