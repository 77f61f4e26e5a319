//! Standard normal distribution functions.
//!
//! Generic over `T: Float` so the same code serves `f64` and `f32` callers.

use num_traits::Float;

/// 1 / sqrt(2 * pi)
const FRAC_1_SQRT_2PI: f64 = 0.398_942_280_401_432_7;

#[inline]
fn lit<T: Float>(x: f64) -> T {
    T::from(x).unwrap_or_else(T::nan)
}

/// Lower tail Φ(-|x|) by Hart's rational approximation (double precision,
/// as popularised by West, "Better approximations to cumulative normal
/// functions").
///
/// Accurate in relative terms deep into the tail, which keeps far
/// out-of-the-money Black-Scholes prices meaningful for the
/// implied-volatility inversion.
#[inline]
fn lower_tail<T: Float>(x: T) -> T {
    let z = x.abs();
    if z > lit(37.0) {
        return T::zero();
    }
    let e = (-z * z * lit(0.5)).exp();

    if z < lit(7.071_067_811_865_47) {
        let num = [
            3.526_249_659_989_11e-2,
            0.700_383_064_443_688,
            6.373_962_203_531_65,
            33.912_866_078_383,
            112.079_291_497_871,
            221.213_596_169_931,
            220.206_867_912_376,
        ]
        .iter()
        .fold(T::zero(), |acc, &c| acc * z + lit(c));
        let den = [
            8.838_834_764_831_84e-2,
            1.755_667_163_182_64,
            16.064_177_579_207,
            86.780_732_202_946_1,
            296.564_248_779_674,
            637.333_633_378_831,
            793.826_512_519_948,
            440.413_735_824_752,
        ]
        .iter()
        .fold(T::zero(), |acc, &c| acc * z + lit(c));
        e * num / den
    } else {
        let mut b = z + lit(0.65);
        for k in [4.0, 3.0, 2.0, 1.0] {
            b = z + lit::<T>(k) / b;
        }
        e / b / lit(2.506_628_274_631)
    }
}

/// Standard normal cumulative distribution function.
///
/// Satisfies Φ(x) + Φ(-x) = 1 up to rounding and Φ(0) = 0.5.
///
/// # Examples
/// ```
/// use pricer_models::analytical::distributions::norm_cdf;
///
/// assert!((norm_cdf(0.0_f64) - 0.5).abs() < 1e-14);
/// assert!(norm_cdf(-3.0_f64) < 0.01);
/// assert!(norm_cdf(3.0_f64) > 0.99);
/// ```
#[inline]
pub fn norm_cdf<T: Float>(x: T) -> T {
    let tail = lower_tail(x);
    if x > T::zero() {
        T::one() - tail
    } else {
        tail
    }
}

/// Standard normal probability density function.
///
/// # Examples
/// ```
/// use pricer_models::analytical::distributions::norm_pdf;
///
/// assert!((norm_pdf(0.0_f64) - 0.3989422804).abs() < 1e-9);
/// ```
#[inline]
pub fn norm_pdf<T: Float>(x: T) -> T {
    lit::<T>(FRAC_1_SQRT_2PI) * (lit::<T>(-0.5) * x * x).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_norm_cdf_reference_values() {
        assert_relative_eq!(norm_cdf(1.0_f64), 0.8413447460685429, epsilon = 1e-13);
        assert_relative_eq!(norm_cdf(-1.0_f64), 0.15865525393145707, epsilon = 1e-13);
        assert_relative_eq!(norm_cdf(2.0_f64), 0.9772498680518208, epsilon = 1e-13);
        assert_relative_eq!(norm_cdf(-2.0_f64), 0.022750131948179195, epsilon = 1e-13);
    }

    #[test]
    fn test_norm_cdf_tail_relative_accuracy() {
        // Φ(-6) = 9.865876450377e-10, Φ(-10) = 7.619853024160593e-24
        assert_relative_eq!(norm_cdf(-6.0_f64), 9.865876450377e-10, max_relative = 1e-7);
        assert_relative_eq!(norm_cdf(-10.0_f64), 7.619853024160593e-24, max_relative = 1e-7);
        assert_eq!(norm_cdf(-40.0_f64), 0.0);
    }

    #[test]
    fn test_norm_cdf_symmetry() {
        for x in [-4.0, -1.3, -0.2, 0.0, 0.7, 2.5] {
            assert_relative_eq!(norm_cdf(x) + norm_cdf(-x), 1.0, epsilon = 1e-15);
        }
        assert_relative_eq!(norm_cdf(0.0_f64), 0.5, epsilon = 1e-15);
    }

    #[test]
    fn test_norm_cdf_monotone() {
        let xs: Vec<f64> = (-800..=800).map(|i| i as f64 * 0.01).collect();
        assert!(xs.windows(2).all(|w| norm_cdf(w[0]) <= norm_cdf(w[1])));
    }

    #[test]
    fn test_norm_pdf_values() {
        assert_relative_eq!(norm_pdf(1.0_f64), 0.24197072451914337, epsilon = 1e-15);
        assert_relative_eq!(norm_pdf(-1.0_f64), norm_pdf(1.0_f64));
    }

    #[test]
    fn test_f32() {
        assert!((norm_cdf(0.5_f32) - 0.691_462_5).abs() < 1e-6);
    }
}
