//! Scalar Kalman filter over `|z|`.
//!
//! Random-walk state with fixed noise:
//!
//! ```text
//! predict:  P = P + Q
//! update:   K = P / (P + R)
//!           x = x + K (y - x)
//!           P = (1 - K) P
//! ```

/// Fixed process and observation noise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KalmanNoise {
    /// Process noise `Q`.
    pub process: f64,
    /// Observation noise `R`.
    pub observation: f64,
}

impl KalmanNoise {
    /// Noise pair `(Q, R)`.
    pub fn new(process: f64, observation: f64) -> Self {
        Self {
            process,
            observation,
        }
    }
}

/// Filter state of one node.
///
/// # Examples
/// ```
/// use strategy_signals::{KalmanNoise, KalmanState};
///
/// let noise = KalmanNoise::new(0.02, 1.0);
/// let mut state = KalmanState::default();
/// let first = state.update(3.0, noise);
/// // Gain on the first step is 1.02 / 2.02.
/// assert!((first - 3.0 * 1.02 / 2.02).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KalmanState {
    /// Smoothed `|z|`.
    pub estimate: f64,
    /// Error covariance `P`.
    pub error_covariance: f64,
}

impl Default for KalmanState {
    fn default() -> Self {
        Self {
            estimate: 0.0,
            error_covariance: 1.0,
        }
    }
}

impl KalmanState {
    /// Fold in one observation and return the new estimate.
    ///
    /// Non-finite observations leave the state untouched.
    pub fn update(&mut self, observation: f64, noise: KalmanNoise) -> f64 {
        if !observation.is_finite() {
            return self.estimate;
        }
        let predicted = self.error_covariance + noise.process;
        let gain = predicted / (predicted + noise.observation);
        self.estimate += gain * (observation - self.estimate);
        self.error_covariance = (1.0 - gain) * predicted;
        self.estimate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    const NOISE: KalmanNoise = KalmanNoise {
        process: 0.02,
        observation: 1.0,
    };

    #[test]
    fn test_initial_state() {
        let state = KalmanState::default();
        assert_eq!(state.estimate, 0.0);
        assert_eq!(state.error_covariance, 1.0);
    }

    #[test]
    fn test_single_step() {
        let mut state = KalmanState::default();
        let k = 1.02 / 2.02;
        let x = state.update(2.0, NOISE);
        assert_relative_eq!(x, 2.0 * k, epsilon = 1e-15);
        assert_relative_eq!(state.error_covariance, (1.0 - k) * 1.02, epsilon = 1e-15);
    }

    #[test]
    fn test_covariance_reaches_steady_state() {
        let mut state = KalmanState::default();
        for _ in 0..500 {
            state.update(1.0, NOISE);
        }
        // Steady state solves P = (P + Q) R / (P + Q + R).
        let q = NOISE.process;
        let p = 0.5 * (-q + (q * q + 4.0 * q * NOISE.observation).sqrt());
        assert_relative_eq!(state.error_covariance, p, epsilon = 1e-10);
    }

    #[test]
    fn test_non_finite_observation_ignored() {
        let mut state = KalmanState::default();
        state.update(1.0, NOISE);
        let before = state;
        assert_eq!(state.update(f64::NAN, NOISE), before.estimate);
        assert_eq!(state, before);
    }

    proptest! {
        #[test]
        fn constant_observation_converges_monotonically(c in 0.0..10.0f64, q in 0.001..0.5f64, r in 0.1..5.0f64) {
            let noise = KalmanNoise::new(q, r);
            let mut state = KalmanState::default();
            let mut gap = (c - state.estimate).abs();
            for _ in 0..2_000 {
                let x = state.update(c, noise);
                let next = (c - x).abs();
                prop_assert!(next <= gap + 1e-12);
                prop_assert!(x <= c + 1e-12);
                gap = next;
            }
            prop_assert!(gap < 1e-3 * c.max(1.0));
        }
    }
}
