//! Rolling residual history and neighbourhood statistics.
//!
//! Every scored node appends one [`ResidualSample`]. Lookups select the
//! samples close to a node in log-moneyness and days to expiry, and younger
//! than the look-back window.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

/// One scored observation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResidualSample {
    /// When the node was scored.
    pub timestamp: DateTime<Utc>,
    /// `ln(K/S)` at scoring time.
    pub moneyness: f64,
    /// Days to expiry at scoring time.
    pub days: i64,
    /// `market_iv - model_iv`.
    pub residual: f64,
    /// Normalised residual.
    pub z: f64,
}

/// Dispersion at or below this fraction of the largest `|residual|` is
/// rounding noise around a constant bias, not a measured spread.
const RELATIVE_SIGMA_FLOOR: f64 = 1e-12;

/// Selection window around a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbourhood {
    /// Centre log-moneyness.
    pub moneyness: f64,
    /// Centre days to expiry.
    pub days: i64,
    /// Oldest timestamp that still counts.
    pub since: DateTime<Utc>,
    /// Inclusive half-width in log-moneyness.
    pub moneyness_radius: f64,
    /// Inclusive half-width in days.
    pub dte_radius: i64,
}

impl Neighbourhood {
    /// Whether `sample` falls inside the window.
    #[inline]
    pub fn contains(&self, sample: &ResidualSample) -> bool {
        sample.timestamp >= self.since
            && (sample.moneyness - self.moneyness).abs() <= self.moneyness_radius
            && (sample.days - self.days).abs() <= self.dte_radius
    }
}

/// Capacity-bounded FIFO of residual samples.
///
/// # Examples
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use strategy_signals::history::{Neighbourhood, ResidualHistory, ResidualSample};
///
/// let now = Utc.with_ymd_and_hms(2024, 1, 2, 15, 0, 0).unwrap();
/// let mut history = ResidualHistory::with_capacity(2);
/// for z in [1.0, -2.0, 3.0] {
///     history.push(ResidualSample { timestamp: now, moneyness: 0.0, days: 30, residual: z, z });
/// }
/// assert_eq!(history.len(), 2);
///
/// let around = Neighbourhood {
///     moneyness: 0.01,
///     days: 28,
///     since: now - Duration::hours(3),
///     moneyness_radius: 0.02,
///     dte_radius: 5,
/// };
/// assert_eq!(history.abs_z(&around), vec![2.0, 3.0]);
/// ```
#[derive(Debug, Clone)]
pub struct ResidualHistory {
    samples: VecDeque<ResidualSample>,
    capacity: usize,
}

impl ResidualHistory {
    /// Empty history holding at most `capacity` samples (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, dropping the oldest when full.
    pub fn push(&mut self, sample: ResidualSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Number of stored samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum number of stored samples.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &ResidualSample> {
        self.samples.iter()
    }

    /// Samples inside `around`.
    pub fn neighbours<'a>(
        &'a self,
        around: &'a Neighbourhood,
    ) -> impl Iterator<Item = &'a ResidualSample> + 'a {
        self.samples.iter().filter(move |s| around.contains(s))
    }

    /// Absolute z-scores of the samples inside `around`.
    pub fn abs_z(&self, around: &Neighbourhood) -> Vec<f64> {
        self.neighbours(around).map(|s| s.z.abs()).collect()
    }

    /// Population standard deviation of neighbouring residuals.
    ///
    /// `None` with fewer than `min_samples` neighbours or a degenerate
    /// dispersion: non-finite, or no larger than rounding noise relative to
    /// the residuals themselves.
    pub fn local_sigma(&self, around: &Neighbourhood, min_samples: usize) -> Option<f64> {
        let residuals: Vec<f64> = self.neighbours(around).map(|s| s.residual).collect();
        if residuals.len() < min_samples.max(1) {
            return None;
        }
        let scale = residuals.iter().fold(0.0_f64, |m, r| m.max(r.abs()));
        population_std(&residuals).filter(|s| s.is_finite() && *s > RELATIVE_SIGMA_FLOOR * scale)
    }

    /// `pct`-th percentile of neighbouring `|z|`, or `None` with fewer than
    /// `min_samples` neighbours.
    pub fn threshold(&self, around: &Neighbourhood, min_samples: usize, pct: f64) -> Option<f64> {
        let mut values = self.abs_z(around);
        if values.len() < min_samples.max(1) {
            return None;
        }
        percentile(&mut values, pct)
    }
}

/// Percentile with linear interpolation between order statistics.
///
/// Rank `p/100 * (n - 1)` into the sorted values. Sorts `values` in place;
/// `None` when empty.
///
/// ```
/// use strategy_signals::percentile;
///
/// let mut v = vec![4.0, 1.0, 3.0, 2.0];
/// assert_eq!(percentile(&mut v, 50.0), Some(2.5));
/// assert_eq!(percentile(&mut v, 100.0), Some(4.0));
/// assert!((percentile(&mut v, 98.0).unwrap() - 3.94).abs() < 1e-12);
/// ```
pub fn percentile(values: &mut [f64], pct: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (values.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(values[lo] + frac * (values[hi] - values[lo]))
}

fn population_std(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some(var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 15, 0, 0).unwrap()
    }

    fn sample(timestamp: DateTime<Utc>, moneyness: f64, days: i64, residual: f64) -> ResidualSample {
        ResidualSample {
            timestamp,
            moneyness,
            days,
            residual,
            z: residual * 10.0,
        }
    }

    fn around(moneyness: f64, days: i64) -> Neighbourhood {
        Neighbourhood {
            moneyness,
            days,
            since: now() - Duration::hours(3),
            moneyness_radius: 0.02,
            dte_radius: 5,
        }
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut history = ResidualHistory::with_capacity(3);
        for i in 0..5 {
            history.push(sample(now(), 0.0, 30, i as f64));
        }
        assert_eq!(history.len(), 3);
        let residuals: Vec<f64> = history.iter().map(|s| s.residual).collect();
        assert_eq!(residuals, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut history = ResidualHistory::with_capacity(0);
        history.push(sample(now(), 0.0, 30, 1.0));
        history.push(sample(now(), 0.0, 30, 2.0));
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_neighbourhood_edges_are_inclusive() {
        let n = around(0.0, 30);
        assert!(n.contains(&sample(now(), 0.02, 35, 0.0)));
        assert!(n.contains(&sample(now() - Duration::hours(3), -0.02, 25, 0.0)));
        assert!(!n.contains(&sample(now(), 0.0201, 30, 0.0)));
        assert!(!n.contains(&sample(now(), 0.0, 36, 0.0)));
        assert!(!n.contains(&sample(now() - Duration::minutes(181), 0.0, 30, 0.0)));
    }

    #[test]
    fn test_local_sigma_needs_min_samples() {
        let mut history = ResidualHistory::with_capacity(1_000);
        for i in 0..99 {
            history.push(sample(now(), 0.0, 30, if i % 2 == 0 { 0.01 } else { -0.01 }));
        }
        assert_eq!(history.local_sigma(&around(0.0, 30), 100), None);

        history.push(sample(now(), 0.0, 30, -0.01));
        let sigma = history.local_sigma(&around(0.0, 30), 100).unwrap();
        assert_relative_eq!(sigma, 0.01, epsilon = 1e-4);
    }

    #[test]
    fn test_local_sigma_ignores_distant_and_stale() {
        let mut history = ResidualHistory::with_capacity(1_000);
        for _ in 0..200 {
            history.push(sample(now(), 0.5, 30, 1.0));
            history.push(sample(now() - Duration::hours(4), 0.0, 30, -1.0));
        }
        assert_eq!(history.local_sigma(&around(0.0, 30), 100), None);
    }

    #[test]
    fn test_constant_residuals_have_no_sigma() {
        let mut history = ResidualHistory::with_capacity(1_000);
        for _ in 0..150 {
            history.push(sample(now(), 0.0, 30, 0.003));
        }
        assert_eq!(history.local_sigma(&around(0.0, 30), 100), None);
    }

    #[test]
    fn test_constant_bias_rounding_noise_has_no_sigma() {
        for bias in [0.0047, 0.0113, -0.0077, 0.0219] {
            let mut history = ResidualHistory::with_capacity(1_000);
            for _ in 0..130 {
                history.push(sample(now(), 0.0, 30, bias));
            }
            assert_eq!(history.local_sigma(&around(0.0, 30), 100), None, "bias {bias}");
        }
    }

    #[test]
    fn test_all_zero_residuals_have_no_sigma() {
        let mut history = ResidualHistory::with_capacity(1_000);
        for _ in 0..120 {
            history.push(sample(now(), 0.0, 30, 0.0));
        }
        assert_eq!(history.local_sigma(&around(0.0, 30), 100), None);
    }

    #[test]
    fn test_small_genuine_spread_keeps_sigma() {
        let mut history = ResidualHistory::with_capacity(1_000);
        for i in 0..120 {
            let wiggle = if i % 2 == 0 { 1e-6 } else { -1e-6 };
            history.push(sample(now(), 0.0, 30, 0.01 + wiggle));
        }
        let sigma = history.local_sigma(&around(0.0, 30), 100).unwrap();
        assert_relative_eq!(sigma, 1e-6, epsilon = 1e-9);
    }

    #[test]
    fn test_threshold_falls_back_below_default_minimum() {
        let mut history = ResidualHistory::with_capacity(1_000);
        for i in 0..99 {
            history.push(sample(now(), 0.0, 30, (i as f64) / 100.0));
        }
        assert_eq!(history.threshold(&around(0.0, 30), 100, 98.0), None);

        history.push(sample(now(), 0.0, 30, 0.5));
        assert!(history.threshold(&around(0.0, 30), 100, 98.0).is_some());
    }

    #[test]
    fn test_threshold_percentile() {
        let mut history = ResidualHistory::with_capacity(1_000);
        for i in 0..101 {
            // |z| = 0, 0.1, ..., 10.0
            history.push(sample(now(), 0.0, 30, -(i as f64) / 100.0));
        }
        let t = history.threshold(&around(0.0, 30), 100, 98.0).unwrap();
        assert_relative_eq!(t, 9.8, epsilon = 1e-12);
        assert_eq!(history.threshold(&around(0.0, 30), 200, 98.0), None);
    }

    #[test]
    fn test_percentile_edges() {
        assert_eq!(percentile(&mut [], 50.0), None);
        assert_eq!(percentile(&mut [7.0], 98.0), Some(7.0));
        let mut v = [1.0, 2.0];
        assert_eq!(percentile(&mut v, 0.0), Some(1.0));
        assert_eq!(percentile(&mut v, 250.0), Some(2.0));
    }
}
