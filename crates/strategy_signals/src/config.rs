//! Signal engine settings.

use chrono::{Duration, FixedOffset, NaiveTime};

use crate::error::SignalError;

/// Time-of-day entry gate settings.
///
/// Times are wall-clock times at `utc_offset_minutes` from UTC.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GateConfig {
    /// When false every entry passes.
    pub enabled: bool,
    /// Session open.
    pub session_open: NaiveTime,
    /// Session close.
    pub session_close: NaiveTime,
    /// Offset of the session's clock from UTC, in minutes.
    pub utc_offset_minutes: i32,
    /// Minutes blocked after the open and before the close.
    pub block_minutes: i64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            session_open: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN),
            session_close: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or(NaiveTime::MIN),
            utc_offset_minutes: -5 * 60,
            block_minutes: 15,
        }
    }
}

impl GateConfig {
    /// The session's UTC offset.
    pub fn offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_minutes.checked_mul(60)?)
    }

    /// Reject sessions with no tradable time left after blocking.
    pub fn validate(&self) -> Result<(), SignalError> {
        if self.offset().is_none() {
            return Err(SignalError::invalid_config(format!(
                "utc_offset_minutes {} is out of range",
                self.utc_offset_minutes
            )));
        }
        if self.block_minutes < 0 {
            return Err(SignalError::invalid_config("block_minutes must be non-negative"));
        }
        let session = self.session_close - self.session_open;
        match self.block_minutes.checked_mul(2).and_then(Duration::try_minutes) {
            Some(blocked) if session > blocked => Ok(()),
            _ => Err(SignalError::invalid_config(format!(
                "session {}-{} leaves no time outside the {}-minute blocks",
                self.session_open, self.session_close, self.block_minutes
            ))),
        }
    }
}

/// Settings for [`crate::SignalEngine`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SignalConfig {
    /// Kalman process noise `Q`.
    pub process_noise: f64,
    /// Kalman observation noise `R`.
    pub observation_noise: f64,
    /// Neighbourhood half-width in log-moneyness `ln(K/S)`.
    pub moneyness_radius: f64,
    /// Neighbourhood half-width in days to expiry.
    pub dte_radius_days: i64,
    /// Only history younger than this many hours counts.
    pub window_hours: f64,
    /// Neighbours required before history-based sigma and thresholds are used.
    pub min_samples: usize,
    /// Percentile of neighbourhood `|z|` used as the entry threshold, in `[0, 100]`.
    pub percentile: f64,
    /// Entry threshold while history is thin.
    pub default_threshold: f64,
    /// Residual dispersion while history is thin.
    pub default_sigma: f64,
    /// Open positions exit once their `|z|` drops below this.
    pub exit_threshold: f64,
    /// Residual history capacity.
    pub history_capacity: usize,
    /// Maximum number of live nodes before the least recently touched is evicted.
    pub node_capacity: usize,
    /// Entry gate.
    pub gate: GateConfig,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            process_noise: 0.02,
            observation_noise: 1.0,
            moneyness_radius: 0.02,
            dte_radius_days: 5,
            window_hours: 3.0,
            min_samples: 100,
            percentile: 98.0,
            default_threshold: 2.5,
            default_sigma: 1.0,
            exit_threshold: 1.0,
            history_capacity: 10_000,
            node_capacity: 10_000,
            gate: GateConfig::default(),
        }
    }
}

impl SignalConfig {
    /// Look-back window as a duration.
    pub fn window(&self) -> Option<Duration> {
        let millis = self.window_hours * 3_600_000.0;
        if millis.is_finite() && millis > 0.0 && millis < i64::MAX as f64 {
            Duration::try_milliseconds(millis as i64)
        } else {
            None
        }
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), SignalError> {
        if !(self.process_noise >= 0.0 && self.process_noise.is_finite()) {
            return Err(SignalError::invalid_config("process_noise must be non-negative"));
        }
        if !(self.observation_noise > 0.0 && self.observation_noise.is_finite()) {
            return Err(SignalError::invalid_config("observation_noise must be positive"));
        }
        if !(self.moneyness_radius >= 0.0) || self.dte_radius_days < 0 {
            return Err(SignalError::invalid_config("neighbourhood radii must be non-negative"));
        }
        if self.window().is_none() {
            return Err(SignalError::invalid_config(format!(
                "window_hours must be positive, got {}",
                self.window_hours
            )));
        }
        if !(0.0..=100.0).contains(&self.percentile) {
            return Err(SignalError::invalid_config(format!(
                "percentile must lie in [0, 100], got {}",
                self.percentile
            )));
        }
        if !(self.default_sigma > 0.0 && self.default_sigma.is_finite()) {
            return Err(SignalError::invalid_config("default_sigma must be positive"));
        }
        if !(self.default_threshold >= 0.0 && self.exit_threshold >= 0.0) {
            return Err(SignalError::invalid_config("thresholds must be non-negative"));
        }
        if self.history_capacity == 0 || self.node_capacity == 0 {
            return Err(SignalError::invalid_config("capacities must be at least 1"));
        }
        self.gate.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SignalConfig::default();
        assert_eq!(config.process_noise, 0.02);
        assert_eq!(config.observation_noise, 1.0);
        assert_eq!(config.min_samples, 100);
        assert_eq!(config.percentile, 98.0);
        assert_eq!(config.default_threshold, 2.5);
        assert_eq!(config.exit_threshold, 1.0);
        assert_eq!(config.history_capacity, 10_000);
        assert_eq!(config.node_capacity, 10_000);
        assert_eq!(config.window(), Some(Duration::hours(3)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_gate() {
        let gate = GateConfig::default();
        assert_eq!(gate.session_open, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(gate.session_close, NaiveTime::from_hms_opt(16, 0, 0).unwrap());
        assert_eq!(gate.offset(), FixedOffset::west_opt(5 * 3600));
        assert!(gate.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad = [
            SignalConfig { percentile: 101.0, ..Default::default() },
            SignalConfig { window_hours: 0.0, ..Default::default() },
            SignalConfig { window_hours: f64::NAN, ..Default::default() },
            SignalConfig { observation_noise: 0.0, ..Default::default() },
            SignalConfig { node_capacity: 0, ..Default::default() },
            SignalConfig { default_sigma: 0.0, ..Default::default() },
        ];
        for config in bad {
            assert!(config.validate().is_err(), "{config:?}");
        }
    }

    #[test]
    fn test_rejects_fully_blocked_session() {
        let gate = GateConfig {
            block_minutes: 200,
            ..Default::default()
        };
        assert!(gate.validate().is_err());

        let gate = GateConfig {
            utc_offset_minutes: 24 * 60,
            ..Default::default()
        };
        assert!(gate.validate().is_err());
    }
}
