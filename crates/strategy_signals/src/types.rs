//! Scores, entry signals, positions and exits.

use std::fmt;

use chrono::{DateTime, Utc};
use pricer_core::market_data::surfaces::QuoteKey;
use pricer_core::types::{Date, OptionType};

/// Trade direction implied by a residual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum Direction {
    /// Market vol below model: the option is cheap.
    Buy,
    /// Market vol above model: the option is rich.
    Sell,
}

impl Direction {
    /// `Buy` for negative residuals, `Sell` for positive, `None` at zero.
    pub fn from_residual(residual: f64) -> Option<Self> {
        if residual < 0.0 {
            Some(Direction::Buy)
        } else if residual > 0.0 {
            Some(Direction::Sell)
        } else {
            None
        }
    }

    /// `"BUY"` or `"SELL"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything computed for one node in one cycle.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeScore {
    /// Node key.
    pub key: QuoteKey,
    /// Strike as quoted.
    pub strike: f64,
    /// Expiry date.
    pub expiry: Date,
    /// Quoted side, or the out-of-the-money side relative to spot.
    pub option_type: OptionType,
    /// `ln(K/S)`.
    pub moneyness: f64,
    /// Days to expiry.
    pub days: i64,
    /// Market implied vol.
    pub market_vol: f64,
    /// Model implied vol.
    pub model_vol: f64,
    /// `market_vol - model_vol`.
    pub residual: f64,
    /// Local residual dispersion used to normalise.
    pub sigma: f64,
    /// `residual / sigma`.
    pub z: f64,
    /// Kalman-smoothed `|z|`.
    pub smoothed_z: f64,
    /// Entry threshold for this node.
    pub threshold: f64,
}

/// Entry signal.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Signal {
    /// Strike.
    pub strike: f64,
    /// Expiry date.
    pub expiry: Date,
    /// Option side.
    pub option_type: OptionType,
    /// Unsmoothed z-score.
    pub raw_z: f64,
    /// Smoothed `|z|`.
    pub smoothed_z: f64,
    /// Trade direction.
    pub direction: Direction,
    /// Cycle time.
    pub timestamp: DateTime<Utc>,
    /// `market_vol - model_vol`.
    pub residual: f64,
    /// Threshold that was crossed.
    pub threshold: f64,
    /// `ln(K/S)`.
    pub moneyness: f64,
}

impl Signal {
    pub(crate) fn from_score(score: &NodeScore, direction: Direction, timestamp: DateTime<Utc>) -> Self {
        Self {
            strike: score.strike,
            expiry: score.expiry,
            option_type: score.option_type,
            raw_z: score.z,
            smoothed_z: score.smoothed_z,
            direction,
            timestamp,
            residual: score.residual,
            threshold: score.threshold,
            moneyness: score.moneyness,
        }
    }
}

/// An open position as seen by the exit check.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    /// Caller's identifier for the position.
    pub reference: String,
    /// Strike.
    pub strike: f64,
    /// Expiry date.
    pub expiry: Date,
    /// Option side.
    pub option_type: OptionType,
}

impl Position {
    /// Node the position sits on.
    pub fn key(&self) -> QuoteKey {
        QuoteKey::new(self.strike, self.expiry)
    }
}

/// Why a position should be closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ExitReason {
    /// `|z|` fell below the exit threshold.
    ZThreshold,
}

impl ExitReason {
    /// Stable code.
    pub fn as_str(self) -> &'static str {
        match self {
            ExitReason::ZThreshold => "z_threshold",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exit signal for an open position.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExitSignal {
    /// [`Position::reference`] of the position to close.
    pub position_ref: String,
    /// Current unsmoothed `|z|`.
    pub current_z: f64,
    /// Exit reason.
    pub reason: ExitReason,
}

/// Output of one engine cycle.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignalCycle {
    /// One score per joined node, in market order.
    pub scores: Vec<NodeScore>,
    /// Entry signals that crossed their threshold and passed the gate.
    pub signals: Vec<Signal>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_from_residual() {
        assert_eq!(Direction::from_residual(-0.01), Some(Direction::Buy));
        assert_eq!(Direction::from_residual(0.01), Some(Direction::Sell));
        assert_eq!(Direction::from_residual(0.0), None);
        assert_eq!(Direction::from_residual(f64::NAN), None);
        assert_eq!(Direction::Buy.to_string(), "BUY");
    }

    #[test]
    fn test_exit_reason_code() {
        assert_eq!(ExitReason::ZThreshold.to_string(), "z_threshold");
    }

    #[test]
    fn test_position_key_rounds_strike() {
        let expiry = Date::from_ymd(2024, 2, 1).unwrap();
        let position = Position {
            reference: "pos-1".to_string(),
            strike: 100.0000001,
            expiry,
            option_type: OptionType::Call,
        };
        assert_eq!(position.key(), QuoteKey::new(100.0, expiry));
    }
}
