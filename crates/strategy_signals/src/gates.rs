//! Entry gates.
//!
//! A gate is an external veto on new entries; exits are never gated.

use std::fmt;

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Utc};

use crate::config::GateConfig;
use crate::error::SignalError;
use crate::types::NodeScore;

/// Veto on new entries.
pub trait EntryGate: Send + Sync + fmt::Debug {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Whether an entry on `score` may be taken at `now`.
    fn allows(&self, now: DateTime<Utc>, score: &NodeScore) -> bool;
}

/// Gate that never blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenGate;

impl EntryGate for OpenGate {
    fn name(&self) -> &str {
        "open"
    }

    fn allows(&self, _now: DateTime<Utc>, _score: &NodeScore) -> bool {
        true
    }
}

/// Blocks entries outside the session and in its first and last minutes.
///
/// # Examples
/// ```
/// use chrono::{TimeZone, Utc};
/// use strategy_signals::{GateConfig, TimeOfDayGate};
///
/// // 09:30-16:00 at UTC-5, 15 minutes blocked at each end.
/// let gate = TimeOfDayGate::from_config(&GateConfig::default()).unwrap();
/// assert!(!gate.is_open(Utc.with_ymd_and_hms(2024, 1, 2, 14, 40, 0).unwrap())); // 09:40
/// assert!(gate.is_open(Utc.with_ymd_and_hms(2024, 1, 2, 14, 45, 0).unwrap())); // 09:45
/// assert!(!gate.is_open(Utc.with_ymd_and_hms(2024, 1, 2, 20, 50, 0).unwrap())); // 15:50
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeOfDayGate {
    offset: FixedOffset,
    first_entry: NaiveTime,
    last_entry: NaiveTime,
}

impl TimeOfDayGate {
    /// Session `[open, close]` at `offset`, blocking `block` at each end.
    pub fn new(open: NaiveTime, close: NaiveTime, offset: FixedOffset, block: Duration) -> Self {
        Self {
            offset,
            first_entry: open.overflowing_add_signed(block).0,
            last_entry: close.overflowing_sub_signed(block).0,
        }
    }

    /// Build from settings.
    ///
    /// # Errors
    ///
    /// `SignalError::InvalidConfig` when the offset is out of range or the
    /// blocks cover the whole session.
    pub fn from_config(config: &GateConfig) -> Result<Self, SignalError> {
        config.validate()?;
        let offset = config
            .offset()
            .ok_or_else(|| SignalError::invalid_config("utc offset out of range"))?;
        let block = Duration::try_minutes(config.block_minutes)
            .ok_or_else(|| SignalError::invalid_config("block_minutes out of range"))?;
        Ok(Self::new(config.session_open, config.session_close, offset, block))
    }

    /// Whether entries are allowed at `now`.
    ///
    /// Inclusive at the end of the opening block, exclusive at the start of
    /// the closing block.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.offset).time();
        local >= self.first_entry && local < self.last_entry
    }
}

impl EntryGate for TimeOfDayGate {
    fn name(&self) -> &str {
        "time_of_day"
    }

    fn allows(&self, now: DateTime<Utc>, _score: &NodeScore) -> bool {
        self.is_open(now)
    }
}

/// Gate described by `config`: time of day when enabled, otherwise open.
pub(crate) fn from_config(config: &GateConfig) -> Result<Box<dyn EntryGate>, SignalError> {
    if config.enabled {
        Ok(Box::new(TimeOfDayGate::from_config(config)?))
    } else {
        Ok(Box::new(OpenGate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        // UTC-5 session clock
        Utc.with_ymd_and_hms(2024, 1, 2, h + 5, m, 0).unwrap()
    }

    fn gate() -> TimeOfDayGate {
        TimeOfDayGate::from_config(&GateConfig::default()).unwrap()
    }

    #[test]
    fn test_blocks_session_edges() {
        let gate = gate();
        assert!(!gate.is_open(at(9, 30)));
        assert!(!gate.is_open(at(9, 44)));
        assert!(gate.is_open(at(9, 45)));
        assert!(gate.is_open(at(12, 0)));
        assert!(gate.is_open(at(15, 44)));
        assert!(!gate.is_open(at(15, 45)));
        assert!(!gate.is_open(at(16, 0)));
    }

    #[test]
    fn test_blocks_outside_session() {
        let gate = gate();
        assert!(!gate.is_open(at(8, 0)));
        assert!(!gate.is_open(at(17, 30)));
    }

    #[test]
    fn test_zero_block_is_whole_session() {
        let config = GateConfig {
            block_minutes: 0,
            ..Default::default()
        };
        let gate = TimeOfDayGate::from_config(&config).unwrap();
        assert!(gate.is_open(at(9, 30)));
        assert!(!gate.is_open(at(16, 0)));
    }

    #[test]
    fn test_config_selects_gate() {
        assert_eq!(from_config(&GateConfig::default()).unwrap().name(), "time_of_day");
        let disabled = GateConfig {
            enabled: false,
            ..Default::default()
        };
        assert_eq!(from_config(&disabled).unwrap().name(), "open");
    }
}
