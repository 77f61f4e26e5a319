//! Configuration errors.

use pricer_models::calibration::CalibrationError;
use strategy_signals::SignalError;
use thiserror::Error;

/// Errors loading or validating a [`crate::StrategyConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or deserialised.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// Calibration settings rejected.
    #[error(transparent)]
    Calibration(#[from] CalibrationError),

    /// Signal settings rejected.
    #[error(transparent)]
    Signals(#[from] SignalError),

    /// Top-level settings rejected.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = ConfigError::Invalid("underlying must not be empty".to_string());
        assert_eq!(err.to_string(), "invalid configuration: underlying must not be empty");

        let err: ConfigError = SignalError::invalid_config("percentile must lie in [0, 100]").into();
        assert_eq!(err.to_string(), "invalid signal config: percentile must lie in [0, 100]");
    }
}
