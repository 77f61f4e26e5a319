//! Calibration error types.
//!
//! A calibration run itself never fails: market-data problems and solver
//! failures end as rejected [`super::CalibrationResult`]s. These errors cover
//! building a calibrator from unusable settings.

use pricer_core::types::PricingError;
use thiserror::Error;

/// Calibrator construction errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// Settings the calibrator cannot run with.
    #[error("invalid calibration config: {0}")]
    InvalidConfig(String),

    /// Pricer settings rejected.
    #[error(transparent)]
    Pricing(#[from] PricingError),
}

impl CalibrationError {
    /// Create an invalid-config error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        CalibrationError::InvalidConfig(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_message() {
        let err = CalibrationError::invalid_config("liquid_bias must be positive");
        assert_eq!(
            err.to_string(),
            "invalid calibration config: liquid_bias must be positive"
        );
    }

    #[test]
    fn test_pricing_error_is_transparent() {
        let err: CalibrationError = PricingError::invalid_input("nodes_per_panel").into();
        assert_eq!(err.to_string(), "Invalid input: nodes_per_panel");
    }
}
