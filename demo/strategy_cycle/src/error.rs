//! Error types for the strategy cycle demo.

use thiserror::Error;

/// Demo error type
#[derive(Debug, Error)]
pub enum DemoError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] infra_config::ConfigError),

    /// Signal engine could not be built
    #[error("Signal engine error: {0}")]
    Signals(#[from] strategy_signals::SignalError),

    /// Calibrator could not be built
    #[error("Calibrator error: {0}")]
    Calibration(#[from] pricer_models::calibration::CalibrationError),

    /// Synthetic surface could not be priced
    #[error("Pricing error: {0}")]
    Pricing(#[from] pricer_core::types::PricingError),

    /// Surface file could not be read
    #[error("Surface input error: {0}")]
    Csv(#[from] csv::Error),

    /// Surface content rejected
    #[error("Invalid surface: {0}")]
    Surface(String),
}

impl DemoError {
    /// Create a surface error
    pub fn surface(msg: impl Into<String>) -> Self {
        Self::Surface(msg.into())
    }
}
