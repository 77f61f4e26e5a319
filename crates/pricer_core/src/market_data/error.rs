//! Market data error types.

use crate::types::PricingError;
use thiserror::Error;

/// Market data construction and validation errors.
///
/// # Examples
///
/// ```
/// use pricer_core::market_data::MarketDataError;
///
/// let err = MarketDataError::InvalidMaturity { t: -1.0 };
/// assert!(format!("{}", err).contains("-1"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketDataError {
    /// Pillar maturities must be positive and strictly increasing.
    #[error("Invalid maturity: t = {t}")]
    InvalidMaturity {
        /// The offending maturity
        t: f64,
    },

    /// Not enough points to build the structure.
    #[error("Insufficient data: got {got}, need {need}")]
    InsufficientData {
        /// Number of points provided
        got: usize,
        /// Minimum number of points required
        need: usize,
    },

    /// Rate pillar is not finite.
    #[error("Invalid rate {rate} at t = {t}")]
    InvalidRate {
        /// Pillar maturity
        t: f64,
        /// The offending rate
        rate: f64,
    },

    /// A quote failed validation.
    #[error("Invalid quote at strike {strike}: {reason}")]
    InvalidQuote {
        /// Strike of the quote
        strike: f64,
        /// What was wrong with it
        reason: String,
    },
}

impl From<MarketDataError> for PricingError {
    fn from(err: MarketDataError) -> Self {
        PricingError::InvalidInput(err.to_string())
    }
}
