//! Signal engine errors.
//!
//! Evaluation itself never fails; thin history degrades to default
//! dispersion and thresholds. Only unusable settings are reported.

use thiserror::Error;

/// Errors building a [`crate::SignalEngine`] or one of its gates.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalError {
    /// Settings the engine cannot run with.
    #[error("invalid signal config: {0}")]
    InvalidConfig(String),
}

impl SignalError {
    /// Create an invalid-config error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        SignalError::InvalidConfig(message.into())
    }
}
