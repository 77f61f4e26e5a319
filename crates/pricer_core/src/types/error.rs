//! Error types for pricing, date handling and numerical solvers.
//!
//! - `PricingError`: failures raised by a pricing routine
//! - `DateError`: invalid calendar dates or unparseable date strings
//! - `SolverError`: failures raised by root finders and optimisers

use thiserror::Error;

/// Categorised pricing errors.
///
/// Deterministic shortcuts (expired option, zero variance) are not errors;
/// these variants cover inputs the formulas cannot handle and integrals that
/// did not produce a finite value.
///
/// # Examples
/// ```
/// use pricer_core::types::PricingError;
///
/// let err = PricingError::InvalidInput("Negative spot price".to_string());
/// assert_eq!(format!("{}", err), "Invalid input: Negative spot price");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    /// Invalid input data or parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Numerical integration or iteration produced a non-finite value
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),
}

impl PricingError {
    /// Shorthand for [`PricingError::InvalidInput`].
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        PricingError::InvalidInput(msg.into())
    }

    /// Shorthand for [`PricingError::NumericalInstability`].
    pub fn numerical(msg: impl Into<String>) -> Self {
        PricingError::NumericalInstability(msg.into())
    }
}

/// Date-related errors.
///
/// # Examples
/// ```
/// use pricer_core::types::DateError;
///
/// let err = DateError::InvalidDate { year: 2024, month: 2, day: 30 };
/// assert!(format!("{}", err).contains("2024-02-30"));
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    /// Components do not form a valid calendar date.
    #[error("Invalid date: {year}-{month:02}-{day:02}")]
    InvalidDate {
        /// Year component
        year: i32,
        /// Month component
        month: u32,
        /// Day component
        day: u32,
    },

    /// String could not be parsed as `YYYY-MM-DD`.
    #[error("Date parse error: {0}")]
    ParseError(String),
}

/// Solver errors.
///
/// # Examples
/// ```
/// use pricer_core::types::SolverError;
///
/// let err = SolverError::InvalidProblem("empty bounds".to_string());
/// assert_eq!(format!("{}", err), "Invalid problem: empty bounds");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolverError {
    /// Objective or iterate became non-finite.
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),

    /// Starting point or bounds are unusable.
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),
}

impl From<SolverError> for PricingError {
    fn from(err: SolverError) -> Self {
        PricingError::NumericalInstability(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pricing_error_display() {
        let err = PricingError::numerical("integral is NaN");
        assert_eq!(err.to_string(), "Numerical instability: integral is NaN");
        let err = PricingError::invalid_input("strike <= 0");
        assert_eq!(err.to_string(), "Invalid input: strike <= 0");
    }

    #[test]
    fn test_date_error_display() {
        let err = DateError::InvalidDate {
            year: 2023,
            month: 2,
            day: 29,
        };
        assert_eq!(err.to_string(), "Invalid date: 2023-02-29");
    }

    #[test]
    fn test_solver_error_into_pricing_error() {
        let err: PricingError = SolverError::InvalidProblem("n = 1".to_string()).into();
        match err {
            PricingError::NumericalInstability(msg) => assert!(msg.contains("n = 1")),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
