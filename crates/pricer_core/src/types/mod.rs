//! Core types: option type, dates, and error enums.

pub mod error;
pub mod option_type;
pub mod time;

pub use error::{DateError, PricingError, SolverError};
pub use option_type::OptionType;
pub use time::{year_fraction, Date, DAYS_PER_YEAR};
