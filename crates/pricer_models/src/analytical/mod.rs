//! Closed-form Black-Scholes pricing and implied-volatility inversion.
//!
//! - [`black_scholes`]: price and vega with a continuous dividend yield
//! - [`implied_vol`]: bounded Newton-Raphson inversion
//! - [`distributions`]: standard normal CDF/PDF

pub mod black_scholes;
pub mod distributions;
pub mod error;
pub mod implied_vol;

pub use black_scholes::BlackScholes;
pub use distributions::{norm_cdf, norm_pdf};
pub use error::AnalyticalError;
pub use implied_vol::{implied_volatility, ImpliedVolConfig};
