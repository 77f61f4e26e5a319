//! Semi-analytical Heston pricing.
//!
//! - [`characteristic`]: the Heston characteristic function
//! - [`HestonPricer`]: Fourier call pricer with per-expiry memoisation,
//!   puts by parity, implied volatility by Black-Scholes inversion
//! - [`surface`]: theoretical price maps and model IV surfaces over a set of
//!   market quotes, one expiry at a time

pub mod characteristic;
mod config;
mod heston_pricer;
pub mod surface;

pub use characteristic::characteristic_function;
pub use config::PricingConfig;
pub use heston_pricer::HestonPricer;
pub use surface::{model_surface, theoretical_prices, OptionKey};
