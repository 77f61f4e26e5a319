//! # pricer_core: Foundation Layer for the Heston Mispricing Pipeline
//!
//! ## Layer 1 (Foundation) Role
//!
//! pricer_core is the bottom layer of the workspace and provides:
//! - Option and date types: [`types::OptionType`], [`types::Date`]
//! - Rate/dividend term structures: [`market_data::curves`]
//! - Volatility quotes as delivered by the market-data collaborator:
//!   [`market_data::surfaces`]
//! - Numerical building blocks: Gauss-Legendre quadrature and the solvers
//!   used by calibration ([`math::solvers`])
//! - Error types: [`types::PricingError`], [`types::SolverError`],
//!   [`market_data::MarketDataError`]
//!
//! ## Zero Dependency Principle
//!
//! Layer 1 has no dependencies on other workspace crates, with minimal
//! external dependencies:
//! - num-traits: generic floating-point helpers for the solvers
//! - chrono: expiry dates and year fractions
//! - rand: seeded sampling for the differential-evolution fallback
//! - tracing: solver diagnostics
//! - serde: serialisation support (optional, default on)
//!
//! ## Usage Examples
//!
//! ```rust
//! use pricer_core::market_data::curves::{FlatCurve, RateCurve};
//! use pricer_core::types::{Date, OptionType};
//!
//! let curve = FlatCurve::new(0.05);
//! assert_eq!(curve.rate(0.5), 0.05);
//!
//! let valuation = Date::from_ymd(2024, 1, 2).unwrap();
//! let expiry = Date::from_ymd(2024, 2, 1).unwrap();
//! assert_eq!(expiry.days_since(valuation), 30);
//!
//! assert_eq!(OptionType::Put.sign(), -1.0);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod market_data;
pub mod math;
pub mod types;
