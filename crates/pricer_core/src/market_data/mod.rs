//! Market inputs consumed by the pipeline.
//!
//! - [`curves`]: term structures mapping time-to-expiry to a continuously
//!   compounded rate (used for both the risk-free and dividend curves)
//! - [`surfaces`]: implied-volatility quotes and the keys used to join
//!   market and model rows
//! - [`error`]: [`MarketDataError`]
//!
//! # Example
//!
//! ```
//! use pricer_core::market_data::curves::{FlatCurve, RateCurve};
//!
//! let curve = FlatCurve::new(0.05);
//! let df = curve.discount_factor(1.0);
//! assert!((df - 0.951229).abs() < 1e-5);
//! ```

pub mod curves;
pub mod error;
pub mod surfaces;

pub use curves::{FlatCurve, InterpolatedCurve, RateCurve};
pub use error::MarketDataError;
pub use surfaces::{QuoteKey, VolSurfacePoint};
