//! Implied-volatility surface quotes.

mod quote;

pub use quote::{QuoteKey, VolSurfacePoint};
