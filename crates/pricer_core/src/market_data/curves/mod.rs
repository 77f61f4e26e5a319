//! Rate term structures.
//!
//! - [`RateCurve`]: object-safe trait mapping time-to-expiry to a rate
//! - [`FlatCurve`]: constant rate
//! - [`InterpolatedCurve`]: linear in rate between pillars, flat outside

mod flat;
mod interpolated;
mod traits;

pub use flat::FlatCurve;
pub use interpolated::InterpolatedCurve;
pub use traits::RateCurve;
