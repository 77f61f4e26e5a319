//! Numerical building blocks.
//!
//! - [`quadrature`]: Gauss-Legendre rules, single-panel and composite
//! - [`solvers`]: bounded Newton-Raphson, projected L-BFGS and
//!   differential evolution

pub mod quadrature;
pub mod solvers;

pub use quadrature::{CompositeRule, GaussLegendre};
