//! Stochastic-volatility model parameters.
//!
//! Only the Heston model is carried: its parameter set, the solver-vector
//! layout used by calibration, and the box the calibrator searches.

pub mod heston;

pub use heston::{HestonBounds, HestonParamIndex, HestonParams};
