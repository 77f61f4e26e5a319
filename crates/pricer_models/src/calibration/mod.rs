//! Heston calibration to implied-volatility surfaces.
//!
//! - [`HestonCalibrator`]: warm-started, regularised two-stage fit with a
//!   QC gate and reject-and-hold semantics
//! - [`PreparedSurface`] / [`Objective`]: quote filtering, liquidity
//!   weights and the weighted-RMSE objective
//! - [`QualityGate`]: RMSE improvement, Feller, butterfly and local
//!   stability checks
//! - [`CalibrationConfig`] / [`QcConfig`]: tunables
//!
//! # Flow
//!
//! ```text
//! surface + curves -> PreparedSurface -> Objective
//!                                          |
//!                     projected L-BFGS ----+---- differential evolution
//!                                          |
//!                                     QualityGate -> accept / reject and hold
//! ```
//!
//! # Example
//!
//! ```no_run
//! use pricer_core::market_data::curves::FlatCurve;
//! use pricer_core::market_data::surfaces::VolSurfacePoint;
//! use pricer_core::types::Date;
//! use pricer_models::calibration::{CalibrationConfig, HestonCalibrator};
//!
//! let valuation = Date::from_ymd(2024, 1, 2).unwrap();
//! let surface: Vec<VolSurfacePoint> = (0..5)
//!     .flat_map(|i| {
//!         let expiry = valuation.add_days(30 * (i + 1));
//!         [90.0, 95.0, 100.0, 105.0, 110.0].map(|k| VolSurfacePoint::new(k, expiry, 0.2))
//!     })
//!     .collect();
//!
//! let mut calibrator = HestonCalibrator::new(CalibrationConfig::default()).unwrap();
//! let result = calibrator.calibrate_at(
//!     valuation,
//!     &surface,
//!     100.0,
//!     &FlatCurve::new(0.05),
//!     &FlatCurve::new(0.02),
//! );
//! println!("rmse = {:.5}, passed = {}", result.rmse, result.qc_passed);
//! ```

mod calibrator;
mod config;
mod error;
mod objective;
pub mod qc;
mod result;

pub use calibrator::HestonCalibrator;
pub use config::{CalibrationConfig, QcConfig};
pub use error::CalibrationError;
pub use objective::{liquidity_weights, Objective, PreparedQuote, PreparedSurface, Prior};
pub use qc::{count_butterfly_violations, CheckStatus, QcDetails, QualityGate, RejectionReason};
pub use result::{
    AcceptedFit, CalibrationPhase, CalibrationResult, CalibrationStatus, RejectionRecord,
    SolverStage,
};
