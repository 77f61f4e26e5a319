//! Strategy cycle demo.
//!
//! Wires the pipeline end to end for one underlying:
//!
//! ```text
//! surface ─► HestonCalibrator ─► accepted params ─► model surface
//!                                                        │
//! market surface ───────────────────────────────► SignalEngine ─► signals / exits
//! ```
//!
//! Surfaces come from a CSV file or from [`surface::synthetic_surface`].

pub mod cycle;
pub mod error;
pub mod surface;

pub use cycle::{CalibrationSummary, CycleReport, MarketInputs, StrategyCycle};
pub use error::DemoError;
