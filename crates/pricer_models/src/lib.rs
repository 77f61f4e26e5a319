//! # pricer_models: Heston Pricing and Calibration
//!
//! ## Layer 2 (Models) Role
//!
//! Builds on `pricer_core` and provides:
//! - Black-Scholes price, vega and implied volatility: [`analytical`]
//! - Heston parameters and calibration bounds: [`models`]
//! - Fourier pricing with per-expiry memoisation and model surfaces:
//!   [`pricing`]
//! - Calibration with a two-stage solver and a quality-control gate:
//!   [`calibration`]
//!
//! ## Feature Flags
//!
//! - `parallel` (default): price expiries concurrently with rayon
//! - `serde` (default): serialisation of parameters, configs and results
//!
//! ## Usage Examples
//!
//! ```rust
//! use pricer_core::types::OptionType;
//! use pricer_models::models::HestonParams;
//! use pricer_models::pricing::{HestonPricer, PricingConfig};
//!
//! let pricer = HestonPricer::new(HestonParams::default(), PricingConfig::default()).unwrap();
//! let iv = pricer.model_implied_vol(100.0, 95.0, 0.25, 0.05, 0.02).unwrap();
//! assert!(iv > 0.15 && iv < 0.3);
//!
//! let put = pricer.price(100.0, 95.0, 0.25, 0.05, 0.02, OptionType::Put).unwrap();
//! assert!(put > 0.0);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod analytical;
pub mod calibration;
pub mod models;
pub mod pricing;
