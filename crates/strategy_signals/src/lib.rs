//! # strategy_signals: Strategy Layer for the Heston Mispricing Pipeline
//!
//! ## Layer 3 (Strategy) Role
//!
//! Turns the gap between a market implied-volatility surface and the
//! calibrated model surface into trading signals:
//!
//! - Residuals `market - model` per (strike, expiry) node, normalised by a
//!   local residual dispersion into z-scores ([`engine`])
//! - A rolling, capacity-bounded residual history queried by
//!   moneyness/expiry/time neighbourhood ([`history`])
//! - Per-node scalar Kalman smoothing of `|z|` ([`kalman`]) held in an LRU
//!   arena ([`nodes`])
//! - Dynamic percentile thresholds, pluggable entry gates ([`gates`]) and
//!   exit checks
//!
//! Missing history never blocks a cycle: the local dispersion falls back to
//! 1.0 and the threshold to 2.5 until enough neighbours are collected.
//!
//! ## Usage Examples
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use pricer_core::market_data::surfaces::VolSurfacePoint;
//! use pricer_core::types::Date;
//! use strategy_signals::{OpenGate, SignalConfig, SignalEngine};
//!
//! let now = Utc.with_ymd_and_hms(2024, 1, 2, 15, 0, 0).unwrap();
//! let expiry = Date::from_ymd(2024, 2, 1).unwrap();
//! let market = vec![VolSurfacePoint::new(100.0, expiry, 0.25)];
//! let model = vec![VolSurfacePoint::new(100.0, expiry, 0.20)];
//!
//! let mut engine = SignalEngine::with_gate(SignalConfig::default(), Box::new(OpenGate)).unwrap();
//! let cycle = engine.evaluate_at(now, &market, &model, 100.0);
//! assert_eq!(cycle.scores.len(), 1);
//! // No history yet: sigma is 1.0 and z equals the raw residual.
//! assert!((cycle.scores[0].z - 0.05).abs() < 1e-12);
//! assert!(cycle.signals.is_empty());
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod config;
pub mod engine;
pub mod error;
pub mod gates;
pub mod history;
pub mod kalman;
pub mod nodes;
pub mod types;

pub use config::{GateConfig, SignalConfig};
pub use engine::SignalEngine;
pub use error::SignalError;
pub use gates::{EntryGate, OpenGate, TimeOfDayGate};
pub use history::{percentile, Neighbourhood, ResidualHistory, ResidualSample};
pub use kalman::{KalmanNoise, KalmanState};
pub use nodes::{NodeArena, SignalNode};
pub use types::{Direction, ExitReason, ExitSignal, NodeScore, Position, Signal, SignalCycle};
