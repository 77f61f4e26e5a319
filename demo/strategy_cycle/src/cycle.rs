//! One strategy instance and its cycle loop.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use infra_config::StrategyConfig;
use pricer_core::market_data::curves::RateCurve;
use pricer_core::market_data::surfaces::{QuoteKey, VolSurfacePoint};
use pricer_core::types::Date;
use pricer_models::calibration::{CalibrationResult, CheckStatus, HestonCalibrator, SolverStage};
use pricer_models::models::HestonParams;
use pricer_models::pricing::model_surface;
use serde::Serialize;
use strategy_signals::{EntryGate, ExitSignal, Position, Signal, SignalEngine};
use tracing::{info, warn};

use crate::error::DemoError;

/// Market state for one cycle.
pub struct MarketInputs<'a> {
    /// Cycle time.
    pub now: DateTime<Utc>,
    /// Quoted surface.
    pub surface: &'a [VolSurfacePoint],
    /// Spot price.
    pub spot: f64,
    /// Risk-free curve.
    pub rates: &'a dyn RateCurve,
    /// Dividend-yield curve.
    pub dividends: &'a dyn RateCurve,
}

/// Calibration outcome as reported by the demo.
#[derive(Debug, Clone, Serialize)]
pub struct CalibrationSummary {
    /// Whether the fit replaced the live parameters.
    pub accepted: bool,
    /// Rejection code, when rejected.
    pub reason: Option<String>,
    /// Candidate parameters.
    pub params: HestonParams,
    /// Candidate RMSE.
    pub rmse: f64,
    /// Solver stage that produced the candidate.
    pub stage: Option<SolverStage>,
    /// Quotes that survived filtering.
    pub quotes_used: usize,
    /// Wall-clock time in milliseconds.
    pub duration_ms: f64,
    /// QC check outcomes.
    pub checks: BTreeMap<String, CheckStatus>,
}

impl From<&CalibrationResult> for CalibrationSummary {
    fn from(result: &CalibrationResult) -> Self {
        Self {
            accepted: result.qc_passed,
            reason: result.reason().map(|r| r.to_string()),
            params: result.params,
            rmse: result.rmse,
            stage: result.stage,
            quotes_used: result.quotes_used,
            duration_ms: result.duration.as_secs_f64() * 1e3,
            checks: result.qc_details.checks.clone(),
        }
    }
}

/// Everything one cycle produced.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    /// Cycle number, from zero.
    pub cycle: usize,
    /// Underlying.
    pub underlying: String,
    /// Cycle time.
    pub timestamp: DateTime<Utc>,
    /// Calibration outcome.
    pub calibration: CalibrationSummary,
    /// Parameters the model surface was built from, if any fit has been accepted.
    pub live_params: Option<HestonParams>,
    /// Nodes scored.
    pub nodes_scored: usize,
    /// New entries.
    pub signals: Vec<Signal>,
    /// Positions to close.
    pub exits: Vec<ExitSignal>,
    /// Positions open after the cycle.
    pub open_positions: usize,
}

/// Calibrator, signal engine and paper positions for one underlying.
#[derive(Debug)]
pub struct StrategyCycle {
    underlying: String,
    calibrator: HestonCalibrator,
    engine: SignalEngine,
    positions: Vec<Position>,
    opened: usize,
    cycles: usize,
}

impl StrategyCycle {
    /// Build from settings, using the configured entry gate.
    pub fn new(config: &StrategyConfig) -> Result<Self, DemoError> {
        let engine = SignalEngine::new(config.signals.clone())?;
        Self::with_engine(config, engine)
    }

    /// Build from settings with an injected entry gate.
    pub fn with_gate(config: &StrategyConfig, gate: Box<dyn EntryGate>) -> Result<Self, DemoError> {
        let engine = SignalEngine::with_gate(config.signals.clone(), gate)?;
        Self::with_engine(config, engine)
    }

    fn with_engine(config: &StrategyConfig, engine: SignalEngine) -> Result<Self, DemoError> {
        Ok(Self {
            underlying: config.underlying.clone(),
            calibrator: HestonCalibrator::new(config.calibration.clone())?,
            engine,
            positions: Vec::new(),
            opened: 0,
            cycles: 0,
        })
    }

    /// Open paper positions.
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// The calibrator.
    pub fn calibrator(&self) -> &HestonCalibrator {
        &self.calibrator
    }

    /// Calibrate, rebuild the model surface from the live parameters and
    /// run the signal engine.
    ///
    /// Signals open paper positions; exits close them.
    pub fn run(&mut self, market: &MarketInputs<'_>) -> CycleReport {
        let valuation = Date::from(market.now.date_naive());
        let result = self.calibrator.calibrate_at(
            valuation,
            market.surface,
            market.spot,
            market.rates,
            market.dividends,
        );
        if result.qc_passed {
            info!(underlying = %self.underlying, rmse = result.rmse, "parameters updated");
        } else {
            warn!(
                underlying = %self.underlying,
                reason = ?result.reason(),
                "calibration rejected, holding previous parameters"
            );
        }

        let (nodes_scored, signals, exits) = match self.calibrator.pricer() {
            Some(pricer) => {
                let model = model_surface(
                    &pricer,
                    market.surface,
                    market.spot,
                    market.rates,
                    market.dividends,
                    valuation,
                );
                let scored = self.engine.evaluate_at(market.now, market.surface, &model, market.spot);
                let exits = self.engine.check_exits(&self.positions, &scored.scores);
                (scored.scores.len(), scored.signals, exits)
            }
            None => {
                warn!(underlying = %self.underlying, "no accepted parameters yet, skipping signals");
                (0, Vec::new(), Vec::new())
            }
        };

        self.positions
            .retain(|p| !exits.iter().any(|e| e.position_ref == p.reference));
        for signal in &signals {
            let key = QuoteKey::new(signal.strike, signal.expiry);
            if self.positions.iter().any(|p| p.key() == key) {
                continue;
            }
            self.opened += 1;
            self.positions.push(Position {
                reference: format!("{}-{}", self.underlying, self.opened),
                strike: signal.strike,
                expiry: signal.expiry,
                option_type: signal.option_type,
            });
        }

        let report = CycleReport {
            cycle: self.cycles,
            underlying: self.underlying.clone(),
            timestamp: market.now,
            calibration: CalibrationSummary::from(&result),
            live_params: self.calibrator.accepted_params(),
            nodes_scored,
            signals,
            exits,
            open_positions: self.positions.len(),
        };
        self.cycles += 1;
        report
    }
}
