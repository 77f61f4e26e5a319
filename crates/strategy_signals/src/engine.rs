//! Market-versus-model signal engine.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use pricer_core::market_data::surfaces::{QuoteKey, VolSurfacePoint};
use pricer_core::types::{Date, OptionType};
use tracing::{debug, trace, warn};

use crate::config::SignalConfig;
use crate::error::SignalError;
use crate::gates::{self, EntryGate};
use crate::history::{Neighbourhood, ResidualHistory, ResidualSample};
use crate::kalman::KalmanNoise;
use crate::nodes::{NodeArena, SignalNode};
use crate::types::{Direction, ExitReason, ExitSignal, NodeScore, Position, Signal, SignalCycle};

/// A market row joined with its model vol, before normalisation.
struct Joined<'a> {
    quote: &'a VolSurfacePoint,
    key: QuoteKey,
    model_vol: f64,
    residual: f64,
    moneyness: f64,
    days: i64,
}

/// Scores market-versus-model residuals and emits entry and exit signals.
///
/// One engine per underlying. Each cycle:
///
/// 1. joins market and model quotes on (strike, expiry);
/// 2. normalises each residual by the dispersion of neighbouring residuals
///    in the history (or `default_sigma` while it is thin);
/// 3. appends the cycle's samples to the history;
/// 4. smooths `|z|` per node and compares it with the neighbourhood
///    percentile (or `default_threshold`);
/// 5. emits a signal where the threshold is crossed and the gate allows.
#[derive(Debug)]
pub struct SignalEngine {
    config: SignalConfig,
    noise: KalmanNoise,
    window: Duration,
    history: ResidualHistory,
    nodes: NodeArena,
    gate: Box<dyn EntryGate>,
}

impl SignalEngine {
    /// Engine with the gate described by `config.gate`.
    ///
    /// # Errors
    ///
    /// `SignalError::InvalidConfig` for unusable settings.
    pub fn new(config: SignalConfig) -> Result<Self, SignalError> {
        let gate = gates::from_config(&config.gate)?;
        Self::with_gate(config, gate)
    }

    /// Engine with an injected entry gate in place of `config.gate`.
    ///
    /// # Errors
    ///
    /// `SignalError::InvalidConfig` for unusable settings.
    pub fn with_gate(config: SignalConfig, gate: Box<dyn EntryGate>) -> Result<Self, SignalError> {
        config.validate()?;
        let window = config
            .window()
            .ok_or_else(|| SignalError::invalid_config("window_hours out of range"))?;
        Ok(Self {
            noise: KalmanNoise::new(config.process_noise, config.observation_noise),
            window,
            history: ResidualHistory::with_capacity(config.history_capacity),
            nodes: NodeArena::with_capacity(config.node_capacity),
            gate,
            config,
        })
    }

    /// Current settings.
    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Residual history.
    pub fn history(&self) -> &ResidualHistory {
        &self.history
    }

    /// Node state for `key`, if it has been observed and not evicted.
    pub fn node(&self, key: &QuoteKey) -> Option<&SignalNode> {
        self.nodes.get(key)
    }

    /// Node store.
    pub fn nodes(&self) -> &NodeArena {
        &self.nodes
    }

    /// Name of the entry gate in use.
    pub fn gate_name(&self) -> &str {
        self.gate.name()
    }

    /// Entry signals for the current time.
    pub fn compute_signals(
        &mut self,
        market: &[VolSurfacePoint],
        model: &[VolSurfacePoint],
        spot: f64,
    ) -> Vec<Signal> {
        self.evaluate_at(Utc::now(), market, model, spot).signals
    }

    /// Run one cycle as of `now`.
    ///
    /// Market rows without a model row at the same (strike, expiry), and
    /// rows with non-finite vols, are skipped. A non-positive spot yields an
    /// empty cycle.
    pub fn evaluate_at(
        &mut self,
        now: DateTime<Utc>,
        market: &[VolSurfacePoint],
        model: &[VolSurfacePoint],
        spot: f64,
    ) -> SignalCycle {
        if !(spot.is_finite() && spot > 0.0) {
            warn!(spot, "spot is not positive, skipping signal cycle");
            return SignalCycle::default();
        }
        let valuation = Date::from(now.date_naive());
        let since = now - self.window;

        let model_vols: HashMap<QuoteKey, f64> = model
            .iter()
            .filter(|q| q.implied_vol.is_finite())
            .map(|q| (q.key(), q.implied_vol))
            .collect();

        let joined: Vec<Joined<'_>> = market
            .iter()
            .filter(|q| q.implied_vol.is_finite() && q.strike.is_finite() && q.strike > 0.0)
            .filter_map(|quote| {
                let key = quote.key();
                let model_vol = *model_vols.get(&key)?;
                Some(Joined {
                    quote,
                    key,
                    model_vol,
                    residual: quote.implied_vol - model_vol,
                    moneyness: quote.log_moneyness(spot),
                    days: quote.days_to_expiry(valuation),
                })
            })
            .collect();

        // Normalise against history as it stood before this cycle.
        let sigmas: Vec<f64> = joined
            .iter()
            .map(|row| {
                self.history
                    .local_sigma(&self.neighbourhood(row.moneyness, row.days, since), self.config.min_samples)
                    .unwrap_or(self.config.default_sigma)
            })
            .collect();

        for (row, &sigma) in joined.iter().zip(&sigmas) {
            self.history.push(ResidualSample {
                timestamp: now,
                moneyness: row.moneyness,
                days: row.days,
                residual: row.residual,
                z: row.residual / sigma,
            });
        }

        let mut cycle = SignalCycle::default();
        for (row, sigma) in joined.into_iter().zip(sigmas) {
            let z = row.residual / sigma;
            let threshold = self
                .history
                .threshold(
                    &self.neighbourhood(row.moneyness, row.days, since),
                    self.config.min_samples,
                    self.config.percentile,
                )
                .unwrap_or(self.config.default_threshold);
            let smoothed_z = self
                .nodes
                .touch(row.key, now)
                .observe(now, z.abs(), self.noise);
            trace!(strike = row.quote.strike, expiry = %row.quote.expiry, z, smoothed_z, threshold, "node updated");

            let score = NodeScore {
                key: row.key,
                strike: row.quote.strike,
                expiry: row.quote.expiry,
                option_type: row
                    .quote
                    .option_type
                    .unwrap_or_else(|| OptionType::out_of_the_money(row.quote.strike, spot)),
                moneyness: row.moneyness,
                days: row.days,
                market_vol: row.quote.implied_vol,
                model_vol: row.model_vol,
                residual: row.residual,
                sigma,
                z,
                smoothed_z,
                threshold,
            };

            if smoothed_z >= threshold {
                match Direction::from_residual(score.residual) {
                    Some(direction) if self.gate.allows(now, &score) => {
                        cycle.signals.push(Signal::from_score(&score, direction, now));
                    }
                    Some(_) => {
                        debug!(strike = score.strike, gate = self.gate.name(), "entry blocked by gate");
                    }
                    None => {}
                }
            }
            cycle.scores.push(score);
        }

        debug!(
            nodes = cycle.scores.len(),
            signals = cycle.signals.len(),
            history = self.history.len(),
            "signal cycle complete"
        );
        cycle
    }

    /// Exit signals for open positions.
    ///
    /// A position exits when the unsmoothed `|z|` of its node in `scores`
    /// is below the exit threshold; positions whose node was not scored are
    /// left alone.
    pub fn check_exits(&self, positions: &[Position], scores: &[NodeScore]) -> Vec<ExitSignal> {
        let current: HashMap<QuoteKey, f64> = scores.iter().map(|s| (s.key, s.z.abs())).collect();
        positions
            .iter()
            .filter_map(|position| {
                let current_z = *current.get(&position.key())?;
                (current_z < self.config.exit_threshold).then(|| ExitSignal {
                    position_ref: position.reference.clone(),
                    current_z,
                    reason: ExitReason::ZThreshold,
                })
            })
            .collect()
    }

    fn neighbourhood(&self, moneyness: f64, days: i64, since: DateTime<Utc>) -> Neighbourhood {
        Neighbourhood {
            moneyness,
            days,
            since,
            moneyness_radius: self.config.moneyness_radius,
            dte_radius: self.config.dte_radius_days,
        }
    }
}
