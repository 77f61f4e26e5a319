//! Quality-control gate applied to every calibration candidate.
//!
//! Checks run in order and the first failure ends the gate:
//!
//! 1. `rmse_improvement`: against the prior accepted RMSE, the candidate
//!    must improve by the configured relative and absolute margins
//! 2. `feller`: advisory only
//! 3. `static_arbitrage`: butterflies on consecutive distinct strikes of
//!    each expiry; too many negative ones reject
//! 4. `local_stability`: unweighted RMSE per (log-moneyness, DTE) bucket
//!    must stay within a multiple of the prior RMSE

use std::collections::BTreeMap;
use std::fmt;

use pricer_core::types::OptionType;
use tracing::{debug, warn};

use super::config::QcConfig;
use super::objective::{PreparedQuote, PreparedSurface};
use crate::pricing::HestonPricer;

/// Check name for the RMSE improvement test.
pub const RMSE_IMPROVEMENT: &str = "rmse_improvement";
/// Check name for the Feller condition.
pub const FELLER: &str = "feller";
/// Check name for the butterfly test.
pub const STATIC_ARBITRAGE: &str = "static_arbitrage";
/// Check name for the bucketed RMSE test.
pub const LOCAL_STABILITY: &str = "local_stability";

/// Outcome of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CheckStatus {
    /// Check passed.
    Passed,
    /// Check failed and rejected the candidate.
    Failed,
    /// Advisory failure; the gate continues.
    Warning,
    /// Some violations found; rejects only above the configured limit.
    Violations(usize),
    /// Not applicable, e.g. no prior fit.
    Skipped,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Passed => write!(f, "Passed"),
            CheckStatus::Failed => write!(f, "Failed"),
            CheckStatus::Warning => write!(f, "Warning"),
            CheckStatus::Violations(n) => write!(f, "{n} violations"),
            CheckStatus::Skipped => write!(f, "Skipped"),
        }
    }
}

/// Why a candidate was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RejectionReason {
    /// RMSE did not improve enough on the prior fit.
    InsufficientRmseImprovement,
    /// More butterfly violations than allowed.
    TooManyArbitrageViolations,
    /// A local bucket's RMSE spiked relative to the prior fit.
    LocalRmseSpike,
    /// Neither solver stage produced a usable objective value.
    OptimizationFailed,
}

impl RejectionReason {
    /// Snake-case identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            RejectionReason::InsufficientRmseImprovement => "insufficient_rmse_improvement",
            RejectionReason::TooManyArbitrageViolations => "too_many_arbitrage_violations",
            RejectionReason::LocalRmseSpike => "local_rmse_spike",
            RejectionReason::OptimizationFailed => "optimization_failed",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-check outcomes and, on rejection, the reason.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QcDetails {
    /// Status of every check that ran, by name.
    pub checks: BTreeMap<String, CheckStatus>,
    /// Set when the candidate was rejected.
    pub reason: Option<RejectionReason>,
    /// Human-readable detail for the rejection.
    pub message: Option<String>,
}

impl QcDetails {
    /// No check rejected the candidate.
    pub fn passed(&self) -> bool {
        self.reason.is_none()
    }

    /// Status of the named check, if it ran.
    pub fn check(&self, name: &str) -> Option<CheckStatus> {
        self.checks.get(name).copied()
    }

    /// Details for a run where no candidate reached the gate.
    pub fn optimization_failed(message: impl Into<String>) -> Self {
        Self {
            checks: BTreeMap::new(),
            reason: Some(RejectionReason::OptimizationFailed),
            message: Some(message.into()),
        }
    }

    fn record(&mut self, name: &str, status: CheckStatus) {
        self.checks.insert(name.to_string(), status);
    }

    fn reject(mut self, name: &str, reason: RejectionReason, message: String) -> Self {
        self.record(name, CheckStatus::Failed);
        self.reason = Some(reason);
        self.message = Some(message);
        self
    }
}

/// The four-stage gate.
#[derive(Debug, Clone, Copy)]
pub struct QualityGate<'a> {
    config: &'a QcConfig,
}

impl<'a> QualityGate<'a> {
    /// Gate with the given thresholds.
    pub fn new(config: &'a QcConfig) -> Self {
        Self { config }
    }

    /// Run every check against a candidate fit.
    ///
    /// `pricer` carries the candidate parameters, `rmse` is its weighted RMSE
    /// (without regularisation) and `prior_rmse` the RMSE of the last
    /// accepted fit.
    pub fn run(
        &self,
        pricer: &HestonPricer,
        rmse: f64,
        prior_rmse: Option<f64>,
        surface: &PreparedSurface,
    ) -> QcDetails {
        let mut details = QcDetails::default();

        if let Some(prior) = prior_rmse {
            let improvement = prior - rmse;
            let relative = improvement / prior;
            if relative < self.config.min_relative_improvement
                || improvement < self.config.min_absolute_improvement
            {
                return details.reject(
                    RMSE_IMPROVEMENT,
                    RejectionReason::InsufficientRmseImprovement,
                    format!(
                        "insufficient RMSE improvement: {:.1}% ({:.5} -> {:.5})",
                        100.0 * relative,
                        prior,
                        rmse
                    ),
                );
            }
        }
        details.record(RMSE_IMPROVEMENT, CheckStatus::Passed);

        let params = pricer.params();
        if params.satisfies_feller() {
            details.record(FELLER, CheckStatus::Passed);
        } else {
            warn!(
                two_kappa_theta = 2.0 * params.kappa * params.theta,
                xi_squared = params.xi * params.xi,
                "Feller condition violated"
            );
            details.record(FELLER, CheckStatus::Warning);
        }

        let violations = count_butterfly_violations(pricer, surface, self.config.butterfly_tolerance);
        if violations == 0 {
            details.record(STATIC_ARBITRAGE, CheckStatus::Passed);
        } else if violations > self.config.max_arbitrage_violations {
            let mut details = details.reject(
                STATIC_ARBITRAGE,
                RejectionReason::TooManyArbitrageViolations,
                format!("too many arbitrage violations: {violations}"),
            );
            details.record(STATIC_ARBITRAGE, CheckStatus::Violations(violations));
            return details;
        } else {
            details.record(STATIC_ARBITRAGE, CheckStatus::Violations(violations));
        }

        let Some(prior) = prior_rmse else {
            details.record(LOCAL_STABILITY, CheckStatus::Skipped);
            return details;
        };
        if let Some(spike) = self.find_local_spike(pricer, surface, prior) {
            warn!(
                moneyness = ?spike.moneyness,
                dte = ?spike.dte,
                local_rmse = spike.local_rmse,
                prior_rmse = prior,
                "local RMSE spike"
            );
            return details.reject(
                LOCAL_STABILITY,
                RejectionReason::LocalRmseSpike,
                format!(
                    "local RMSE {:.5} in m={:?}, dte={:?} exceeds {:.2}x prior {:.5}",
                    spike.local_rmse, spike.moneyness, spike.dte, self.config.local_rmse_multiplier, prior
                ),
            );
        }
        details.record(LOCAL_STABILITY, CheckStatus::Passed);
        details
    }

    fn find_local_spike(
        &self,
        pricer: &HestonPricer,
        surface: &PreparedSurface,
        prior: f64,
    ) -> Option<LocalSpike> {
        let limit = self.config.local_rmse_multiplier * prior;
        let model_vols = surface.model_vols(pricer);
        let rows: Vec<(&PreparedQuote, Option<f64>)> = surface
            .quotes()
            .iter()
            .zip(model_vols)
            .map(|(q, m)| (q, m.ok()))
            .collect();

        for &moneyness in &self.config.moneyness_buckets {
            for &dte in &self.config.dte_buckets {
                let local: Vec<_> = rows
                    .iter()
                    .filter(|(q, _)| in_bucket(q.log_moneyness, moneyness) && in_bucket(q.days as f64, dte))
                    .collect();
                if local.len() < self.config.min_bucket_quotes {
                    continue;
                }
                let residuals: Vec<f64> = local
                    .iter()
                    .filter_map(|(q, m)| m.map(|vol| vol - q.market_vol))
                    .collect();
                if residuals.is_empty() {
                    continue;
                }
                let local_rmse =
                    (residuals.iter().map(|r| r * r).sum::<f64>() / residuals.len() as f64).sqrt();
                debug!(?moneyness, ?dte, quotes = local.len(), local_rmse, "local stability bucket");
                if local_rmse > limit {
                    return Some(LocalSpike {
                        moneyness,
                        dte,
                        local_rmse,
                    });
                }
            }
        }
        None
    }
}

struct LocalSpike {
    moneyness: [f64; 2],
    dte: [f64; 2],
    local_rmse: f64,
}

#[inline]
fn in_bucket(value: f64, [lo, hi]: [f64; 2]) -> bool {
    value >= lo && value <= hi
}

/// Negative butterflies across consecutive distinct strikes, per expiry.
///
/// For sorted distinct strikes `K1 < K2 < K3` of one expiry the model calls
/// must satisfy `C1 - 2 C2 + C3 >= -tolerance`. Triples with a strike that
/// fails to price are skipped.
pub fn count_butterfly_violations(pricer: &HestonPricer, surface: &PreparedSurface, tolerance: f64) -> usize {
    let spot = surface.spot();
    surface
        .expiry_slices()
        .map(|slice| {
            let Some(first) = slice.first() else {
                return 0;
            };
            let mut strikes: Vec<f64> = slice.iter().map(|q| q.strike).collect();
            strikes.sort_by(f64::total_cmp);
            strikes.dedup();
            if strikes.len() < 3 {
                return 0;
            }
            let calls: Vec<Option<f64>> = strikes
                .iter()
                .map(|&k| {
                    pricer
                        .price(spot, k, first.time, first.rate, first.dividend, OptionType::Call)
                        .ok()
                })
                .collect();
            calls
                .windows(3)
                .filter(|w| match (w[0], w[1], w[2]) {
                    (Some(c1), Some(c2), Some(c3)) => c1 - 2.0 * c2 + c3 < -tolerance,
                    _ => false,
                })
                .count()
        })
        .sum()
}
