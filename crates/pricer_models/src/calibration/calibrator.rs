//! Heston calibrator with warm start, two-stage optimisation and QC gate.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use pricer_core::market_data::curves::RateCurve;
use pricer_core::market_data::surfaces::VolSurfacePoint;
use pricer_core::math::solvers::{
    differential_evolution, projected_lbfgs, Deadline, OptimisationResult,
};
use pricer_core::math::CompositeRule;
use pricer_core::types::Date;
use tracing::{debug, info, warn};

use super::config::CalibrationConfig;
use super::error::CalibrationError;
use super::objective::{Objective, PreparedSurface, Prior};
use super::qc::{QcDetails, QualityGate};
use super::result::{
    AcceptedFit, CalibrationPhase, CalibrationResult, CalibrationStatus, RejectionRecord,
    SolverStage,
};
use crate::models::HestonParams;
use crate::pricing::HestonPricer;

/// Best point found by the solver stages.
#[derive(Debug, Clone)]
struct Candidate {
    params: HestonParams,
    value: f64,
    stage: SolverStage,
}

#[derive(Debug, Default)]
struct SolverTally {
    iterations: usize,
    evaluations: usize,
}

impl SolverTally {
    fn add(&mut self, result: &OptimisationResult) {
        self.iterations += result.iterations;
        self.evaluations += result.evaluations;
    }
}

/// Calibrates Heston parameters to implied-volatility surfaces.
///
/// One instance per underlying. It owns the last accepted fit, which is the
/// warm start and regularisation anchor of the next run, and replaces it
/// only when a candidate passes QC.
///
/// ## Run
///
/// 1. Filter and weight the quotes ([`PreparedSurface`])
/// 2. Stage 1: projected L-BFGS from the warm start
/// 3. Stage 2, when stage 1 does not converge below the sentinel:
///    differential evolution seeded with the warm start; the better of the
///    two stages is kept
/// 4. QC gate ([`QualityGate`]); accept or reject and hold
#[derive(Debug)]
pub struct HestonCalibrator {
    config: CalibrationConfig,
    rule: Arc<CompositeRule>,
    phase: CalibrationPhase,
    accepted: Option<AcceptedFit>,
    rejection_count: usize,
    rejections: VecDeque<RejectionRecord>,
}

impl HestonCalibrator {
    /// Build a calibrator.
    ///
    /// # Errors
    ///
    /// `CalibrationError` when `config` fails validation.
    pub fn new(config: CalibrationConfig) -> Result<Self, CalibrationError> {
        config.validate()?;
        let rule = Arc::new(config.pricing.build_rule()?);
        Ok(Self {
            config,
            rule,
            phase: CalibrationPhase::Idle,
            accepted: None,
            rejection_count: 0,
            rejections: VecDeque::new(),
        })
    }

    /// Settings in use.
    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Current state-machine phase.
    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    /// Last accepted parameters.
    pub fn accepted_params(&self) -> Option<HestonParams> {
        self.accepted.map(|a| a.params)
    }

    /// RMSE of the last accepted fit.
    pub fn last_rmse(&self) -> Option<f64> {
        self.accepted.map(|a| a.rmse)
    }

    /// The last accepted fit.
    pub fn accepted(&self) -> Option<&AcceptedFit> {
        self.accepted.as_ref()
    }

    /// Rejections since the last acceptance.
    pub fn rejection_count(&self) -> usize {
        self.rejection_count
    }

    /// Most recent rejections, oldest first.
    pub fn rejection_history(&self) -> impl Iterator<Item = &RejectionRecord> {
        self.rejections.iter()
    }

    /// Monitoring snapshot.
    pub fn status(&self) -> CalibrationStatus {
        let now = Utc::now();
        CalibrationStatus {
            calibrated: self.accepted.is_some(),
            params: self.accepted_params(),
            rmse: self.last_rmse(),
            last_calibration: self.accepted.map(|a| a.timestamp),
            age_seconds: self.accepted.map(|a| (now - a.timestamp).num_seconds()),
            rejection_count: self.rejection_count,
            last_rejection: self.rejections.back().map(|r| r.reason),
        }
    }

    /// Pricer for the accepted parameters.
    pub fn pricer(&self) -> Option<HestonPricer> {
        self.accepted
            .map(|a| HestonPricer::with_rule(a.params, Arc::clone(&self.rule), self.config.pricing))
    }

    /// Warm start: the accepted parameters or the default vector, in bounds.
    pub fn initial_guess(&self) -> HestonParams {
        let guess = self.accepted_params().unwrap_or_default();
        self.config.bounds.clamp(&guess)
    }

    /// Calibrate with today's date as valuation date.
    pub fn calibrate(
        &mut self,
        surface: &[VolSurfacePoint],
        spot: f64,
        rates: &dyn RateCurve,
        dividends: &dyn RateCurve,
    ) -> CalibrationResult {
        self.calibrate_at(Date::today(), surface, spot, rates, dividends)
    }

    /// Calibrate as of `valuation`.
    ///
    /// Always returns; bad quotes are filtered and solver failures become
    /// `optimization_failed` rejections.
    pub fn calibrate_at(
        &mut self,
        valuation: Date,
        surface: &[VolSurfacePoint],
        spot: f64,
        rates: &dyn RateCurve,
        dividends: &dyn RateCurve,
    ) -> CalibrationResult {
        let started = Instant::now();
        self.transition(CalibrationPhase::Optimizing);

        let prepared = PreparedSurface::new(surface, spot, rates, dividends, valuation, &self.config);
        info!(
            quotes = prepared.len(),
            dropped = prepared.dropped(),
            %valuation,
            "starting calibration"
        );

        let prior = self.accepted.map(|a| Prior {
            params: a.params,
            rmse: a.rmse,
        });
        let warm_start = self.initial_guess();

        if prepared.is_empty() {
            let details = QcDetails::optimization_failed("no usable quotes after filtering");
            return self.reject_without_candidate(warm_start, details, SolverTally::default(), 0, started);
        }

        let objective = Objective::new(&prepared, Arc::clone(&self.rule), &self.config, prior);
        let mut tally = SolverTally::default();
        let Some(candidate) = self.optimise(&objective, &warm_start, &mut tally) else {
            let details = QcDetails::optimization_failed(
                "neither solver stage reached a finite objective below the sentinel",
            );
            return self.reject_without_candidate(warm_start, details, tally, prepared.len(), started);
        };

        let Some(rmse) = objective.rmse(&candidate.params) else {
            let details = QcDetails::optimization_failed("candidate parameters failed to price");
            return self.reject_without_candidate(warm_start, details, tally, prepared.len(), started);
        };

        self.transition(CalibrationPhase::QcCheck);
        let pricer = objective.pricer(candidate.params);
        let details = QualityGate::new(&self.config.qc).run(&pricer, rmse, prior.map(|p| p.rmse), &prepared);

        let result = CalibrationResult {
            params: candidate.params,
            rmse,
            qc_passed: details.passed(),
            qc_details: details,
            timestamp: Utc::now(),
            stage: Some(candidate.stage),
            objective: candidate.value,
            iterations: tally.iterations,
            evaluations: tally.evaluations,
            quotes_used: prepared.len(),
            duration: started.elapsed(),
        };

        if result.qc_passed {
            self.accept(&result);
        } else {
            self.reject(&result);
        }
        self.transition(CalibrationPhase::Idle);
        result
    }

    /// Stage 1, then stage 2 when stage 1 does not converge below the sentinel.
    fn optimise(
        &self,
        objective: &Objective<'_>,
        warm_start: &HestonParams,
        tally: &mut SolverTally,
    ) -> Option<Candidate> {
        let bounds = self.config.bounds.as_array();
        let x0 = warm_start.to_vec();
        let sentinel = objective.sentinel();
        let deadline = Deadline::from_budget(self.config.time_budget());
        let usable = |value: f64| value.is_finite() && value < sentinel;

        let stage1 = projected_lbfgs(&x0, &bounds, &self.config.lbfgs, deadline, |x| objective.value(x));
        let stage1 = match stage1 {
            Ok(result) => {
                tally.add(&result);
                debug!(
                    value = result.value,
                    iterations = result.iterations,
                    termination = %result.termination,
                    "stage 1 finished"
                );
                if result.converged() && usable(result.value) {
                    return to_candidate(&result, SolverStage::QuasiNewton);
                }
                Some(result)
            }
            Err(err) => {
                debug!(error = %err, "stage 1 failed");
                None
            }
        };

        warn!("local optimisation did not converge, running differential evolution");
        let stage2 = match differential_evolution(
            &bounds,
            &self.config.differential_evolution,
            Some(&x0),
            deadline,
            |x| objective.value(x),
        ) {
            Ok(result) => {
                tally.add(&result);
                debug!(
                    value = result.value,
                    generations = result.iterations,
                    termination = %result.termination,
                    "stage 2 finished"
                );
                Some(result)
            }
            Err(err) => {
                debug!(error = %err, "stage 2 failed");
                None
            }
        };

        [
            stage1.filter(|r| usable(r.value)).and_then(|r| to_candidate(&r, SolverStage::QuasiNewton)),
            stage2
                .filter(|r| usable(r.value))
                .and_then(|r| to_candidate(&r, SolverStage::DifferentialEvolution)),
        ]
        .into_iter()
        .flatten()
        .min_by(|a, b| a.value.total_cmp(&b.value))
    }

    fn accept(&mut self, result: &CalibrationResult) {
        self.transition(CalibrationPhase::Accepted);
        self.accepted = Some(AcceptedFit {
            params: result.params,
            rmse: result.rmse,
            timestamp: result.timestamp,
        });
        self.rejection_count = 0;
        info!(
            rmse = result.rmse,
            theta = result.params.theta,
            kappa = result.params.kappa,
            xi = result.params.xi,
            rho = result.params.rho,
            v0 = result.params.v0,
            stage = ?result.stage,
            "calibration accepted"
        );
    }

    fn reject(&mut self, result: &CalibrationResult) {
        self.transition(CalibrationPhase::Rejected);
        self.rejection_count += 1;
        if let Some(reason) = result.qc_details.reason {
            if self.rejections.len() == self.config.rejection_history {
                self.rejections.pop_front();
            }
            if self.config.rejection_history > 0 {
                self.rejections.push_back(RejectionRecord {
                    timestamp: result.timestamp,
                    reason,
                    message: result.qc_details.message.clone(),
                });
            }
            warn!(
                %reason,
                message = result.qc_details.message.as_deref().unwrap_or(""),
                rejections = self.rejection_count,
                "calibration rejected"
            );
        }
    }

    fn reject_without_candidate(
        &mut self,
        warm_start: HestonParams,
        details: QcDetails,
        tally: SolverTally,
        quotes_used: usize,
        started: Instant,
    ) -> CalibrationResult {
        let result = CalibrationResult {
            params: warm_start,
            rmse: self.config.sentinel,
            qc_passed: false,
            qc_details: details,
            timestamp: Utc::now(),
            stage: None,
            objective: self.config.sentinel,
            iterations: tally.iterations,
            evaluations: tally.evaluations,
            quotes_used,
            duration: started.elapsed(),
        };
        self.reject(&result);
        self.transition(CalibrationPhase::Idle);
        result
    }

    fn transition(&mut self, next: CalibrationPhase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal calibration transition {:?} -> {:?}",
            self.phase,
            next
        );
        debug!(from = ?self.phase, to = ?next, "calibration phase");
        self.phase = next;
    }
}

fn to_candidate(result: &OptimisationResult, stage: SolverStage) -> Option<Candidate> {
    HestonParams::from_slice(&result.params).map(|params| Candidate {
        params,
        value: result.value,
        stage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::RejectionReason;
    use pricer_core::market_data::curves::FlatCurve;

    fn valuation() -> Date {
        Date::from_ymd(2024, 1, 2).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = CalibrationConfig {
            sentinel: f64::NAN,
            ..Default::default()
        };
        assert!(HestonCalibrator::new(config).is_err());
    }

    #[test]
    fn test_initial_guess_defaults() {
        let calibrator = HestonCalibrator::new(CalibrationConfig::default()).unwrap();
        assert_eq!(calibrator.initial_guess(), HestonParams::default());
        assert!(calibrator.pricer().is_none());
        assert!(!calibrator.status().calibrated);
    }

    #[test]
    fn test_empty_surface_is_optimization_failed() {
        let mut calibrator = HestonCalibrator::new(CalibrationConfig::default()).unwrap();
        let expired = vec![VolSurfacePoint::new(100.0, valuation(), 0.2)];
        let result = calibrator.calibrate_at(
            valuation(),
            &expired,
            100.0,
            &FlatCurve::new(0.05),
            &FlatCurve::new(0.02),
        );
        assert!(!result.qc_passed);
        assert_eq!(result.reason(), Some(RejectionReason::OptimizationFailed));
        assert_eq!(result.stage, None);
        assert_eq!(result.quotes_used, 0);
        assert_eq!(result.params, HestonParams::default());
        assert_eq!(calibrator.rejection_count(), 1);
        assert_eq!(calibrator.phase(), CalibrationPhase::Idle);
        assert!(calibrator.accepted_params().is_none());
    }

    #[test]
    fn test_rejection_history_is_bounded() {
        let config = CalibrationConfig {
            rejection_history: 2,
            ..Default::default()
        };
        let mut calibrator = HestonCalibrator::new(config).unwrap();
        let (r, q) = (FlatCurve::new(0.05), FlatCurve::new(0.02));
        for _ in 0..3 {
            calibrator.calibrate_at(valuation(), &[], f64::NAN, &r, &q);
        }
        assert_eq!(calibrator.rejection_count(), 3);
        assert_eq!(calibrator.rejection_history().count(), 2);
        assert_eq!(
            calibrator.status().last_rejection,
            Some(RejectionReason::OptimizationFailed)
        );
    }
}
