//! Calibration outputs and calibrator state types.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::qc::{QcDetails, RejectionReason};
use crate::models::HestonParams;

/// Solver stage that produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SolverStage {
    /// Stage 1: projected L-BFGS from the warm start.
    QuasiNewton,
    /// Stage 2: seeded differential evolution.
    DifferentialEvolution,
}

impl fmt::Display for SolverStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverStage::QuasiNewton => write!(f, "quasi_newton"),
            SolverStage::DifferentialEvolution => write!(f, "differential_evolution"),
        }
    }
}

/// Calibrator state machine.
///
/// ```text
/// Idle -> Optimizing -> QcCheck -> Accepted -> Idle
///                  \           \-> Rejected -> Idle
///                   \-> Rejected (no usable candidate)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CalibrationPhase {
    /// Waiting for a surface.
    Idle,
    /// Running the solver stages.
    Optimizing,
    /// Running the QC gate on a candidate.
    QcCheck,
    /// Candidate accepted and stored.
    Accepted,
    /// Candidate rejected; previous parameters kept.
    Rejected,
}

impl CalibrationPhase {
    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: CalibrationPhase) -> bool {
        use CalibrationPhase::*;
        matches!(
            (self, next),
            (Idle, Optimizing)
                | (Optimizing, QcCheck)
                | (Optimizing, Rejected)
                | (QcCheck, Accepted)
                | (QcCheck, Rejected)
                | (Accepted, Idle)
                | (Rejected, Idle)
        )
    }
}

/// Outcome of one calibration run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalibrationResult {
    /// Candidate parameters (the warm start when optimisation failed).
    pub params: HestonParams,
    /// Weighted IV RMSE of the candidate, without regularisation.
    pub rmse: f64,
    /// Whether the candidate passed QC and was stored.
    pub qc_passed: bool,
    /// Per-check outcomes.
    pub qc_details: QcDetails,
    /// Wall-clock time the run finished.
    pub timestamp: DateTime<Utc>,
    /// Stage that produced the candidate, if any did.
    pub stage: Option<SolverStage>,
    /// Objective value including regularisation.
    pub objective: f64,
    /// Solver iterations across both stages.
    pub iterations: usize,
    /// Objective evaluations across both stages.
    pub evaluations: usize,
    /// Quotes that survived filtering.
    pub quotes_used: usize,
    /// Run time.
    pub duration: Duration,
}

impl CalibrationResult {
    /// Rejection reason, if rejected.
    pub fn reason(&self) -> Option<RejectionReason> {
        self.qc_details.reason
    }
}

/// The last accepted fit.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AcceptedFit {
    /// Accepted parameters.
    pub params: HestonParams,
    /// Their RMSE.
    pub rmse: f64,
    /// When they were accepted.
    pub timestamp: DateTime<Utc>,
}

/// One rejected run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RejectionRecord {
    /// When the run finished.
    pub timestamp: DateTime<Utc>,
    /// Why it was rejected.
    pub reason: RejectionReason,
    /// Detail from the failing check.
    pub message: Option<String>,
}

/// Snapshot of calibrator state for monitoring.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CalibrationStatus {
    /// An accepted fit exists.
    pub calibrated: bool,
    /// Accepted parameters.
    pub params: Option<HestonParams>,
    /// Accepted RMSE.
    pub rmse: Option<f64>,
    /// When the accepted fit was stored.
    pub last_calibration: Option<DateTime<Utc>>,
    /// Seconds since `last_calibration`.
    pub age_seconds: Option<i64>,
    /// Rejections since the last acceptance.
    pub rejection_count: usize,
    /// Most recent rejection reason.
    pub last_rejection: Option<RejectionReason>,
}
