//! Optimiser outcome types.

use std::fmt;

/// Why an optimiser stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Termination {
    /// Projected gradient fell below tolerance
    GradientTolerance,
    /// Relative objective reduction fell below tolerance
    FunctionTolerance,
    /// Population energies collapsed (differential evolution)
    PopulationConverged,
    /// Iteration or generation cap reached
    MaxIterations,
    /// No step along the search direction reduced the objective
    LineSearchFailed,
    /// Wall-clock budget ran out
    DeadlineExceeded,
}

impl Termination {
    /// Whether this stop counts as convergence.
    pub fn is_converged(self) -> bool {
        matches!(
            self,
            Termination::GradientTolerance
                | Termination::FunctionTolerance
                | Termination::PopulationConverged
        )
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Termination::GradientTolerance => "gradient tolerance",
            Termination::FunctionTolerance => "function tolerance",
            Termination::PopulationConverged => "population converged",
            Termination::MaxIterations => "max iterations",
            Termination::LineSearchFailed => "line search failed",
            Termination::DeadlineExceeded => "deadline exceeded",
        };
        f.write_str(s)
    }
}

/// Result of a bounded minimisation.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimisationResult {
    /// Best point found (inside the bounds)
    pub params: Vec<f64>,
    /// Objective at `params`
    pub value: f64,
    /// Iterations or generations performed
    pub iterations: usize,
    /// Objective evaluations, finite-difference probes included
    pub evaluations: usize,
    /// Stop reason
    pub termination: Termination,
}

impl OptimisationResult {
    /// Shorthand for `termination.is_converged()`.
    pub fn converged(&self) -> bool {
        self.termination.is_converged()
    }
}
