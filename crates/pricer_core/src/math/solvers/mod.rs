//! Root finding and bounded optimisation.
//!
//! ## Root finding
//!
//! - [`NewtonRaphsonSolver::find_root_bounded`]: Newton iteration projected
//!   onto an interval that always returns (used for implied volatility)
//!
//! ## Optimisation
//!
//! - [`projected_lbfgs`]: quasi-Newton local search with box constraints and
//!   finite-difference gradients
//! - [`differential_evolution`]: seeded derivative-free global search
//!
//! Both optimisers share [`ParameterBounds`], [`Deadline`] and
//! [`OptimisationResult`].
//!
//! ```
//! use pricer_core::math::solvers::{NewtonRaphsonSolver, ParameterBounds, SolverConfig};
//!
//! let solver = NewtonRaphsonSolver::new(SolverConfig::default());
//! let root = solver.find_root_bounded(|x| x * x - 2.0, |x| 2.0 * x, 1.0, ParameterBounds::new(0.0, 10.0));
//! assert!(root.converged);
//! assert!((root.x - std::f64::consts::SQRT_2).abs() < 1e-10);
//! ```

mod bounds;
mod config;
mod differential_evolution;
mod newton_raphson;
mod projected_lbfgs;
mod result;

pub use bounds::{project, within_bounds, ParameterBounds};
pub use config::{Deadline, SolverConfig};
pub use differential_evolution::{differential_evolution, DifferentialEvolutionConfig};
pub use newton_raphson::{BoundedRoot, NewtonRaphsonSolver};
pub use projected_lbfgs::{projected_lbfgs, LbfgsConfig};
pub use result::{OptimisationResult, Termination};
