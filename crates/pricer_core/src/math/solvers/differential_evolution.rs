//! Seeded differential evolution (best/1/bin) over a box.

use super::{Deadline, OptimisationResult, ParameterBounds, Termination};
use crate::types::SolverError;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

/// Settings for [`differential_evolution`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DifferentialEvolutionConfig {
    /// Hard cap on generations.
    pub max_generations: usize,
    /// Population size per dimension.
    pub population_per_dimension: usize,
    /// Mutation factor range; a fresh factor is drawn each generation.
    pub mutation: (f64, f64),
    /// Binomial crossover probability.
    pub crossover_probability: f64,
    /// Relative convergence tolerance on population energies.
    pub tolerance: f64,
    /// Absolute convergence tolerance on population energies.
    pub absolute_tolerance: f64,
    /// RNG seed.
    pub seed: u64,
}

impl Default for DifferentialEvolutionConfig {
    fn default() -> Self {
        Self {
            max_generations: 50,
            population_per_dimension: 15,
            mutation: (0.5, 1.0),
            crossover_probability: 0.7,
            tolerance: 0.01,
            absolute_tolerance: 0.0,
            seed: 42,
        }
    }
}

impl DifferentialEvolutionConfig {
    /// Whether the mutation range and crossover probability are usable:
    /// finite `0 < lo <= hi <= 2` and a probability in `[0, 1]`.
    pub fn is_valid(&self) -> bool {
        let (lo, hi) = self.mutation;
        lo.is_finite()
            && hi.is_finite()
            && lo > 0.0
            && lo <= hi
            && hi <= 2.0
            && (0.0..=1.0).contains(&self.crossover_probability)
    }
}

/// Latin hypercube sample of `size` points in the box.
fn latin_hypercube(size: usize, bounds: &[ParameterBounds], rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut population = vec![vec![0.0; bounds.len()]; size];
    let mut strata: Vec<usize> = (0..size).collect();
    for (d, b) in bounds.iter().enumerate() {
        strata.shuffle(rng);
        for (member, &stratum) in population.iter_mut().zip(&strata) {
            let u = (stratum as f64 + rng.gen::<f64>()) / size as f64;
            member[d] = b.min + u * b.width();
        }
    }
    population
}

fn converged(energies: &[f64], tol: f64, atol: f64) -> bool {
    let n = energies.len() as f64;
    let mean = energies.iter().sum::<f64>() / n;
    let var = energies.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / n;
    var.sqrt() <= atol + tol * mean.abs()
}

/// Minimise `objective` over `bounds` by differential evolution.
///
/// The run is reproducible for a given seed. When `initial` is supplied it
/// replaces the first member of the initial population, so the result is
/// never worse than the warm start.
///
/// # Errors
///
/// `InvalidProblem` for an empty problem, non-finite bounds, an `initial`
/// point of the wrong length, or a config failing
/// [`DifferentialEvolutionConfig::is_valid`].
///
/// # Example
///
/// ```
/// use pricer_core::math::solvers::{
///     differential_evolution, Deadline, DifferentialEvolutionConfig, ParameterBounds,
/// };
///
/// let bounds = [ParameterBounds::new(-1.0, 1.0), ParameterBounds::new(-1.0, 1.0)];
/// let config = DifferentialEvolutionConfig { max_generations: 200, ..Default::default() };
/// let out = differential_evolution(&bounds, &config, None, Deadline::none(), |x| {
///     (x[0] - 0.2).powi(2) + (x[1] + 0.3).powi(2)
/// })
/// .unwrap();
/// assert!((out.params[0] - 0.2).abs() < 1e-2);
/// assert!((out.params[1] + 0.3).abs() < 1e-2);
/// ```
pub fn differential_evolution<F>(
    bounds: &[ParameterBounds],
    config: &DifferentialEvolutionConfig,
    initial: Option<&[f64]>,
    deadline: Deadline,
    mut objective: F,
) -> Result<OptimisationResult, SolverError>
where
    F: FnMut(&[f64]) -> f64,
{
    let dim = bounds.len();
    if dim == 0 {
        return Err(SolverError::InvalidProblem(
            "differential evolution requires at least one parameter".to_string(),
        ));
    }
    if bounds.iter().any(|b| !b.is_valid()) {
        return Err(SolverError::InvalidProblem(
            "bounds must be finite with min <= max".to_string(),
        ));
    }
    if initial.is_some_and(|x| x.len() != dim) {
        return Err(SolverError::InvalidProblem(
            "initial point does not match the number of bounds".to_string(),
        ));
    }
    if !config.is_valid() {
        return Err(SolverError::InvalidProblem(format!(
            "mutation {:?} or crossover probability {} out of range",
            config.mutation, config.crossover_probability
        )));
    }

    let size = (config.population_per_dimension * dim).max(5);
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut population = latin_hypercube(size, bounds, &mut rng);
    if let Some(x) = initial {
        population[0] = x.iter().zip(bounds).map(|(&v, b)| b.clamp(v)).collect();
    }

    let sanitise = |v: f64| if v.is_nan() { f64::INFINITY } else { v };
    let mut energies: Vec<f64> = population.iter().map(|x| sanitise(objective(x))).collect();
    let mut evaluations = size;

    let best_of = |e: &[f64]| {
        e.iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap_or(0)
    };
    let mut best = best_of(&energies);

    let mut termination = Termination::MaxIterations;
    let mut generations = 0;
    let (f_lo, f_hi) = config.mutation;
    let mut others: Vec<usize> = Vec::with_capacity(size);

    while generations < config.max_generations {
        if deadline.expired() {
            termination = Termination::DeadlineExceeded;
            break;
        }
        generations += 1;

        let scale = if f_hi > f_lo { rng.gen_range(f_lo..f_hi) } else { f_lo };

        for i in 0..size {
            others.clear();
            others.extend((0..size).filter(|&k| k != i && k != best));
            others.shuffle(&mut rng);
            let (r1, r2) = match others.as_slice() {
                [a, b, ..] => (*a, *b),
                _ => continue,
            };

            let j_rand = rng.gen_range(0..dim);
            let trial: Vec<f64> = (0..dim)
                .map(|d| {
                    if d == j_rand || rng.gen::<f64>() < config.crossover_probability {
                        let v = population[best][d] + scale * (population[r1][d] - population[r2][d]);
                        bounds[d].clamp(v)
                    } else {
                        population[i][d]
                    }
                })
                .collect();

            let e = sanitise(objective(&trial));
            evaluations += 1;
            if e <= energies[i] {
                population[i] = trial;
                energies[i] = e;
                if e < energies[best] {
                    best = i;
                }
            }
        }

        trace!(generation = generations, best = energies[best], "differential evolution generation");

        if energies.iter().all(|e| e.is_finite())
            && converged(&energies, config.tolerance, config.absolute_tolerance)
        {
            termination = Termination::PopulationConverged;
            break;
        }
    }

    debug!(
        generations,
        evaluations,
        value = energies[best],
        termination = %termination,
        "differential evolution finished"
    );

    Ok(OptimisationResult {
        params: population[best].clone(),
        value: energies[best],
        iterations: generations,
        evaluations,
        termination,
    })
}
