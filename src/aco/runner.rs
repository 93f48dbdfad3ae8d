//! Colony search loop.
//!
//! [`ColonySearch`] drives the iterations step by step and exposes its
//! state between steps; [`ColonyRunner`] wraps it into a single call in the
//! style of the other runners.
//!
//! One iteration runs: evaporate → construct paths → solve → record →
//! update best/worst → deposit. All of it happens on scratch copies and is
//! committed only once every ant has been evaluated, so a failing step
//! leaves the search exactly as it was.

use super::config::ColonyConfig;
use super::pheromone::PheromoneField;
use super::types::{BestWorst, IterationStats, Trial, TrialHistory};
use crate::error::{ColonyError, Result};
use crate::system::{Assignment, DispatchModel, DispatchResult, DispatchSolver, SolverStatus};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Lifecycle of a [`ColonySearch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SearchState {
    /// Created, no ant has moved yet.
    Uninitialized,
    /// Iteration 0 (random paths) recorded.
    Initialized,
    /// `iteration` steps completed.
    Running { iteration: usize },
    /// Finished; no further steps.
    Done,
}

impl SearchState {
    fn name(self) -> &'static str {
        match self {
            SearchState::Uninitialized => "uninitialized",
            SearchState::Initialized => "initialized",
            SearchState::Running { .. } => "running",
            SearchState::Done => "done",
        }
    }
}

/// Result of a colony run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColonyResult {
    /// Cheapest trial seen.
    pub best: Trial,

    /// Most expensive trial seen.
    pub worst: Trial,

    /// Completed iterations, not counting the initial one.
    pub iterations: usize,

    /// Whether cancelled externally.
    pub cancelled: bool,

    /// Best cost so far after each iteration, starting with iteration 0.
    pub cost_history: Vec<f64>,

    /// Per-iteration statistics, starting with iteration 0.
    pub stats: Vec<IterationStats>,

    /// Recorded trials.
    pub history: TrialHistory,

    /// Final pheromone field.
    pub pheromone: PheromoneField,

    /// Pheromone after each iteration, if requested in the config.
    pub pheromone_history: Vec<PheromoneField>,
}

/// How an ant's cost is obtained.
enum Outcome {
    /// Copied from an earlier trial with the same path.
    Known(SolverStatus, f64),
    /// Read from slot `slot` of this step's solves.
    Solve { slot: usize, reused: bool },
}

/// Ant colony search over the zone assignments of one system.
///
/// # Examples
///
/// ```
/// use rand::rngs::StdRng;
/// use rand::SeedableRng;
/// use u_powercolony::aco::{ColonyConfig, ColonySearch};
/// use u_powercolony::system::{DispatchModel, Unit, Zone};
///
/// let model = DispatchModel::new(
///     "pair",
///     100.0,
///     vec![
///         Unit::new(1, vec![Zone::new(1, 0.0, 2.0, 0.01, 0.0, 100.0)]),
///         Unit::new(2, vec![
///             Zone::new(1, 0.0, 3.0, 0.02, 0.0, 40.0),
///             Zone::new(2, 10.0, 2.5, 0.02, 40.0, 100.0),
///         ]),
///     ],
/// )
/// .unwrap();
///
/// let mut rng = StdRng::seed_from_u64(1);
/// let mut search = ColonySearch::new(&model, ColonyConfig::default().with_ants(4)).unwrap();
/// search.initialize(&mut rng).unwrap();
/// search.step(&mut rng).unwrap();
/// let result = search.finish().unwrap();
/// assert_eq!(result.iterations, 1);
/// ```
#[derive(Debug)]
pub struct ColonySearch<'a> {
    model: &'a DispatchModel,
    solver: DispatchSolver<'a>,
    config: ColonyConfig,
    state: SearchState,
    pheromone: PheromoneField,
    history: TrialHistory,
    best_worst: BestWorst,
    stats: Vec<IterationStats>,
    cost_history: Vec<f64>,
    pheromone_history: Vec<PheromoneField>,
}

impl<'a> ColonySearch<'a> {
    /// Creates an uninitialized search.
    pub fn new(model: &'a DispatchModel, config: ColonyConfig) -> Result<Self> {
        config.validate()?;
        let history = config
            .history_limit
            .map_or_else(TrialHistory::new, TrialHistory::with_limit);
        Ok(Self {
            model,
            solver: DispatchSolver::new(model).with_settings(config.solver),
            pheromone: PheromoneField::for_model(model),
            config,
            state: SearchState::Uninitialized,
            history,
            best_worst: BestWorst::new(),
            stats: Vec::new(),
            cost_history: Vec::new(),
            pheromone_history: Vec::new(),
        })
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn config(&self) -> &ColonyConfig {
        &self.config
    }

    pub fn model(&self) -> &'a DispatchModel {
        self.model
    }

    pub fn pheromone(&self) -> &PheromoneField {
        &self.pheromone
    }

    pub fn history(&self) -> &TrialHistory {
        &self.history
    }

    pub fn best_worst(&self) -> &BestWorst {
        &self.best_worst
    }

    pub fn stats(&self) -> &[IterationStats] {
        &self.stats
    }

    pub fn pheromone_history(&self) -> &[PheromoneField] {
        &self.pheromone_history
    }

    fn state_error(&self, expected: &'static str) -> ColonyError {
        ColonyError::InvalidState {
            expected,
            found: self.state.name(),
        }
    }

    /// Sends every ant down a random path and lays the first pheromone.
    pub fn initialize<R: Rng>(&mut self, rng: &mut R) -> Result<()> {
        if self.state != SearchState::Uninitialized {
            return Err(self.state_error("uninitialized"));
        }

        let paths: Vec<Assignment> = (0..self.config.n_ants)
            .map(|_| self.model.sample_random_assignment(&mut *rng))
            .collect();
        let results = solve_all(&self.solver, &paths, self.config.parallel)
            .map_err(|e| e.at_iteration(0))?;

        let trials: Vec<Trial> = results
            .into_iter()
            .enumerate()
            .map(|(i, r)| Trial {
                ant: i + 1,
                iteration: 0,
                path: r.assignment,
                status: r.status,
                cost: r.total_cost,
                reused: false,
            })
            .collect();

        let mut field = PheromoneField::for_model(self.model);
        for trial in &trials {
            field
                .deposit(trial, self.config.deposit_scale)
                .map_err(|e| e.at_iteration(0))?;
        }
        let mut best_worst = BestWorst::new();
        best_worst.observe_all(&trials);

        self.commit(0, trials, field, best_worst);
        self.state = SearchState::Initialized;

        info!(
            system = self.model.name(),
            ants = self.config.n_ants,
            best_cost = self.best_worst.best_cost(),
            "colony initialized"
        );
        Ok(())
    }

    /// Runs one iteration.
    ///
    /// # Errors
    /// Structural errors, wrapped in [`ColonyError::Iteration`]. The search
    /// is left unchanged when a step fails.
    pub fn step<R: Rng>(&mut self, rng: &mut R) -> Result<IterationStats> {
        let iteration = match self.state {
            SearchState::Initialized => 1,
            SearchState::Running { iteration } => iteration + 1,
            _ => return Err(self.state_error("initialized or running")),
        };

        let stats = self
            .advance(iteration, rng)
            .map_err(|e| e.at_iteration(iteration))?;
        self.state = SearchState::Running { iteration };

        debug!(
            iteration,
            best = stats.best_cost,
            mean = stats.mean_cost,
            worst = stats.worst_cost,
            solved = stats.solved,
            reused = stats.reused,
            non_optimal = stats.non_optimal,
            global_best = self.best_worst.best_cost(),
            "colony iteration"
        );
        Ok(stats)
    }

    /// Builds, scores and commits one iteration on scratch state.
    ///
    /// A pheromone-guided path reuses the cost of a same-key trial from the
    /// previous iteration or from an earlier ant of this one; random paths
    /// are always solved.
    fn advance<R: Rng>(&mut self, iteration: usize, rng: &mut R) -> Result<IterationStats> {
        let previous: &[Trial] = self.history.latest().unwrap_or(&[]);

        // 1. Evaporate along the paths of the last iteration.
        let mut field = self.pheromone.clone();
        field.evaporate(previous, &self.best_worst, &self.config.evaporation)?;

        // 2-3. Build paths; pheromone-guided repeats reuse known costs.
        let memo: HashMap<String, (SolverStatus, f64)> = previous
            .iter()
            .map(|t| (t.path_key(), (t.status, t.cost)))
            .collect();
        let mut pending: HashMap<String, usize> = HashMap::new();
        let mut to_solve: Vec<Assignment> = Vec::new();
        let mut plan: Vec<(Assignment, Outcome)> = Vec::with_capacity(self.config.n_ants);

        for _ in 0..self.config.n_ants {
            if rng.random_bool(self.config.exploit_probability) {
                let zones = field.sample_path(rng)?;
                let path = self.model.assignment_from_zone_indices(&zones)?;
                let key = path.key();
                let outcome = if let Some(&(status, cost)) = memo.get(&key) {
                    trace!(iteration, path = %key, "reusing known path cost");
                    Outcome::Known(status, cost)
                } else if let Some(&slot) = pending.get(&key) {
                    trace!(iteration, path = %key, "reusing path solved in this iteration");
                    Outcome::Solve { slot, reused: true }
                } else {
                    pending.insert(key, to_solve.len());
                    to_solve.push(path.clone());
                    Outcome::Solve {
                        slot: to_solve.len() - 1,
                        reused: false,
                    }
                };
                plan.push((path, outcome));
            } else {
                let path = self.model.sample_random_assignment(rng);
                to_solve.push(path.clone());
                plan.push((
                    path,
                    Outcome::Solve {
                        slot: to_solve.len() - 1,
                        reused: false,
                    },
                ));
            }
        }

        // 4. Solve.
        let results = solve_all(&self.solver, &to_solve, self.config.parallel)?;

        // 5. Record.
        let trials: Vec<Trial> = plan
            .into_iter()
            .enumerate()
            .map(|(i, (path, outcome))| {
                let (status, cost, reused) = match outcome {
                    Outcome::Known(status, cost) => (status, cost, true),
                    Outcome::Solve { slot, reused } => {
                        (results[slot].status, results[slot].total_cost, reused)
                    }
                };
                Trial {
                    ant: i + 1,
                    iteration,
                    path,
                    status,
                    cost,
                    reused,
                }
            })
            .collect();

        // 6. Best / worst.
        let mut best_worst = self.best_worst.clone();
        best_worst.observe_all(&trials);

        // 7. Deposit.
        for trial in &trials {
            field.deposit(trial, self.config.deposit_scale)?;
        }

        Ok(self.commit(iteration, trials, field, best_worst))
    }

    fn commit(
        &mut self,
        iteration: usize,
        trials: Vec<Trial>,
        field: PheromoneField,
        best_worst: BestWorst,
    ) -> IterationStats {
        let stats = IterationStats::from_trials(iteration, &trials);
        self.history.push(trials);
        self.pheromone.clone_from(&field);
        self.best_worst = best_worst;
        self.stats.push(stats);
        self.cost_history.push(self.best_worst.best_cost());

        if self.config.keep_pheromone_history {
            self.pheromone_history.push(field);
            if let Some(limit) = self.config.history_limit {
                let excess = self.pheromone_history.len().saturating_sub(limit);
                self.pheromone_history.drain(..excess);
            }
        }
        stats
    }

    /// Initializes if needed, then runs `iterations` steps and finishes.
    pub fn run<R: Rng>(&mut self, rng: &mut R, iterations: usize) -> Result<ColonyResult> {
        self.run_until(rng, iterations, None)?;
        self.finish()
    }

    /// Runs steps until `iterations` are done or `cancel` is raised.
    /// Returns `true` if cancelled.
    fn run_until<R: Rng>(
        &mut self,
        rng: &mut R,
        iterations: usize,
        cancel: Option<&AtomicBool>,
    ) -> Result<bool> {
        if self.state == SearchState::Uninitialized {
            self.initialize(rng)?;
        }
        for _ in 0..iterations {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                return Ok(true);
            }
            self.step(rng)?;
        }
        Ok(false)
    }

    /// Ends the search and returns its outcome.
    pub fn finish(&mut self) -> Result<ColonyResult> {
        self.finish_with(false)
    }

    fn finish_with(&mut self, cancelled: bool) -> Result<ColonyResult> {
        let iterations = match self.state {
            SearchState::Initialized => 0,
            SearchState::Running { iteration } => iteration,
            _ => return Err(self.state_error("initialized or running")),
        };
        let (best, worst) = match (self.best_worst.best(), self.best_worst.worst()) {
            (Some(b), Some(w)) => (b.clone(), w.clone()),
            _ => return Err(self.state_error("initialized")),
        };
        self.state = SearchState::Done;

        info!(
            system = self.model.name(),
            iterations,
            cancelled,
            best_cost = best.cost,
            best_path = %best.path,
            "colony search finished"
        );

        Ok(ColonyResult {
            best,
            worst,
            iterations,
            cancelled,
            cost_history: self.cost_history.clone(),
            stats: self.stats.clone(),
            history: self.history.clone(),
            pheromone: self.pheromone.clone(),
            pheromone_history: self.pheromone_history.clone(),
        })
    }
}

/// Solves every path, on the rayon pool when enabled.
fn solve_all(
    solver: &DispatchSolver<'_>,
    paths: &[Assignment],
    parallel: bool,
) -> Result<Vec<DispatchResult>> {
    #[cfg(feature = "parallel")]
    {
        if parallel {
            use rayon::prelude::*;
            return paths.par_iter().map(|p| solver.solve(p)).collect();
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    paths.iter().map(|p| solver.solve(p)).collect()
}

/// Executes a full colony search.
pub struct ColonyRunner;

impl ColonyRunner {
    /// Runs `config.max_iterations` iterations after initialization.
    pub fn run(model: &DispatchModel, config: &ColonyConfig) -> Result<ColonyResult> {
        Self::run_with_cancel(model, config, None)
    }

    /// Runs with an optional cancellation token, checked between iterations.
    pub fn run_with_cancel(
        model: &DispatchModel,
        config: &ColonyConfig,
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<ColonyResult> {
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::seed_from_u64(rand::random()),
        };

        let mut search = ColonySearch::new(model, config.clone())?;
        let cancelled = search.run_until(&mut rng, config.max_iterations, cancel.as_deref())?;
        search.finish_with(cancelled)
    }
}
