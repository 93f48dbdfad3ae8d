//! Economic dispatch for a fixed zone assignment.
//!
//! For an assignment placing unit `i` in a zone with coefficients
//! `(a_i, b_i, c_i)` and bounds `[Pmin_i, Pmax_i]` the solver computes
//!
//! ```text
//! minimize    Σ c_i P_i² + b_i P_i + a_i
//! subject to  Σ P_i = D
//!             Pmin_i ≤ P_i ≤ Pmax_i
//! ```
//!
//! The problem is handed to [Clarabel](https://github.com/oxfordcontrol/Clarabel.rs)
//! in its conic form
//!
//! ```text
//! minimize    ½ xᵀPx + qᵀx
//! subject to  Ax + s = b,  s ∈ K
//! ```
//!
//! with `P = diag(2c)`, `q = b`, one zero-cone row for the power balance
//! and `2n` non-negative-cone rows for the box constraints. The fixed terms
//! `a_i` do not move the optimum and are added back to the dual objective.

use super::assignment::Assignment;
use super::model::DispatchModel;
use crate::error::{ColonyError, Result};
use clarabel::algebra::CscMatrix;
use clarabel::solver::{DefaultSettingsBuilder, DefaultSolver, IPSolver, SupportedConeT};
use tracing::debug;

/// Cost reported for an assignment whose dispatch is not solved to optimality.
///
/// Large enough that the colony never prefers such a path, finite so that
/// pheromone deposits stay well defined.
pub const INFEASIBLE_COST: f64 = 1e10;

/// Outcome of a QP solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolverStatus {
    /// Solved to the requested accuracy.
    Optimal,
    /// The power balance cannot be met within the zone bounds.
    Infeasible,
    /// Iteration limit, numerical trouble or reduced accuracy.
    Unknown,
}

impl SolverStatus {
    pub fn is_optimal(self) -> bool {
        matches!(self, SolverStatus::Optimal)
    }

    fn from_clarabel(status: clarabel::solver::SolverStatus) -> Self {
        use clarabel::solver::SolverStatus as S;
        match status {
            S::Solved => SolverStatus::Optimal,
            S::PrimalInfeasible | S::AlmostPrimalInfeasible => SolverStatus::Infeasible,
            _ => SolverStatus::Unknown,
        }
    }
}

impl std::fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SolverStatus::Optimal => "optimal",
            SolverStatus::Infeasible => "infeasible",
            SolverStatus::Unknown => "unknown",
        })
    }
}

/// Settings passed through to the QP backend.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverSettings {
    /// Maximum interior-point iterations per solve.
    pub max_iter: u32,
    /// Print the backend's iteration log.
    pub verbose: bool,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iter: 200,
            verbose: false,
        }
    }
}

impl SolverSettings {
    pub fn with_max_iter(mut self, max_iter: u32) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Dispatch of one assignment.
///
/// `dispatch` and `unit_costs` are always filled from the backend's primal
/// vector, even when `status` is not optimal; in that case they are only
/// useful as diagnostics and `total_cost` is [`INFEASIBLE_COST`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DispatchResult {
    pub assignment: Assignment,
    /// Output of each unit, in unit order.
    pub dispatch: Vec<f64>,
    /// `c·P² + b·P + a` of each unit at its dispatched output.
    pub unit_costs: Vec<f64>,
    /// Total cost `Ft`.
    pub total_cost: f64,
    pub status: SolverStatus,
    /// Interior-point iterations spent.
    pub iterations: u32,
}

impl DispatchResult {
    pub fn is_optimal(&self) -> bool {
        self.status.is_optimal()
    }

    /// `Σ P_i`.
    pub fn total_dispatch(&self) -> f64 {
        self.dispatch.iter().sum()
    }
}

/// Solves the economic dispatch of zone assignments on a fixed model.
///
/// # Examples
///
/// ```
/// use u_powercolony::system::{DispatchModel, DispatchSolver, Unit, Zone};
///
/// let model = DispatchModel::new(
///     "pair",
///     100.0,
///     vec![
///         Unit::new(1, vec![Zone::new(1, 0.0, 2.0, 0.01, 0.0, 100.0)]),
///         Unit::new(2, vec![Zone::new(1, 0.0, 3.0, 0.02, 0.0, 100.0)]),
///     ],
/// )
/// .unwrap();
///
/// let path = model.assignment_from_zone_indices(&[1, 1]).unwrap();
/// let result = DispatchSolver::new(&model).solve(&path).unwrap();
/// assert!(result.is_optimal());
/// assert!((result.total_dispatch() - 100.0).abs() < 1e-4);
/// ```
#[derive(Debug, Clone)]
pub struct DispatchSolver<'a> {
    model: &'a DispatchModel,
    settings: SolverSettings,
}

impl<'a> DispatchSolver<'a> {
    pub fn new(model: &'a DispatchModel) -> Self {
        Self {
            model,
            settings: SolverSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: SolverSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    pub fn model(&self) -> &'a DispatchModel {
        self.model
    }

    /// Solves the dispatch of `assignment`.
    ///
    /// # Errors
    /// Assignment lookup errors, and [`ColonyError::Solver`] when the backend
    /// refuses the problem data. An infeasible dispatch is not an error.
    pub fn solve(&self, assignment: &Assignment) -> Result<DispatchResult> {
        let zones = self.model.resolve(assignment)?;
        let n = zones.len();

        // Objective: P = diag(2c), upper triangular, explicit zeros dropped.
        let mut p_col_ptr = Vec::with_capacity(n + 1);
        let mut p_row_idx = Vec::with_capacity(n);
        let mut p_values = Vec::with_capacity(n);
        for (i, zone) in zones.iter().enumerate() {
            p_col_ptr.push(p_values.len());
            if zone.c != 0.0 {
                p_row_idx.push(i);
                p_values.push(2.0 * zone.c);
            }
        }
        p_col_ptr.push(p_values.len());
        let p_mat = CscMatrix::new(n, n, p_col_ptr, p_row_idx, p_values);
        let q: Vec<f64> = zones.iter().map(|z| z.b).collect();

        // Constraints, row 0: Σ P = D; rows 1..=n: -P ≤ -Pmin; rows n+1..=2n: P ≤ Pmax.
        let n_rows = 1 + 2 * n;
        let mut a_col_ptr = Vec::with_capacity(n + 1);
        let mut a_row_idx = Vec::with_capacity(3 * n);
        let mut a_values = Vec::with_capacity(3 * n);
        for i in 0..n {
            a_col_ptr.push(a_values.len());
            a_row_idx.extend_from_slice(&[0, 1 + i, 1 + n + i]);
            a_values.extend_from_slice(&[1.0, -1.0, 1.0]);
        }
        a_col_ptr.push(a_values.len());
        let a_mat = CscMatrix::new(n_rows, n, a_col_ptr, a_row_idx, a_values);

        let mut rhs = Vec::with_capacity(n_rows);
        rhs.push(self.model.demand());
        rhs.extend(zones.iter().map(|z| -z.p_min));
        rhs.extend(zones.iter().map(|z| z.p_max));

        let cones = [
            SupportedConeT::ZeroConeT(1),
            SupportedConeT::NonnegativeConeT(2 * n),
        ];

        let settings = DefaultSettingsBuilder::default()
            .verbose(self.settings.verbose)
            .max_iter(self.settings.max_iter)
            .build()
            .map_err(|e| ColonyError::Solver(format!("settings error: {e:?}")))?;

        let mut solver = DefaultSolver::new(&p_mat, &q, &a_mat, &rhs, &cones, settings)
            .map_err(|e| ColonyError::Solver(format!("initialization failed: {e:?}")))?;
        solver.solve();

        let sol = &solver.solution;
        let status = SolverStatus::from_clarabel(sol.status);

        let dispatch: Vec<f64> = sol.x.clone();
        let unit_costs: Vec<f64> = zones
            .iter()
            .zip(&dispatch)
            .map(|(z, &p)| z.cost_at(p))
            .collect();

        let total_cost = if status.is_optimal() {
            let fixed: f64 = zones.iter().map(|z| z.a).sum();
            sol.obj_val_dual + fixed
        } else {
            debug!(
                path = %assignment,
                backend_status = ?sol.status,
                %status,
                "dispatch not optimal, using sentinel cost"
            );
            INFEASIBLE_COST
        };

        Ok(DispatchResult {
            assignment: assignment.clone(),
            dispatch,
            unit_costs,
            total_cost,
            status,
            iterations: sol.iterations,
        })
    }
}
